//! MQTT connection driver
//!
//! Owns the `rumqttc` client and event loop for the single outbound broker
//! connection. The event loop is turned into `ConnectionEvent`s for the
//! publisher; the client is wrapped as the publisher's `BrokerSink`.
//!
//! Every successful poll also calls `Publisher::flush_pending`, so a backlog
//! larger than the client's request channel is handed over as the event loop
//! frees capacity.
//!
//! Reconnection: when `poll` fails the loop reports the error, marks the link
//! closed, waits `reconnect_period_ms` and polls again, which makes `rumqttc`
//! open a fresh connection.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, ClientError, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use super::connection::{BrokerSink, ConnectionEvent};
use super::publisher::Publisher;
use crate::config::BrokerSettings;
use crate::utils::{BridgeError, Result};

/// Where and how to reach the broker, parsed from `broker.url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub credentials: Option<(String, String)>,
}

impl BrokerEndpoint {
    /// Accepts `mqtt://` / `tcp://` (port 1883) and `mqtts://` / `ssl://`
    /// (port 8883), with optional `user:pass@` credentials.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| invalid(format!("broker.url {raw:?} is not a valid URL: {e}")))?;

        let (tls, default_port) = match url.scheme() {
            "mqtt" | "tcp" => (false, 1883),
            "mqtts" | "ssl" => (true, 8883),
            other => {
                return Err(invalid(format!(
                    "broker.url scheme {other:?} is not supported (use mqtt or mqtts)"
                )));
            }
        };

        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| invalid(format!("broker.url {raw:?} has no host")))?
            .to_string();

        let credentials = if url.username().is_empty() {
            None
        } else {
            Some((
                url.username().to_string(),
                url.password().unwrap_or_default().to_string(),
            ))
        };

        Ok(Self {
            host,
            port: url.port().unwrap_or(default_port),
            tls,
            credentials,
        })
    }
}

fn invalid(message: String) -> BridgeError {
    BridgeError::InvalidConfig(message)
}

/// `<prefix>_<8 hex chars>`, unique per process.
pub fn client_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &suffix[..8])
}

pub fn mqtt_options(settings: &BrokerSettings) -> Result<MqttOptions> {
    let endpoint = BrokerEndpoint::parse(&settings.url)?;

    let mut options = MqttOptions::new(
        client_id(&settings.client_id_prefix),
        endpoint.host,
        endpoint.port,
    );
    options.set_keep_alive(Duration::from_secs(settings.keep_alive_secs));
    options.set_clean_session(true);

    if let Some((username, password)) = endpoint.credentials {
        options.set_credentials(username, password);
    }
    if endpoint.tls {
        options.set_transport(Transport::tls_with_default_config());
    }

    Ok(options)
}

/// Publishes through a `rumqttc` client with QoS 0 and no retain flag.
///
/// `try_publish` fails with `TryRequest` when the request channel
/// (`broker.request_capacity`) is full; that is reported as `Backpressure` so
/// the publisher keeps the message until the event loop has drained the
/// channel. Topics are validated at startup, so a wildcard topic never reaches
/// this path.
#[derive(Clone)]
pub struct MqttSink {
    client: AsyncClient,
}

impl MqttSink {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

impl BrokerSink for MqttSink {
    fn publish(&self, topic: &str, body: &str) -> Result<()> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, body.as_bytes().to_vec())
            .map_err(|e| match e {
                ClientError::TryRequest(_) => BridgeError::Backpressure(e.to_string()),
                other => BridgeError::Publish(other.to_string()),
            })
    }
}

/// Builds the client and its (not yet polled) event loop.
pub fn connect(settings: &BrokerSettings) -> Result<(MqttSink, EventLoop)> {
    let options = mqtt_options(settings)?;
    debug!(client_id = %options.client_id(), "creating MQTT client");
    let (client, eventloop) = AsyncClient::new(options, settings.request_capacity);
    Ok((MqttSink::new(client), eventloop))
}

/// Maps a successfully polled event to the lifecycle notification it implies.
pub fn lifecycle_event(event: &Event) -> Option<ConnectionEvent> {
    match event {
        Event::Incoming(Packet::ConnAck(_)) => Some(ConnectionEvent::Connected),
        Event::Incoming(Packet::Disconnect) => Some(ConnectionEvent::Closed),
        _ => None,
    }
}

/// Drives the event loop forever, feeding lifecycle events to `publisher`.
///
/// Runs until the task is aborted.
pub async fn run_connection_loop(
    mut eventloop: EventLoop,
    publisher: Arc<Publisher>,
    reconnect_period: Duration,
) {
    loop {
        match eventloop.poll().await {
            Ok(event) => {
                if let Some(lifecycle) = lifecycle_event(&event) {
                    publisher.handle_event(lifecycle);
                }
                publisher.flush_pending();
            }
            Err(e) => {
                publisher.handle_event(ConnectionEvent::Error(e.to_string()));
                if publisher.is_connected() {
                    publisher.handle_event(ConnectionEvent::Closed);
                }
                tokio::time::sleep(reconnect_period).await;
                publisher.handle_event(ConnectionEvent::Reconnecting);
            }
        }
    }
}
