//! The `broker` module owns the single outbound broker connection.
//!
//! - `publisher`: the connection-aware publish queue used by the HTTP layer
//! - `connection`: lifecycle events and the `BrokerSink` seam
//! - `mqtt`: the `rumqttc` based driver that feeds events to the publisher

pub mod connection;
pub mod message;
pub mod mqtt;
pub mod publisher;

pub use connection::{BrokerSink, ConnectionEvent};
pub use message::PendingMessage;
pub use publisher::Publisher;

#[cfg(test)]
mod tests;
