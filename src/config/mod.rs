mod settings;

use std::env;
use std::path::Path;

use crate::broker::mqtt::BrokerEndpoint;
use crate::utils::{BridgeError, Result};
use config::{Config, Environment, File};
use settings::PartialSettings;

pub use settings::{
    BrokerSettings, LogFormat, LoggingSettings, RateLimitSettings, ServerSettings, Settings,
};

/// Default location of the optional configuration file, without extension.
pub const DEFAULT_CONFIG_FILE: &str = "config/default";

/// Loads the configuration from the default file and environment variables.
///
/// See [`load_config_from`].
pub fn load_config() -> Result<Settings> {
    load_config_from(None)
}

/// Loads the configuration and validates it.
///
/// Sources, lowest priority first: built-in defaults, the config file
/// (`path` or `config/default.*`, optional), `POPSUB_<SECTION>__<KEY>`
/// environment variables, then `MQTT_URL`, `MQTT_TOPIC` and `PORT`.
pub fn load_config_from(path: Option<&Path>) -> Result<Settings> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let builder = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("POPSUB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("broker.url", env::var("MQTT_URL").ok())?
        .set_override_option("broker.topic", env::var("MQTT_TOPIC").ok())?
        .set_override_option("server.port", env::var("PORT").ok())?;

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    let settings = partial.merge(Settings::default());
    validate(&settings)?;
    Ok(settings)
}

/// Rejects settings the service cannot start with.
pub fn validate(settings: &Settings) -> Result<()> {
    if settings.broker.url.trim().is_empty() {
        return Err(invalid("broker.url must not be empty"));
    }
    BrokerEndpoint::parse(&settings.broker.url)?;

    if settings.broker.topic.trim().is_empty() {
        return Err(invalid("broker.topic must not be empty"));
    }
    if settings.broker.topic.contains(['+', '#']) {
        return Err(invalid("broker.topic must not contain MQTT wildcards (+ or #)"));
    }
    if settings.broker.reconnect_period_ms == 0 {
        return Err(invalid("broker.reconnect_period_ms must be greater than 0"));
    }
    if settings.broker.request_capacity == 0 {
        return Err(invalid("broker.request_capacity must be greater than 0"));
    }
    if settings.rate_limit.window_ms == 0 {
        return Err(invalid("rate_limit.window_ms must be greater than 0"));
    }
    if settings.rate_limit.max_requests == 0 {
        return Err(invalid("rate_limit.max_requests must be greater than 0"));
    }
    if settings.rate_limit.sweep_interval_ms > 0 && settings.rate_limit.idle_windows == 0 {
        return Err(invalid(
            "rate_limit.idle_windows must be greater than 0 when the sweep is enabled",
        ));
    }

    Ok(())
}

fn invalid(message: &str) -> BridgeError {
    BridgeError::InvalidConfig(message.to_string())
}
