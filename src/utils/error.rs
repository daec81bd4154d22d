//! The `error` module defines the error types used within `popsub-notify`.
//!
//! Configuration problems are fatal and stop the process before it serves
//! traffic. Broker and publish failures are reported through the same type but
//! are only ever logged by the publisher, never handed to HTTP callers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("publish failed: {0}")]
    Publish(String),

    /// The sink cannot take more messages right now; retry after it drains.
    #[error("outbound queue is full: {0}")]
    Backpressure(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
