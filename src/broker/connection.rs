//! The boundary between the publisher and whatever owns the broker socket.

use crate::utils::Result;

/// Lifecycle notifications emitted by the connection driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The broker accepted the session.
    Connected,
    /// The driver is about to try connecting again.
    Reconnecting,
    /// A transport or protocol error. Does not imply the link is down.
    Error(String),
    /// The link is down.
    Closed,
}

/// Outbound side of a broker connection.
///
/// Implementations must hand the message off without waiting for network
/// I/O: the publisher calls this while holding its state lock. A sink that is
/// temporarily full returns `BridgeError::Backpressure`; the publisher keeps
/// the message and offers it again on the next `flush_pending`.
pub trait BrokerSink: Send + Sync {
    fn publish(&self, topic: &str, body: &str) -> Result<()>;
}
