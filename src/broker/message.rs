/// A message accepted while the broker connection was down.
///
/// Created by a disconnected `publish` and consumed exactly once when the
/// connection comes back. Nothing is written to disk: a message still
/// queued when the process exits is lost.
///
/// # Example
///
/// ```rust
/// use popsub_notify::broker::message::PendingMessage;
///
/// let msg = PendingMessage::new("m5/notify", "door opened");
/// assert_eq!(msg.topic, "m5/notify");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub topic: String,
    pub body: String,
}

impl PendingMessage {
    pub fn new(topic: &str, body: &str) -> Self {
        Self {
            topic: topic.to_string(),
            body: body.to_string(),
        }
    }
}
