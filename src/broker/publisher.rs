//! Connection-aware publisher
//!
//! The publisher forwards every message to one fixed topic. While the broker
//! link is down it keeps messages in an in-memory FIFO and flushes them, in
//! arrival order, as soon as the link comes back.
//!
//! Concurrency notes:
//! - `connected` and the pending queue share one mutex. `publish`, the drain
//!   on `Connected` and `Closed` all run under it, so a flush looks atomic from
//!   the outside and a new publish can never overtake queued ones.
//! - Outbound sends happen while the lock is held; `BrokerSink` implementations
//!   must therefore never wait on network I/O.
//! - A message leaves the queue only once the sink has taken it. When the sink
//!   reports `Backpressure` the drain stops and the rest stays queued; the
//!   connection driver calls `flush_pending` as the sink frees up. While a
//!   backlog remains, new messages join the back of the queue.
//! - Delivery is fire-and-forget. A send that fails for any other reason is
//!   logged and dropped.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use super::connection::{BrokerSink, ConnectionEvent};
use super::message::PendingMessage;
use crate::utils::BridgeError;

#[derive(Debug, Default)]
struct PublisherState {
    connected: bool,
    pending: VecDeque<PendingMessage>,
}

pub struct Publisher {
    topic: String,
    state: Mutex<PublisherState>,
    sink: Arc<dyn BrokerSink>,
}

impl Publisher {
    /// Creates a disconnected publisher for `topic`.
    pub fn new(topic: &str, sink: Arc<dyn BrokerSink>) -> Self {
        Self {
            topic: topic.to_string(),
            state: Mutex::new(PublisherState::default()),
            sink,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Sends `message` now if connected with nothing queued, otherwise queues
    /// it behind the backlog. Never blocks and never reports failure to the
    /// caller.
    pub fn publish(&self, message: &str) {
        let mut state = self.lock_state();

        if state.connected && state.pending.is_empty() {
            match self.sink.publish(&self.topic, message) {
                Ok(()) => return,
                Err(BridgeError::Backpressure(reason)) => {
                    debug!("sink full, queueing message: {reason}");
                }
                Err(e) => {
                    warn!(topic = %self.topic, "dropping message: {e}");
                    return;
                }
            }
        }

        state
            .pending
            .push_back(PendingMessage::new(&self.topic, message));
        debug!(
            queued = state.pending.len(),
            connected = state.connected,
            "message queued"
        );
    }

    /// Applies a lifecycle notification from the connection driver.
    pub fn handle_event(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected => self.on_connect(),
            ConnectionEvent::Reconnecting => self.on_reconnect_attempt(),
            ConnectionEvent::Error(message) => self.on_error(&message),
            ConnectionEvent::Closed => self.on_close(),
        }
    }

    pub fn on_connect(&self) {
        let mut state = self.lock_state();
        state.connected = true;

        let flushed = self.drain(&mut state);
        let remaining = state.pending.len();

        if flushed > 0 || remaining > 0 {
            info!(flushed, remaining, "[MQTT] connected, flushing queued messages");
        } else {
            info!("[MQTT] connected");
        }
    }

    /// Hands queued messages to the sink while connected. Returns how many
    /// left the queue.
    pub fn flush_pending(&self) -> usize {
        let mut state = self.lock_state();
        if !state.connected || state.pending.is_empty() {
            return 0;
        }

        let flushed = self.drain(&mut state);
        if state.pending.is_empty() {
            debug!(flushed, "backlog flushed");
        }
        flushed
    }

    pub fn on_close(&self) {
        let mut state = self.lock_state();
        state.connected = false;
        info!(queued = state.pending.len(), "[MQTT] closed");
    }

    pub fn on_reconnect_attempt(&self) {
        info!("[MQTT] reconnecting...");
    }

    pub fn on_error(&self, message: &str) {
        error!("[MQTT] error: {message}");
    }

    pub fn is_connected(&self) -> bool {
        self.lock_state().connected
    }

    pub fn pending_len(&self) -> usize {
        self.lock_state().pending.len()
    }

    /// Snapshot of the queued messages, oldest first.
    pub fn pending_messages(&self) -> Vec<PendingMessage> {
        self.lock_state().pending.iter().cloned().collect()
    }

    // Oldest first. Stops at the first `Backpressure`, leaving that message at
    // the front.
    fn drain(&self, state: &mut PublisherState) -> usize {
        let mut flushed = 0;
        while let Some(msg) = state.pending.front() {
            match self.sink.publish(&msg.topic, &msg.body) {
                Ok(()) => {}
                Err(BridgeError::Backpressure(_)) => break,
                Err(e) => warn!(topic = %msg.topic, "dropping message: {e}"),
            }
            state.pending.pop_front();
            flushed += 1;
        }
        flushed
    }

    // Every mutation under the lock is a single step, so a poisoned state is
    // still consistent.
    fn lock_state(&self) -> MutexGuard<'_, PublisherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("Publisher")
            .field("topic", &self.topic)
            .field("connected", &state.connected)
            .field("pending", &state.pending.len())
            .finish()
    }
}
