use serde::{Deserialize, Serialize};

/// Body used when a request carries no message.
pub const DEFAULT_MESSAGE: &str = "No message";

#[derive(Debug, Deserialize)]
pub struct NotifyParams {
    pub message: Option<String>,
}

impl NotifyParams {
    /// The message to publish; missing or empty becomes [`DEFAULT_MESSAGE`].
    pub fn into_message(self) -> String {
        self.message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status")]
pub enum NotifyResponse {
    #[serde(rename = "ok")]
    Accepted { topic: String, message: String },
    #[serde(rename = "error")]
    Error { message: String },
}

impl NotifyResponse {
    pub fn too_many_requests() -> Self {
        Self::Error {
            message: "Too Many Requests".to_string(),
        }
    }
}
