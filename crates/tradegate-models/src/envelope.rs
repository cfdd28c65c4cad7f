//! The backend's uniform response wrapper.

use serde::{Deserialize, Serialize};

/// Response envelope `{ code, message, data }` returned by every endpoint.
///
/// `code` is a business code, not an HTTP status; the success sentinel is
/// configured on the client (the backend uses `0`). `data` is absent on
/// most error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Business code (`0` for success on this backend)
    pub code: i64,
    /// Human-readable message, set on errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The actual payload
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Check the business code against a configured success sentinel.
    pub fn is_success(&self, success_code: i64) -> bool {
        self.code == success_code
    }

    /// The backend message, or `fallback` when none was set.
    pub fn message_or(&self, fallback: &str) -> String {
        match self.message.as_deref() {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => fallback.to_string(),
        }
    }
}
