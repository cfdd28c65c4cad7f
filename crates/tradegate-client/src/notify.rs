//! Notification sink for terminal failures.
//!
//! The pipeline forwards exactly one display message per failed top-level
//! call; queued and retried requests never double-notify, and cancelled
//! requests produce nothing. Message selection lives in
//! [`ApiError::user_message`](crate::ApiError::user_message).

use parking_lot::Mutex;
use tracing::warn;

/// Sink accepting a display message, invoked at most once per terminal
/// failure. Mutates no pipeline state.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Default sink: structured log only.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        warn!(message, "request failed");
    }
}

/// Capturing sink for tests and headless batch tooling.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}
