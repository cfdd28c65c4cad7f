//! Error types for the request pipeline.

use thiserror::Error;

/// Request pipeline error types.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Network/timeout failure before a response envelope exists.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Envelope received with a non-success business code.
    #[error("backend error {code}: {message}")]
    Domain { code: i64, message: String },

    /// Refresh unavailable, or the refresh-and-retry cycle itself failed.
    #[error("authentication expired")]
    AuthExpired,

    /// Caller withdrew interest while the request was pending.
    #[error("request cancelled")]
    Cancelled,

    /// Payload did not decode into the caller's type.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether this is the 401-class that triggers a refresh cycle.
    pub fn is_unauthorized(&self, unauthorized_code: i64) -> bool {
        matches!(self, ApiError::Domain { code, .. } if *code == unauthorized_code)
    }

    /// Display message for the notification sink.
    ///
    /// Prefers the backend-provided message, falls back to the generic one.
    /// `Cancelled` produces nothing: a withdrawn request is not a failure
    /// the user should hear about.
    pub fn user_message(&self, fallback: &str) -> Option<String> {
        match self {
            ApiError::Cancelled => None,
            ApiError::Domain { message, .. } if !message.is_empty() => Some(message.clone()),
            ApiError::AuthExpired => Some("Login session expired".to_string()),
            _ => Some(fallback.to_string()),
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ApiError>;
