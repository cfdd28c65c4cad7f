//! Client configuration.

use serde::{Deserialize, Serialize};

use crate::session::ExpiryMode;

/// Configuration for the request client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL every path is appended to (e.g. `http://host:5555/api`)
    pub base_url: String,
    /// Envelope business code that signals success
    #[serde(default = "default_success_code")]
    pub success_code: i64,
    /// Envelope business code treated as 401-class alongside HTTP 401
    #[serde(default = "default_unauthorized_code")]
    pub unauthorized_code: i64,
    /// Whether a 401 triggers a silent refresh before re-authentication
    #[serde(default = "default_true")]
    pub enable_refresh: bool,
    /// Path of the refresh endpoint
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Value of the `Accept-Language` header
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Soft-expiry prompt vs hard logout when re-authentication is needed
    #[serde(default)]
    pub expiry_mode: ExpiryMode,
    /// Default per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Timeout for the refresh call itself; a timeout counts as a refresh
    /// failure
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,
    /// Fallback notification text when the backend sends no message
    #[serde(default = "default_error_message")]
    pub generic_error_message: String,
}

fn default_success_code() -> i64 {
    0
}
fn default_unauthorized_code() -> i64 {
    401
}
fn default_true() -> bool {
    true
}
fn default_refresh_path() -> String {
    "/v1/auth/refresh".to_string()
}
fn default_locale() -> String {
    "en-US".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_refresh_timeout() -> u64 {
    10
}
fn default_error_message() -> String {
    "Request failed".to_string()
}

impl ClientConfig {
    /// Create a config for the given base URL with defaults everywhere else.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            success_code: default_success_code(),
            unauthorized_code: default_unauthorized_code(),
            enable_refresh: true,
            refresh_path: default_refresh_path(),
            locale: default_locale(),
            expiry_mode: ExpiryMode::default(),
            request_timeout_secs: default_request_timeout(),
            refresh_timeout_secs: default_refresh_timeout(),
            generic_error_message: default_error_message(),
        }
    }

    /// Set the expiry handling strategy.
    pub fn with_expiry_mode(mut self, mode: ExpiryMode) -> Self {
        self.expiry_mode = mode;
        self
    }

    /// Enable or disable the silent refresh cycle.
    pub fn with_refresh(mut self, enabled: bool) -> Self {
        self.enable_refresh = enabled;
        self
    }

    /// Set the locale sent with every request.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Resolve a request path against the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
