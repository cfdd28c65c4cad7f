//! Auth and user payloads.

use serde::{Deserialize, Serialize};

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginParams {
    pub username: String,
    pub password: String,
}

impl LoginParams {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Login response payload (envelope `data`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResult {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Refresh response payload (envelope `data`).
///
/// The backend may rotate the refresh token; when it does not, the client
/// keeps the stored one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResult {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Current-user payload returned by the `me` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl UserInfo {
    /// Access codes driving client-side permission checks: the union of
    /// role names and fine-grained permissions, deduplicated, order
    /// preserved (roles first).
    pub fn access_codes(&self) -> AccessCodes {
        let mut codes: Vec<String> = Vec::with_capacity(self.roles.len() + self.permissions.len());
        for code in self.roles.iter().chain(self.permissions.iter()) {
            if !codes.iter().any(|existing| existing == code) {
                codes.push(code.clone());
            }
        }
        AccessCodes(codes)
    }
}

/// Deduplicated union of roles and permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCodes(pub Vec<String>);

impl AccessCodes {
    pub fn contains(&self, code: &str) -> bool {
        self.0.iter().any(|c| c == code)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
