//! Bearer credential pair and session state.

use serde::{Deserialize, Serialize};

/// The bearer credential pair held by the access store.
///
/// A non-empty `access_token` is only ever produced by a successful login
/// or refresh response; the pair is always replaced whole, never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Short-lived access token attached to every API call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Longer-lived token used solely to obtain a new access token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Credential {
    /// Create a credential from a token pair.
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token,
        }
    }

    /// Whether an access token is present.
    pub fn has_access_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Whether a silent refresh is possible.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Get a display-safe version of the access token (masked).
    pub fn masked(&self) -> String {
        let Some(value) = self.access_token.as_deref() else {
            return "<none>".to_string();
        };
        let chars: Vec<char> = value.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

/// Client-side session state.
///
/// `Expired` means re-authentication is required but deferred (the UI shows
/// a re-login prompt instead of discarding navigation state). While
/// `Expired`, the pipeline never attempts another silent refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Active,
    Expired,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Active => write!(f, "active"),
            SessionState::Expired => write!(f, "expired"),
        }
    }
}
