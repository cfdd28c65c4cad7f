//! Re-authentication trigger.
//!
//! Invoked when a silent refresh is unavailable or has failed. Depending on
//! the configured [`ExpiryMode`] it either flips the session into a soft
//! "login expired" state so the UI can prompt for re-login in place, or
//! performs a hard logout through the [`SessionHooks`] collaborator.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::AccessStore;

/// Strategy for handling a dead session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryMode {
    /// Keep navigation state and surface a re-login prompt
    Modal,
    /// Clear everything and navigate to the login entry point
    #[default]
    Redirect,
}

/// Navigation/session collaborator.
///
/// The SDK owns no UI; these hooks are where the host application flips its
/// re-login flag or clears its own caches and navigates away.
#[async_trait]
pub trait SessionHooks: Send + Sync {
    /// Soft expiry: the session is preserved, a re-login prompt should be
    /// shown.
    async fn on_login_expired(&self);

    /// Hard logout: clear application state and navigate to login.
    /// `redirect_to` is the location to return to after re-login.
    async fn on_logout(&self, redirect_to: Option<String>);
}

/// Default hooks for headless use: log and move on.
#[derive(Debug, Default)]
pub struct NoopHooks;

#[async_trait]
impl SessionHooks for NoopHooks {
    async fn on_login_expired(&self) {
        debug!("session expired, no hooks installed");
    }

    async fn on_logout(&self, redirect_to: Option<String>) {
        debug!(?redirect_to, "logout requested, no hooks installed");
    }
}

/// Re-authentication trigger.
///
/// Fires at most once per expired session: concurrent and repeated calls
/// after the first are no-ops until [`ReauthTrigger::reset`] (successful
/// login) re-arms it.
pub struct ReauthTrigger {
    store: Arc<AccessStore>,
    hooks: Arc<dyn SessionHooks>,
    mode: ExpiryMode,
    fired: AtomicBool,
    location: RwLock<Option<String>>,
}

impl ReauthTrigger {
    pub fn new(store: Arc<AccessStore>, hooks: Arc<dyn SessionHooks>, mode: ExpiryMode) -> Self {
        Self {
            store,
            hooks,
            mode,
            fired: AtomicBool::new(false),
            location: RwLock::new(None),
        }
    }

    /// Record the host application's current location so a hard logout can
    /// send the user back there after re-login.
    pub fn set_current_location(&self, location: impl Into<String>) {
        *self.location.write() = Some(location.into());
    }

    /// Escalate to re-authentication.
    ///
    /// Modal mode requires an established session (a token checked at least
    /// once); otherwise, and always in redirect mode, the store is cleared
    /// and the logout hook runs.
    pub async fn trigger(&self) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }

        warn!(
            mode = ?self.mode,
            token = %self.store.get().masked(),
            "access credential rejected, escalating to re-authentication"
        );

        if self.mode == ExpiryMode::Modal && self.store.is_checked() {
            // The rejected access token is dead either way; only the
            // refresh token and navigation state survive the prompt.
            self.store.clear_access_token();
            self.store.set_expired(true);
            self.hooks.on_login_expired().await;
        } else {
            self.logout(true).await;
        }
    }

    /// Hard logout: clear the credential pair and hand navigation to the
    /// host. With `redirect` set, the recorded current location is passed
    /// along for post-login redirect.
    pub async fn logout(&self, redirect: bool) {
        self.store.clear();
        self.store.set_expired(false);
        let redirect_to = if redirect {
            self.location.read().clone()
        } else {
            None
        };
        self.hooks.on_logout(redirect_to).await;
    }

    /// Re-arm after a successful login.
    pub fn reset(&self) {
        self.fired.store(false, Ordering::SeqCst);
        self.store.set_expired(false);
    }

    /// Whether the trigger has already fired for the current session.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}
