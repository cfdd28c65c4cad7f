//! Process-wide access credential store.

use std::sync::Arc;

use parking_lot::RwLock;
use tradegate_models::{Credential, SessionState};

#[derive(Debug, Default)]
struct StoreState {
    credential: Credential,
    session: SessionState,
    /// Whether a token has been validated at least once this session.
    /// Drives the soft-expiry branch: a modal prompt only makes sense for
    /// a session that was actually established.
    checked: bool,
}

/// Holder of the current credential pair and session state.
///
/// All operations are synchronous and touch nothing but the store's own
/// state; every mutation is visible to subsequently dispatched requests.
/// Injected into the pipeline by construction so tests get fresh instances.
#[derive(Debug, Default)]
pub struct AccessStore {
    state: RwLock<StoreState>,
}

impl AccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the store for sharing with the pipeline.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Current credential pair.
    pub fn get(&self) -> Credential {
        self.state.read().credential.clone()
    }

    /// Replace the credential pair atomically.
    pub fn set(&self, credential: Credential) {
        self.state.write().credential = credential;
    }

    /// Replace only the access token, keeping the stored refresh token.
    pub fn set_access_token(&self, access_token: impl Into<String>) {
        self.state.write().credential.access_token = Some(access_token.into());
    }

    /// Drop only the access token. The refresh token survives so a
    /// soft-expired session can still be re-established in place.
    pub fn clear_access_token(&self) {
        self.state.write().credential.access_token = None;
    }

    /// Drop the access token. The refresh token goes with it; a cleared
    /// store means a dead session.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.credential = Credential::default();
        state.checked = false;
    }

    pub fn is_expired(&self) -> bool {
        self.state.read().session == SessionState::Expired
    }

    pub fn set_expired(&self, expired: bool) {
        self.state.write().session = if expired {
            SessionState::Expired
        } else {
            SessionState::Active
        };
    }

    pub fn session_state(&self) -> SessionState {
        self.state.read().session
    }

    /// Record that a token has been accepted by the backend at least once.
    pub fn mark_checked(&self) {
        self.state.write().checked = true;
    }

    pub fn is_checked(&self) -> bool {
        self.state.read().checked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_starts_empty_and_active() {
        let store = AccessStore::new();
        assert!(!store.get().has_access_token());
        assert!(!store.is_expired());
        assert!(!store.is_checked());
    }

    #[test]
    fn test_set_and_get_round_trip() {
        let store = AccessStore::new();
        store.set(Credential::new("T", Some("R".to_string())));

        let cred = store.get();
        assert_eq!(cred.access_token.as_deref(), Some("T"));
        assert_eq!(cred.refresh_token.as_deref(), Some("R"));
    }

    #[test]
    fn test_set_access_token_keeps_refresh_token() {
        let store = AccessStore::new();
        store.set(Credential::new("T1", Some("R".to_string())));
        store.set_access_token("T2");

        let cred = store.get();
        assert_eq!(cred.access_token.as_deref(), Some("T2"));
        assert_eq!(cred.refresh_token.as_deref(), Some("R"));
    }

    #[test]
    fn test_clear_access_token_keeps_refresh_token() {
        let store = AccessStore::new();
        store.set(Credential::new("T", Some("R".to_string())));

        store.clear_access_token();

        let cred = store.get();
        assert!(!cred.has_access_token());
        assert_eq!(cred.refresh_token.as_deref(), Some("R"));
    }

    #[test]
    fn test_clear_resets_credential_and_checked() {
        let store = AccessStore::new();
        store.set(Credential::new("T", Some("R".to_string())));
        store.mark_checked();

        store.clear();

        assert!(!store.get().has_access_token());
        assert!(!store.get().can_refresh());
        assert!(!store.is_checked());
    }

    #[test]
    fn test_expired_flag() {
        let store = AccessStore::new();
        store.set_expired(true);
        assert!(store.is_expired());
        assert_eq!(store.session_state(), SessionState::Expired);

        store.set_expired(false);
        assert!(!store.is_expired());
    }
}
