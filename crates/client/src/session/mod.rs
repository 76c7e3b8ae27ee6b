//! Authentication state and its lifecycle.
//!
//! # Architecture
//!
//! - [`SessionState`] is the single source of truth for the Credential and
//!   Identity. It restores itself from a [`SessionStorage`] adapter at
//!   construction and writes through to it on every change.
//! - State lives in a `tokio::sync::watch` channel, so subscribers observe
//!   every change and [`SessionState::is_authenticated`] is always computed
//!   from the current credential.
//! - [`SessionManager`] adds the remote operations (login, registration,
//!   current user) on top of the state, through the gateway.
//! - The gateway holds a [`SessionState`] handle of its own, to read the
//!   credential and to force a logout on a 401.
//!
//! Concurrent writers (a user login completing while an in-flight request
//! forces a logout) are serialized by the channel; the last write wins.

pub mod manager;
pub mod storage;

pub use manager::SessionManager;
pub use storage::{FileStorage, MemoryStorage, PersistedSession, SessionStorage, StorageError};

use std::sync::Arc;

use gitserver_core::User;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{info, warn};

/// A snapshot of the authentication state.
///
/// Identity is only ever present alongside a non-empty credential.
#[derive(Debug, Clone)]
pub struct Session {
    credential: SecretString,
    identity: Option<User>,
}

impl Session {
    /// The unauthenticated session: empty credential, no identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            credential: SecretString::from(String::new()),
            identity: None,
        }
    }

    /// The bearer credential, empty when unauthenticated.
    #[must_use]
    pub const fn credential(&self) -> &SecretString {
        &self.credential
    }

    /// The authenticated user's profile, if resolved.
    #[must_use]
    pub const fn identity(&self) -> Option<&User> {
        self.identity.as_ref()
    }

    /// True iff the credential is non-empty.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.credential.expose_secret().is_empty()
    }

    fn to_persisted(&self) -> Result<PersistedSession, serde_json::Error> {
        let user = self.identity.as_ref().map(serde_json::to_string).transpose()?;
        Ok(PersistedSession {
            token: Some(self.credential.expose_secret().to_string()),
            user,
        })
    }

    fn from_persisted(persisted: PersistedSession) -> Self {
        let token = persisted.token.unwrap_or_default();
        if token.is_empty() {
            return Self::anonymous();
        }

        let identity = persisted.user.and_then(|raw| {
            serde_json::from_str::<Option<User>>(&raw)
                .inspect_err(|e| warn!(error = %e, "Discarding unparsable persisted identity"))
                .ok()
                .flatten()
        });

        Self {
            credential: SecretString::from(token),
            identity,
        }
    }
}

/// Shared handle to the authentication state.
///
/// Cheap to clone; all clones observe and mutate the same state.
#[derive(Clone)]
pub struct SessionState {
    inner: Arc<SessionStateInner>,
}

struct SessionStateInner {
    state: watch::Sender<Session>,
    storage: Arc<dyn SessionStorage>,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl SessionState {
    /// Restore the session from `storage`.
    ///
    /// A missing or empty credential restores as unauthenticated. An
    /// unreadable store or unparsable identity is logged and treated as
    /// absent.
    #[must_use]
    pub fn restore(storage: Arc<dyn SessionStorage>) -> Self {
        let session = match storage.load() {
            Ok(persisted) => Session::from_persisted(persisted),
            Err(e) => {
                warn!(error = %e, "Failed to load persisted session, starting logged out");
                Session::anonymous()
            }
        };

        Self {
            inner: Arc::new(SessionStateInner {
                state: watch::Sender::new(session),
                storage,
            }),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// True iff the current credential is non-empty.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// The current credential, or `None` when unauthenticated.
    #[must_use]
    pub fn credential(&self) -> Option<SecretString> {
        let state = self.inner.state.borrow();
        state
            .is_authenticated()
            .then(|| state.credential.clone())
    }

    /// The current Identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<User> {
        self.inner.state.borrow().identity.clone()
    }

    /// Receive every subsequent change to the session.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Clear the credential and identity in memory and in storage.
    ///
    /// Idempotent and infallible; a storage failure is logged.
    pub fn logout(&self) {
        let storage = &self.inner.storage;
        self.inner.state.send_modify(|session| {
            let was_authenticated = session.is_authenticated();
            *session = Session::anonymous();
            if let Err(e) = storage.clear() {
                warn!(error = %e, "Failed to clear persisted session");
            }
            if was_authenticated {
                info!("Session cleared");
            }
        });
    }

    /// Install a server-confirmed credential and identity, persisting both.
    ///
    /// An empty credential is refused and the current session kept, so an
    /// identity never appears without a credential.
    pub(crate) fn establish(&self, credential: SecretString, identity: User) {
        if credential.expose_secret().is_empty() {
            warn!("Refusing to install an identity without a credential");
            return;
        }
        self.replace(Session {
            credential,
            identity: Some(identity),
        });
    }

    /// Replace the identity of the current session.
    ///
    /// Ignored when unauthenticated, so an identity lookup that completes
    /// after a logout cannot resurrect half a session.
    pub(crate) fn set_identity(&self, identity: User) {
        let storage = &self.inner.storage;
        self.inner.state.send_if_modified(|session| {
            if !session.is_authenticated() {
                return false;
            }
            session.identity = Some(identity);
            persist(storage.as_ref(), session);
            true
        });
    }

    fn replace(&self, next: Session) {
        let storage = &self.inner.storage;
        self.inner.state.send_modify(|session| {
            *session = next;
            persist(storage.as_ref(), session);
        });
    }
}

/// Write `session` through to storage. Failures are logged; the in-memory
/// state stays authoritative.
fn persist(storage: &dyn SessionStorage, session: &Session) {
    let result = session
        .to_persisted()
        .map_err(StorageError::from)
        .and_then(|persisted| storage.save(&persisted));
    if let Err(e) = result {
        warn!(error = %e, "Failed to persist session");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gitserver_core::UserId;

    use super::*;

    fn alice() -> User {
        serde_json::from_str(r#"{"id":1,"username":"alice"}"#).unwrap()
    }

    fn persisted(token: Option<&str>, user: Option<&str>) -> PersistedSession {
        PersistedSession {
            token: token.map(String::from),
            user: user.map(String::from),
        }
    }

    #[test]
    fn test_restore_from_empty_storage() {
        let state = SessionState::restore(Arc::new(MemoryStorage::new()));
        assert!(!state.is_authenticated());
        assert!(state.credential().is_none());
        assert!(state.identity().is_none());
        assert!(state.snapshot().credential().expose_secret().is_empty());
    }

    #[test]
    fn test_restore_credential_and_identity() {
        let storage = MemoryStorage::with_session(persisted(
            Some("abc123"),
            Some(r#"{"id":1,"username":"alice"}"#),
        ));
        let state = SessionState::restore(Arc::new(storage));

        assert!(state.is_authenticated());
        assert_eq!(state.credential().unwrap().expose_secret(), "abc123");
        assert_eq!(state.identity().unwrap().id, UserId::new(1));
    }

    #[test]
    fn test_restore_discards_unparsable_identity() {
        let storage = MemoryStorage::with_session(persisted(Some("abc123"), Some("{not json")));
        let state = SessionState::restore(Arc::new(storage));

        assert!(state.is_authenticated());
        assert!(state.identity().is_none());
    }

    #[test]
    fn test_restore_null_identity() {
        let storage = MemoryStorage::with_session(persisted(Some("abc123"), Some("null")));
        let state = SessionState::restore(Arc::new(storage));
        assert!(state.identity().is_none());
    }

    #[test]
    fn test_restore_identity_without_credential_is_dropped() {
        let storage = MemoryStorage::with_session(persisted(
            Some(""),
            Some(r#"{"id":1,"username":"alice"}"#),
        ));
        let state = SessionState::restore(Arc::new(storage));

        assert!(!state.is_authenticated());
        assert!(state.identity().is_none());
    }

    #[test]
    fn test_establish_persists_both_entries() {
        let storage = Arc::new(MemoryStorage::new());
        let state = SessionState::restore(storage.clone());

        state.establish(SecretString::from("abc123"), alice());

        assert!(state.is_authenticated());
        assert_eq!(storage.get(storage::TOKEN_KEY).as_deref(), Some("abc123"));
        let user: User = serde_json::from_str(&storage.get(storage::USER_KEY).unwrap()).unwrap();
        assert_eq!(user, alice());
    }

    #[test]
    fn test_establish_refuses_empty_credential() {
        let storage = Arc::new(MemoryStorage::new());
        let state = SessionState::restore(storage.clone());
        state.establish(SecretString::from("abc123"), alice());

        state.establish(SecretString::from(""), alice());

        assert!(state.is_authenticated());
        assert_eq!(state.credential().unwrap().expose_secret(), "abc123");
        assert_eq!(storage.get(storage::TOKEN_KEY).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_establish_empty_credential_keeps_anonymous_session() {
        let storage = Arc::new(MemoryStorage::new());
        let state = SessionState::restore(storage.clone());

        state.establish(SecretString::from(""), alice());

        assert!(!state.is_authenticated());
        assert!(state.identity().is_none());
        assert_eq!(storage.get(storage::USER_KEY), None);
    }

    #[test]
    fn test_logout_clears_memory_and_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let state = SessionState::restore(storage.clone());
        state.establish(SecretString::from("abc123"), alice());

        state.logout();
        assert!(!state.is_authenticated());
        assert!(state.identity().is_none());
        assert_eq!(storage.get(storage::TOKEN_KEY), None);
        assert_eq!(storage.get(storage::USER_KEY), None);

        // Idempotent
        state.logout();
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_is_authenticated_tracks_every_change() {
        let state = SessionState::restore(Arc::new(MemoryStorage::new()));
        let mut rx = state.subscribe();
        assert!(!rx.borrow_and_update().is_authenticated());

        state.establish(SecretString::from("abc123"), alice());
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated());
        assert!(state.is_authenticated());

        state.logout();
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_authenticated());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_set_identity_ignored_when_logged_out() {
        let storage = Arc::new(MemoryStorage::new());
        let state = SessionState::restore(storage.clone());

        state.set_identity(alice());
        assert!(state.identity().is_none());
        assert_eq!(storage.get(storage::USER_KEY), None);
    }

    #[test]
    fn test_set_identity_updates_persisted_identity() {
        let storage = Arc::new(MemoryStorage::with_session(persisted(Some("abc123"), None)));
        let state = SessionState::restore(storage.clone());
        assert!(state.identity().is_none());

        state.set_identity(alice());
        assert_eq!(state.identity(), Some(alice()));
        assert!(storage.get(storage::USER_KEY).is_some());
        assert_eq!(storage.get(storage::TOKEN_KEY).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_debug_does_not_leak_credential() {
        let state = SessionState::restore(Arc::new(MemoryStorage::new()));
        state.establish(SecretString::from("abc123"), alice());
        assert!(!format!("{state:?}").contains("abc123"));
        assert!(!format!("{:?}", state.snapshot()).contains("abc123"));
    }
}
