//! Application context: one instance of each component, wired together.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::gateway::{Gateway, GatewayError};
use crate::navigation::Navigator;
use crate::session::{SessionManager, SessionState, SessionStorage};
use crate::stores::{ActivityStore, CollaboratorStore, RepositoryStore};

/// Handle to the client's components.
///
/// Build one per process and pass it (or clones of it) to consumers. Every
/// clone shares the same session, gateway, and stores.
#[derive(Debug, Clone)]
pub struct AppContext {
    inner: Arc<AppContextInner>,
}

#[derive(Debug)]
struct AppContextInner {
    session: SessionManager,
    gateway: Gateway,
    repositories: RepositoryStore,
    collaborators: CollaboratorStore,
    activities: ActivityStore,
}

impl AppContext {
    /// Restore the session from `storage` and build the gateway and stores.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Client` if the HTTP client fails to build.
    pub fn new(
        config: ClientConfig,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, GatewayError> {
        let state = SessionState::restore(storage);
        let gateway = Gateway::new(config, state.clone(), navigator)?;

        Ok(Self {
            inner: Arc::new(AppContextInner {
                session: SessionManager::new(state, gateway.clone()),
                repositories: RepositoryStore::new(gateway.clone()),
                collaborators: CollaboratorStore::new(gateway.clone()),
                activities: ActivityStore::new(gateway.clone()),
                gateway,
            }),
        })
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.inner.gateway
    }

    #[must_use]
    pub fn repositories(&self) -> &RepositoryStore {
        &self.inner.repositories
    }

    #[must_use]
    pub fn collaborators(&self) -> &CollaboratorStore {
        &self.inner.collaborators
    }

    #[must_use]
    pub fn activities(&self) -> &ActivityStore {
        &self.inner.activities
    }
}
