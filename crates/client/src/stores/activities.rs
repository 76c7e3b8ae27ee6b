//! Activity feed store. Read-only.

use gitserver_core::{Activity, RepositoryId};
use tokio::sync::watch;
use tracing::instrument;

use super::{ResourceState, ResourceStore};
use crate::gateway::{Gateway, GatewayError};

/// Cached activity feed: either the global feed or one repository's.
#[derive(Debug, Clone)]
pub struct ActivityStore {
    gateway: Gateway,
    store: ResourceStore<Activity>,
}

impl ActivityStore {
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            store: ResourceStore::new(),
        }
    }

    /// Cached activities, in server order.
    #[must_use]
    pub fn activities(&self) -> Vec<Activity> {
        self.store.items()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    #[must_use]
    pub fn error(&self) -> Option<GatewayError> {
        self.store.error()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<Activity>> {
        self.store.subscribe()
    }

    /// `GET /activities`, replacing the cache.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure, after recording it in the store.
    #[instrument(skip(self))]
    pub async fn fetch_activities(&self) -> Result<Vec<Activity>, GatewayError> {
        self.store
            .fetch_collection(self.gateway.get("/activities"))
            .await
    }

    /// `GET /activities/repo/{id}`, replacing the cache.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure, after recording it in the store.
    #[instrument(skip(self))]
    pub async fn fetch_repository_activities(
        &self,
        repo_id: RepositoryId,
    ) -> Result<Vec<Activity>, GatewayError> {
        self.store
            .fetch_collection(self.gateway.get(&format!("/activities/repo/{repo_id}")))
            .await
    }
}
