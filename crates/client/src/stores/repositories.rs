//! Repository store.

use gitserver_core::{CreateRepository, Repository, RepositoryId, UpdateRepository};
use tokio::sync::watch;
use tracing::instrument;

use super::{ResourceState, ResourceStore};
use crate::gateway::{Gateway, GatewayError};

/// Cached repository list plus the currently opened repository.
#[derive(Debug, Clone)]
pub struct RepositoryStore {
    gateway: Gateway,
    store: ResourceStore<Repository>,
}

impl RepositoryStore {
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            store: ResourceStore::new(),
        }
    }

    /// Cached repositories, in server order.
    #[must_use]
    pub fn repositories(&self) -> Vec<Repository> {
        self.store.items()
    }

    /// The repository last opened with [`Self::fetch_repository`].
    #[must_use]
    pub fn current_repository(&self) -> Option<Repository> {
        self.store.selected()
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
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<Repository>> {
        self.store.subscribe()
    }

    /// `GET /repos`, replacing the cache.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure, after recording it in the store.
    #[instrument(skip(self))]
    pub async fn fetch_repositories(&self) -> Result<Vec<Repository>, GatewayError> {
        self.store
            .fetch_collection(self.gateway.get("/repos"))
            .await
    }

    /// `GET /repos/{id}`, making it the current repository.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure, after recording it in the store.
    #[instrument(skip(self))]
    pub async fn fetch_repository(&self, id: RepositoryId) -> Result<Repository, GatewayError> {
        self.store
            .fetch_one(self.gateway.get(&format!("/repos/{id}")))
            .await
    }

    /// `POST /repos`, appending the created repository to the cache.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure, after recording it in the store.
    #[instrument(skip(self, payload), fields(name = %payload.name))]
    pub async fn create_repository(
        &self,
        payload: &CreateRepository,
    ) -> Result<Repository, GatewayError> {
        self.store
            .create(self.gateway.post("/repos", payload))
            .await
    }

    /// `PUT /repos/{id}`, replacing the cached entry in place.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure, after recording it in the store.
    #[instrument(skip(self, payload))]
    pub async fn update_repository(
        &self,
        id: RepositoryId,
        payload: &UpdateRepository,
    ) -> Result<Repository, GatewayError> {
        self.store
            .update(id, self.gateway.put(&format!("/repos/{id}"), payload))
            .await
    }

    /// `DELETE /repos/{id}`, removing it from the cache.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure, after recording it in the store.
    #[instrument(skip(self))]
    pub async fn delete_repository(&self, id: RepositoryId) -> Result<(), GatewayError> {
        self.store
            .delete(id, self.gateway.delete(&format!("/repos/{id}")))
            .await
    }
}
