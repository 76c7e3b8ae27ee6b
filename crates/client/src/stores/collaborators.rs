//! Collaborator store.
//!
//! Holds the collaborators of one repository at a time: the repository most
//! recently fetched with [`CollaboratorStore::fetch_collaborators`]. Adding or
//! removing a collaborator on a different repository still goes to the
//! server, but does not touch a cache that belongs to another repository.
//! Ownership is checked when the server answers, not when the call starts,
//! and a fetch switches the cache and its owning repository in one update.

use std::sync::Arc;

use gitserver_core::{AddCollaborator, Collaborator, RepositoryId, UserId};
use tokio::sync::watch;
use tracing::instrument;

use super::{ResourceState, ResourceStore};
use crate::gateway::{Gateway, GatewayError};

#[derive(Debug, Clone)]
pub struct CollaboratorStore {
    gateway: Gateway,
    store: ResourceStore<Collaborator>,
    repository: Arc<watch::Sender<Option<RepositoryId>>>,
}

impl CollaboratorStore {
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            store: ResourceStore::new(),
            repository: Arc::new(watch::Sender::new(None)),
        }
    }

    /// Cached collaborators, in server order.
    #[must_use]
    pub fn collaborators(&self) -> Vec<Collaborator> {
        self.store.items()
    }

    /// Repository the cache belongs to, if one has been fetched.
    #[must_use]
    pub fn repository(&self) -> Option<RepositoryId> {
        *self.repository.borrow()
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
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<Collaborator>> {
        self.store.subscribe()
    }

    fn is_cached(&self, repo_id: RepositoryId) -> bool {
        self.repository() == Some(repo_id)
    }

    /// `GET /repos/{id}/collaborators`, replacing the cache.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure, after recording it in the store.
    #[instrument(skip(self))]
    pub async fn fetch_collaborators(
        &self,
        repo_id: RepositoryId,
    ) -> Result<Vec<Collaborator>, GatewayError> {
        self.store
            .fetch_collection_with(
                self.gateway
                    .get(&format!("/repos/{repo_id}/collaborators")),
                || {
                    self.repository.send_replace(Some(repo_id));
                },
            )
            .await
    }

    /// `POST /repos/{id}/collaborators`, appending the new collaborator when
    /// the cache belongs to `repo_id` at the time the server answers.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure, after recording it in the store.
    #[instrument(skip(self, payload), fields(username = %payload.username))]
    pub async fn add_collaborator(
        &self,
        repo_id: RepositoryId,
        payload: &AddCollaborator,
    ) -> Result<Collaborator, GatewayError> {
        let path = format!("/repos/{repo_id}/collaborators");
        self.store
            .create_if(self.gateway.post(&path, payload), || {
                self.is_cached(repo_id)
            })
            .await
    }

    /// `DELETE /repos/{id}/collaborators/{user_id}`, removing the collaborator
    /// when the cache belongs to `repo_id` at the time the server answers.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure, after recording it in the store.
    #[instrument(skip(self))]
    pub async fn remove_collaborator(
        &self,
        repo_id: RepositoryId,
        user_id: UserId,
    ) -> Result<(), GatewayError> {
        let path = format!("/repos/{repo_id}/collaborators/{user_id}");
        self.store
            .delete_if(user_id, self.gateway.delete(&path), || {
                self.is_cached(repo_id)
            })
            .await
    }
}
