//! Cached resource collections with request tracking.
//!
//! [`ResourceStore`] is the reusable state machine behind every resource
//! family. Each public operation runs `idle -> loading -> idle`: it raises
//! `loading`, clears the previous `error`, awaits one gateway call, and then
//! reconciles the cache with the server-confirmed result. A failure is
//! recorded in `error` and returned to the caller; the store stays usable.
//!
//! The family stores ([`RepositoryStore`], [`CollaboratorStore`],
//! [`ActivityStore`]) pair a `ResourceStore` with the endpoints for their
//! family.
//!
//! # Concurrency
//!
//! Operations on one store are not serialized. Overlapping calls each reset
//! `loading` when they settle, and the flags reflect whichever settled last.
//! Cache updates never hold a lock across an await.

pub mod activities;
pub mod collaborators;
pub mod repositories;

pub use activities::ActivityStore;
pub use collaborators::CollaboratorStore;
pub use repositories::RepositoryStore;

use std::future::Future;
use std::sync::Arc;

use gitserver_core::Resource;
use tokio::sync::watch;
use tracing::debug;

use crate::gateway::GatewayError;

/// Snapshot of a store's cache and request state.
#[derive(Debug, Clone)]
pub struct ResourceState<R> {
    /// Cached collection, in server order.
    pub items: Vec<R>,
    /// The currently selected record, if any.
    pub selected: Option<R>,
    /// True while an operation owned by this store is in flight.
    pub loading: bool,
    /// Failure of the most recent operation, cleared when the next one starts.
    pub error: Option<GatewayError>,
}

impl<R> Default for ResourceState<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: None,
            loading: false,
            error: None,
        }
    }
}

/// Cache for one resource family.
#[derive(Debug, Clone)]
pub struct ResourceStore<R> {
    state: Arc<watch::Sender<ResourceState<R>>>,
}

impl<R: Resource> Default for ResourceStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> ResourceStore<R> {
    /// Empty, idle store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(watch::Sender::new(ResourceState::default())),
        }
    }

    /// Clone of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ResourceState<R> {
        self.state.borrow().clone()
    }

    /// Clone of the cached collection.
    #[must_use]
    pub fn items(&self) -> Vec<R> {
        self.state.borrow().items.clone()
    }

    /// Clone of the selected record.
    #[must_use]
    pub fn selected(&self) -> Option<R> {
        self.state.borrow().selected.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    #[must_use]
    pub fn error(&self) -> Option<GatewayError> {
        self.state.borrow().error.clone()
    }

    /// Receive every subsequent state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<R>> {
        self.state.subscribe()
    }

    /// Run `call`, replacing the whole cached collection with its result.
    ///
    /// # Errors
    ///
    /// Returns the failure of `call`; the cache is left unchanged.
    pub async fn fetch_collection<F>(&self, call: F) -> Result<Vec<R>, GatewayError>
    where
        F: Future<Output = Result<Vec<R>, GatewayError>>,
    {
        self.fetch_collection_with(call, || {}).await
    }

    /// [`fetch_collection`](Self::fetch_collection), running `on_commit`
    /// under the same state update that replaces the collection.
    ///
    /// `on_commit` only runs on success. Other operations reconciling against
    /// this store observe the new collection and `on_commit`'s effects
    /// together.
    ///
    /// # Errors
    ///
    /// Returns the failure of `call`; the cache is left unchanged.
    pub async fn fetch_collection_with<F, C>(
        &self,
        call: F,
        on_commit: C,
    ) -> Result<Vec<R>, GatewayError>
    where
        F: Future<Output = Result<Vec<R>, GatewayError>>,
        C: FnOnce(),
    {
        let guard = self.begin();
        let items = self.settle(call.await)?;
        self.state.send_modify(|state| {
            state.items.clone_from(&items);
            on_commit();
        });
        debug!(count = items.len(), "Collection replaced");
        drop(guard);
        Ok(items)
    }

    /// Run `call`, selecting the record it returns.
    ///
    /// # Errors
    ///
    /// Returns the failure of `call`; the previous selection is kept.
    pub async fn fetch_one<F>(&self, call: F) -> Result<R, GatewayError>
    where
        F: Future<Output = Result<R, GatewayError>>,
    {
        let guard = self.begin();
        let item = self.settle(call.await)?;
        self.state
            .send_modify(|state| state.selected = Some(item.clone()));
        drop(guard);
        Ok(item)
    }

    /// Run `call`, appending the created record to the end of the cache.
    ///
    /// # Errors
    ///
    /// Returns the failure of `call`; the cache is left unchanged.
    pub async fn create<F>(&self, call: F) -> Result<R, GatewayError>
    where
        F: Future<Output = Result<R, GatewayError>>,
    {
        self.create_if(call, || true).await
    }

    /// [`create`](Self::create), appending only if `still_current` holds once
    /// `call` has settled.
    ///
    /// `still_current` is checked under the state update that would append,
    /// so a concurrent [`fetch_collection_with`](Self::fetch_collection_with)
    /// cannot slip in between the check and the append.
    ///
    /// # Errors
    ///
    /// Returns the failure of `call`; the cache is left unchanged.
    pub async fn create_if<F, P>(&self, call: F, still_current: P) -> Result<R, GatewayError>
    where
        F: Future<Output = Result<R, GatewayError>>,
        P: FnOnce() -> bool,
    {
        let guard = self.begin();
        let item = self.settle(call.await)?;
        self.state.send_if_modified(|state| {
            if !still_current() {
                debug!(id = %item.id(), "Cache changed hands, not appending");
                return false;
            }
            state.items.push(item.clone());
            debug!(id = %item.id(), "Appended created record");
            true
        });
        drop(guard);
        Ok(item)
    }

    /// Run `call`, replacing the cached record with identifier `id` in place.
    ///
    /// Update never inserts: if no cached record has `id`, the collection is
    /// left as it is. The selection is replaced too when it has `id`.
    ///
    /// # Errors
    ///
    /// Returns the failure of `call`; the cache is left unchanged.
    pub async fn update<F>(&self, id: R::Id, call: F) -> Result<R, GatewayError>
    where
        F: Future<Output = Result<R, GatewayError>>,
    {
        let guard = self.begin();
        let item = self.settle(call.await)?;
        self.state.send_modify(|state| {
            if let Some(slot) = state.items.iter_mut().find(|r| r.id() == id) {
                *slot = item.clone();
            } else {
                debug!(id = %id, "Updated record not cached, collection unchanged");
            }
            if state.selected.as_ref().is_some_and(|r| r.id() == id) {
                state.selected = Some(item.clone());
            }
        });
        drop(guard);
        Ok(item)
    }

    /// Run `call`, removing every cached record with identifier `id` and
    /// clearing the selection if it has `id`.
    ///
    /// # Errors
    ///
    /// Returns the failure of `call`; the cache is left unchanged.
    pub async fn delete<F>(&self, id: R::Id, call: F) -> Result<(), GatewayError>
    where
        F: Future<Output = Result<(), GatewayError>>,
    {
        self.delete_if(id, call, || true).await
    }

    /// [`delete`](Self::delete), removing only if `still_current` holds once
    /// `call` has settled. Checked the same way as in
    /// [`create_if`](Self::create_if).
    ///
    /// # Errors
    ///
    /// Returns the failure of `call`; the cache is left unchanged.
    pub async fn delete_if<F, P>(
        &self,
        id: R::Id,
        call: F,
        still_current: P,
    ) -> Result<(), GatewayError>
    where
        F: Future<Output = Result<(), GatewayError>>,
        P: FnOnce() -> bool,
    {
        let guard = self.begin();
        self.settle(call.await)?;
        self.state.send_if_modified(|state| {
            if !still_current() {
                debug!(id = %id, "Cache changed hands, not removing");
                return false;
            }
            state.items.retain(|r| r.id() != id);
            if state.selected.as_ref().is_some_and(|r| r.id() == id) {
                state.selected = None;
            }
            true
        });
        drop(guard);
        Ok(())
    }

    /// Run `call` with loading and error tracking but no cache reconciliation.
    ///
    /// # Errors
    ///
    /// Returns the failure of `call`.
    pub async fn track<T, F>(&self, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        let guard = self.begin();
        let value = self.settle(call.await)?;
        drop(guard);
        Ok(value)
    }

    /// Enter `loading` and clear the previous error. The returned guard resets
    /// `loading` when dropped, on every exit path.
    fn begin(&self) -> LoadingGuard<'_, R> {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        LoadingGuard { state: &self.state }
    }

    /// Record a failure before handing it back.
    fn settle<T>(&self, result: Result<T, GatewayError>) -> Result<T, GatewayError> {
        result.inspect_err(|e| {
            self.state.send_modify(|state| state.error = Some(e.clone()));
        })
    }
}

/// Resets `loading` on drop, including when the operation's future is
/// dropped before it settles.
struct LoadingGuard<'a, R> {
    state: &'a watch::Sender<ResourceState<R>>,
}

impl<R> Drop for LoadingGuard<'_, R> {
    fn drop(&mut self) {
        self.state.send_modify(|state| state.loading = false);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use gitserver_core::{Repository, RepositoryId};

    use super::*;
    use crate::gateway::ErrorPayload;

    fn repo(id: i64, name: &str) -> Repository {
        serde_json::from_value(serde_json::json!({"id": id, "name": name})).unwrap()
    }

    fn server_error(status: u16) -> GatewayError {
        GatewayError::Api {
            status,
            payload: ErrorPayload::new(serde_json::json!({"error": "boom"})),
        }
    }

    async fn seeded(items: Vec<Repository>) -> ResourceStore<Repository> {
        let store = ResourceStore::new();
        store.fetch_collection(async { Ok(items) }).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_fetch_collection_replaces_cache() {
        let store = seeded(vec![repo(1, "a"), repo(2, "b")]).await;
        let items = store
            .fetch_collection(async { Ok(vec![repo(3, "c")]) })
            .await
            .unwrap();

        assert_eq!(items, vec![repo(3, "c")]);
        assert_eq!(store.items(), vec![repo(3, "c")]);
        assert!(!store.is_loading());
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_fetch_collection_failure_records_error() {
        let store = seeded(vec![repo(1, "a")]).await;
        let err = store
            .fetch_collection(async { Err(server_error(500)) })
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(store.error().and_then(|e| e.status()), Some(500));
        assert!(!store.is_loading());
        assert_eq!(store.items(), vec![repo(1, "a")]);
    }

    #[tokio::test]
    async fn test_next_operation_clears_error() {
        let store: ResourceStore<Repository> = ResourceStore::new();
        let _ = store.fetch_collection(async { Err(server_error(503)) }).await;
        assert!(store.error().is_some());

        store.fetch_collection(async { Ok(vec![]) }).await.unwrap();
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_loading_true_only_while_in_flight() {
        let store: ResourceStore<Repository> = ResourceStore::new();
        let observer = store.clone();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let call = async move {
            rx.await.unwrap();
            Ok(vec![repo(1, "a")])
        };
        let op = tokio::spawn({
            let store = store.clone();
            async move { store.fetch_collection(call).await }
        });

        let mut changes = observer.subscribe();
        changes.wait_for(|state| state.loading).await.unwrap();
        assert!(observer.is_loading());

        tx.send(()).unwrap();
        op.await.unwrap().unwrap();
        assert!(!observer.is_loading());
    }

    #[tokio::test]
    async fn test_loading_reset_when_operation_is_dropped() {
        let store: ResourceStore<Repository> = ResourceStore::new();
        {
            let pending = store.fetch_collection(std::future::pending());
            tokio::pin!(pending);
            let poll = tokio::time::timeout(std::time::Duration::from_millis(10), &mut pending);
            assert!(poll.await.is_err());
            assert!(store.is_loading());
        }
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_fetch_one_sets_selection() {
        let store: ResourceStore<Repository> = ResourceStore::new();
        store.fetch_one(async { Ok(repo(7, "x")) }).await.unwrap();
        assert_eq!(store.selected(), Some(repo(7, "x")));

        let _ = store.fetch_one(async { Err(server_error(404)) }).await;
        assert_eq!(store.selected(), Some(repo(7, "x")));
        assert_eq!(store.error().and_then(|e| e.status()), Some(404));
    }

    #[tokio::test]
    async fn test_create_appends_at_end() {
        let store = seeded(vec![repo(2, "b"), repo(1, "a")]).await;
        let created = store.create(async { Ok(repo(5, "e")) }).await.unwrap();

        let items = store.items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2], created);
        assert_eq!(
            items.iter().filter(|r| r.id() == created.id()).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_create_failure_leaves_cache() {
        let store = seeded(vec![repo(1, "a")]).await;
        let _ = store.create(async { Err(server_error(409)) }).await;
        assert_eq!(store.items(), vec![repo(1, "a")]);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_update_replaces_in_place() {
        let store = seeded(vec![repo(1, "a"), repo(2, "b"), repo(3, "c")]).await;
        store.fetch_one(async { Ok(repo(2, "b")) }).await.unwrap();

        store
            .update(RepositoryId::new(2), async { Ok(repo(2, "renamed")) })
            .await
            .unwrap();

        assert_eq!(
            store.items(),
            vec![repo(1, "a"), repo(2, "renamed"), repo(3, "c")]
        );
        assert_eq!(store.selected(), Some(repo(2, "renamed")));
    }

    #[tokio::test]
    async fn test_update_absent_id_never_inserts() {
        let store = seeded(vec![repo(1, "a")]).await;
        store.fetch_one(async { Ok(repo(1, "a")) }).await.unwrap();

        let updated = store
            .update(RepositoryId::new(9), async { Ok(repo(9, "y")) })
            .await
            .unwrap();

        assert_eq!(updated, repo(9, "y"));
        assert_eq!(store.items(), vec![repo(1, "a")]);
        assert_eq!(store.selected(), Some(repo(1, "a")));
    }

    #[tokio::test]
    async fn test_delete_removes_and_clears_selection() {
        let store = seeded(vec![repo(7, "x")]).await;
        store.fetch_one(async { Ok(repo(7, "x")) }).await.unwrap();

        store
            .delete(RepositoryId::new(7), async { Ok(()) })
            .await
            .unwrap();

        assert!(store.items().is_empty());
        assert!(store.selected().is_none());
    }

    #[tokio::test]
    async fn test_delete_keeps_unrelated_selection() {
        let store = seeded(vec![repo(1, "a"), repo(2, "b")]).await;
        store.fetch_one(async { Ok(repo(2, "b")) }).await.unwrap();

        store
            .delete(RepositoryId::new(1), async { Ok(()) })
            .await
            .unwrap();

        assert_eq!(store.items(), vec![repo(2, "b")]);
        assert_eq!(store.selected(), Some(repo(2, "b")));
    }

    #[tokio::test]
    async fn test_delete_failure_leaves_cache() {
        let store = seeded(vec![repo(7, "x")]).await;
        let err = store
            .delete(RepositoryId::new(7), async { Err(server_error(403)) })
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(403));
        assert_eq!(store.items(), vec![repo(7, "x")]);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_create_if_checks_after_settlement() {
        let store = seeded(vec![repo(1, "a")]).await;
        let current = Arc::new(AtomicBool::new(true));

        let call = {
            let current = Arc::clone(&current);
            async move {
                // The cache moves on while the call is in flight
                current.store(false, Ordering::SeqCst);
                Ok(repo(2, "b"))
            }
        };
        let created = store
            .create_if(call, || current.load(Ordering::SeqCst))
            .await
            .unwrap();

        assert_eq!(created, repo(2, "b"));
        assert_eq!(store.items(), vec![repo(1, "a")]);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_delete_if_skips_stale_cache() {
        let store = seeded(vec![repo(7, "x")]).await;
        store
            .delete_if(RepositoryId::new(7), async { Ok(()) }, || false)
            .await
            .unwrap();

        assert_eq!(store.items(), vec![repo(7, "x")]);
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_fetch_collection_with_commits_on_success_only() {
        let store: ResourceStore<Repository> = ResourceStore::new();
        let committed = AtomicBool::new(false);

        store
            .fetch_collection_with(async { Err(server_error(500)) }, || {
                committed.store(true, Ordering::SeqCst);
            })
            .await
            .unwrap_err();
        assert!(!committed.load(Ordering::SeqCst));

        store
            .fetch_collection_with(async { Ok(vec![repo(1, "a")]) }, || {
                committed.store(true, Ordering::SeqCst);
            })
            .await
            .unwrap();
        assert!(committed.load(Ordering::SeqCst));
        assert_eq!(store.items(), vec![repo(1, "a")]);
    }
}
