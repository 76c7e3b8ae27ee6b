//! Integration test harness for the gitserver client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p gitserver-integration-tests
//! ```
//!
//! No external services are needed. Each test starts a [`FakeApi`]: an axum
//! server on an ephemeral localhost port that speaks the gitserver REST
//! dialect (`/api/v1/...`, bearer tokens, `{"error": "..."}` bodies) over an
//! in-memory data set.
//!
//! # Example
//!
//! ```rust,no_run
//! use gitserver_integration_tests::FakeApi;
//!
//! # async fn run() {
//! let api = FakeApi::start().await;
//! api.add_user("alice", "secret", "abc123");
//!
//! let client = api.client();
//! client.ctx.repositories().fetch_repositories().await.unwrap_err();
//! assert_eq!(client.navigator.visits(), vec!["/login".to_string()]);
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gitserver_client::navigation::Navigator;
use gitserver_client::session::{MemoryStorage, PersistedSession};
use gitserver_client::{AppContext, ClientConfig};
use gitserver_core::{
    Activity, ActivityId, AddCollaborator, CollaborationId, Collaborator, CreateRepository,
    Repository, RepositoryId, UpdateRepository, User, UserId,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// How long `GET /slow` stalls before answering.
pub const SLOW_RESPONSE: Duration = Duration::from_millis(500);

/// A request as the fake server saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    /// Path below the `/api/v1` prefix.
    pub path: String,
    /// Raw `Authorization` header, if sent.
    pub authorization: Option<String>,
}

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password: String,
    token: String,
}

#[derive(Debug, Default)]
struct ApiState {
    accounts: Vec<Account>,
    revoked: Vec<String>,
    repositories: Vec<Repository>,
    collaborators: Vec<Collaborator>,
    activities: Vec<Activity>,
    requests: Vec<RecordedRequest>,
    collaborator_delay: Duration,
    next_id: i64,
}

impl ApiState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn record_activity(&mut self, user_id: UserId, repository_id: RepositoryId, action: &str) {
        let id = ActivityId::new(self.next_id());
        self.activities.push(Activity {
            id,
            user_id: Some(user_id),
            repository_id: Some(repository_id),
            action: action.to_string(),
            ref_name: String::new(),
            content: String::new(),
            created_at: None,
        });
    }
}

/// In-process stand-in for the gitserver API.
#[derive(Debug, Clone)]
pub struct FakeApi {
    base_url: String,
    state: Arc<Mutex<ApiState>>,
}

impl FakeApi {
    /// Bind an ephemeral port and serve the fake API in the background.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind fake API listener");
        let addr = listener
            .local_addr()
            .expect("failed to read fake API address");

        let api = Self {
            base_url: format!("http://{addr}/api/v1"),
            state: Arc::new(Mutex::new(ApiState::default())),
        };

        let app = api.router();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("fake API server failed");
        });

        api
    }

    /// Client configuration pointing at this server.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url).expect("fake API base URL is absolute")
    }

    /// Anonymous client with empty storage.
    #[must_use]
    pub fn client(&self) -> TestClient {
        TestClient::new(self.config(), MemoryStorage::new())
    }

    /// Client whose storage already holds a session, as after a restart.
    #[must_use]
    pub fn client_with_session(&self, token: &str, user: Option<&User>) -> TestClient {
        let storage = MemoryStorage::with_session(PersistedSession {
            token: Some(token.to_string()),
            user: user.map(|u| serde_json::to_string(u).expect("user encodes")),
        });
        TestClient::new(self.config(), storage)
    }

    /// Register an account whose login always issues `token`.
    pub fn add_user(&self, username: &str, password: &str, token: &str) -> User {
        let mut state = self.lock();
        let user = new_user(UserId::new(state.next_id()), username);
        state.accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
            token: token.to_string(),
        });
        user
    }

    /// Insert a public repository owned by `owner`.
    pub fn add_repository(&self, name: &str, owner: &User) -> Repository {
        let mut state = self.lock();
        let repo = new_repository(RepositoryId::new(state.next_id()), name, owner);
        state.repositories.push(repo.clone());
        state.record_activity(owner.id, repo.id, "create_repo");
        repo
    }

    /// Make every issued token invalid, as if the server restarted.
    pub fn revoke_tokens(&self) {
        let mut state = self.lock();
        let tokens: Vec<String> = state.accounts.iter().map(|a| a.token.clone()).collect();
        state.revoked.extend(tokens);
    }

    /// Hold every collaborator add and remove for `delay` before answering.
    pub fn delay_collaborator_writes(&self, delay: Duration) {
        self.lock().collaborator_delay = delay;
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Repositories currently held by the server.
    #[must_use]
    pub fn repositories(&self) -> Vec<Repository> {
        self.lock().repositories.clone()
    }

    async fn collaborator_delay(&self) {
        let delay = self.lock().collaborator_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, ApiState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<User, ApiError> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::unauthorized())?;

        let state = self.lock();
        if state.revoked.iter().any(|t| t == token) {
            return Err(ApiError::unauthorized());
        }
        state
            .accounts
            .iter()
            .find(|a| a.token == token)
            .map(|a| a.user.clone())
            .ok_or(ApiError::unauthorized())
    }

    fn router(&self) -> Router {
        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/auth/me", get(me))
            .route("/repos", get(list_repositories).post(create_repository))
            .route(
                "/repos/{id}",
                get(show_repository)
                    .put(update_repository)
                    .delete(delete_repository),
            )
            .route(
                "/repos/{id}/collaborators",
                get(list_collaborators).post(add_collaborator),
            )
            .route(
                "/repos/{id}/collaborators/{user_id}",
                axum::routing::delete(remove_collaborator),
            )
            .route("/activities", get(list_activities))
            .route("/activities/repo/{id}", get(list_repository_activities))
            .route("/slow", get(slow))
            .route("/plain-error", get(plain_error));

        Router::new()
            .nest("/api/v1", api)
            .layer(middleware::from_fn_with_state(self.clone(), record))
            .with_state(self.clone())
    }
}

/// A client wired to a [`FakeApi`], with its storage and navigator exposed
/// for inspection.
#[derive(Debug, Clone)]
pub struct TestClient {
    pub ctx: AppContext,
    pub storage: Arc<MemoryStorage>,
    pub navigator: Arc<RecordingNavigator>,
}

impl TestClient {
    /// Build a client over explicit configuration and storage.
    #[must_use]
    pub fn new(config: ClientConfig, storage: MemoryStorage) -> Self {
        let storage = Arc::new(storage);
        let navigator = Arc::new(RecordingNavigator::default());
        let ctx = AppContext::new(config, storage.clone(), navigator.clone())
            .expect("client builds");
        Self {
            ctx,
            storage,
            navigator,
        }
    }
}

/// Navigator that remembers every target it was sent to.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn visits(&self) -> Vec<String> {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: &str) {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target.to_string());
    }
}

// ============================================================================
// Handlers
// ============================================================================

struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    const fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }

    const fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    const fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn record(State(api): State<FakeApi>, request: Request, next: Next) -> Response {
    let path = request.uri().path();
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: path.strip_prefix("/api/v1").unwrap_or(path).to_string(),
        authorization: request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    api.lock().requests.push(recorded);
    next.run(request).await
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct Registration {
    username: String,
    password: String,
    email: String,
}

async fn login(State(api): State<FakeApi>, Json(body): Json<Credentials>) -> ApiResult<Json<Value>> {
    let mut state = api.lock();
    let account = state
        .accounts
        .iter()
        .find(|a| a.user.username == body.username && a.password == body.password)
        .cloned()
        .ok_or(ApiError::new(StatusCode::UNAUTHORIZED, "invalid credentials"))?;
    state.revoked.retain(|t| *t != account.token);
    drop(state);

    Ok(Json(json!({ "token": account.token, "user": account.user })))
}

async fn register(
    State(api): State<FakeApi>,
    Json(body): Json<Registration>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if body.username.is_empty() || body.password.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "username and password are required",
        ));
    }

    let mut state = api.lock();
    if state.accounts.iter().any(|a| a.user.username == body.username) {
        return Err(ApiError::new(StatusCode::CONFLICT, "username already taken"));
    }

    let id = UserId::new(state.next_id());
    let mut user = new_user(id, &body.username);
    user.email = body.email;
    state.accounts.push(Account {
        user: user.clone(),
        password: body.password,
        token: format!("token-{id}"),
    });
    drop(state);

    Ok((StatusCode::CREATED, Json(user)))
}

async fn me(State(api): State<FakeApi>, headers: HeaderMap) -> ApiResult<Json<User>> {
    api.authorize(&headers).map(Json)
}

async fn list_repositories(
    State(api): State<FakeApi>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Repository>>> {
    api.authorize(&headers)?;
    Ok(Json(api.lock().repositories.clone()))
}

async fn show_repository(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Repository>> {
    api.authorize(&headers)?;
    api.lock()
        .repositories
        .iter()
        .find(|r| r.id == RepositoryId::new(id))
        .cloned()
        .map(Json)
        .ok_or(ApiError::not_found("repository not found"))
}

async fn create_repository(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<CreateRepository>,
) -> ApiResult<(StatusCode, Json<Repository>)> {
    let owner = api.authorize(&headers)?;
    if body.name.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "repository name is required",
        ));
    }

    let mut state = api.lock();
    if state.repositories.iter().any(|r| r.name == body.name) {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "repository already exists",
        ));
    }

    let mut repo = new_repository(RepositoryId::new(state.next_id()), &body.name, &owner);
    repo.description = body.description;
    repo.is_private = body.is_private;
    state.repositories.push(repo.clone());
    state.record_activity(owner.id, repo.id, "create_repo");
    drop(state);

    Ok((StatusCode::CREATED, Json(repo)))
}

async fn update_repository(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateRepository>,
) -> ApiResult<Json<Repository>> {
    api.authorize(&headers)?;
    let mut state = api.lock();
    let repo = state
        .repositories
        .iter_mut()
        .find(|r| r.id == RepositoryId::new(id))
        .ok_or(ApiError::not_found("repository not found"))?;

    if let Some(name) = body.name {
        repo.name = name;
    }
    if let Some(description) = body.description {
        repo.description = description;
    }
    if let Some(is_private) = body.is_private {
        repo.is_private = is_private;
    }
    if let Some(default_branch) = body.default_branch {
        repo.default_branch = default_branch;
    }

    Ok(Json(repo.clone()))
}

async fn delete_repository(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    api.authorize(&headers)?;
    let id = RepositoryId::new(id);
    let mut state = api.lock();
    let before = state.repositories.len();
    state.repositories.retain(|r| r.id != id);
    if state.repositories.len() == before {
        return Err(ApiError::not_found("repository not found"));
    }
    state.collaborators.retain(|c| c.repository_id != Some(id));
    drop(state);

    Ok(Json(json!({ "message": "repository deleted" })))
}

async fn list_collaborators(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Collaborator>>> {
    api.authorize(&headers)?;
    let id = RepositoryId::new(id);
    let state = api.lock();
    if !state.repositories.iter().any(|r| r.id == id) {
        return Err(ApiError::not_found("repository not found"));
    }
    Ok(Json(
        state
            .collaborators
            .iter()
            .filter(|c| c.repository_id == Some(id))
            .cloned()
            .collect(),
    ))
}

async fn add_collaborator(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<AddCollaborator>,
) -> ApiResult<(StatusCode, Json<Collaborator>)> {
    api.authorize(&headers)?;
    api.collaborator_delay().await;
    let repository_id = RepositoryId::new(id);
    let mut state = api.lock();
    if !state.repositories.iter().any(|r| r.id == repository_id) {
        return Err(ApiError::not_found("repository not found"));
    }
    let user = state
        .accounts
        .iter()
        .find(|a| a.user.username == body.username)
        .map(|a| a.user.clone())
        .ok_or(ApiError::not_found("user not found"))?;

    let collaborator = Collaborator {
        id: Some(CollaborationId::new(state.next_id())),
        repository_id: Some(repository_id),
        user_id: user.id,
        username: Some(user.username),
        permission: body.permission,
        created_at: None,
    };
    state.collaborators.push(collaborator.clone());
    drop(state);

    Ok((StatusCode::CREATED, Json(collaborator)))
}

async fn remove_collaborator(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path((id, user_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    api.authorize(&headers)?;
    api.collaborator_delay().await;
    let repository_id = Some(RepositoryId::new(id));
    let user_id = UserId::new(user_id);
    let mut state = api.lock();
    let before = state.collaborators.len();
    state
        .collaborators
        .retain(|c| !(c.repository_id == repository_id && c.user_id == user_id));
    if state.collaborators.len() == before {
        return Err(ApiError::not_found("collaborator not found"));
    }
    drop(state);

    Ok(Json(json!({ "message": "collaborator removed" })))
}

async fn list_activities(
    State(api): State<FakeApi>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Activity>>> {
    api.authorize(&headers)?;
    // Newest first
    Ok(Json(api.lock().activities.iter().rev().cloned().collect()))
}

async fn list_repository_activities(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Activity>>> {
    api.authorize(&headers)?;
    let id = Some(RepositoryId::new(id));
    Ok(Json(
        api.lock()
            .activities
            .iter()
            .rev()
            .filter(|a| a.repository_id == id)
            .cloned()
            .collect(),
    ))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(SLOW_RESPONSE).await;
    Json(json!({}))
}

async fn plain_error() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "Bad Gateway")
}

fn new_user(id: UserId, username: &str) -> User {
    User {
        id,
        username: username.to_string(),
        email: String::new(),
        full_name: String::new(),
        is_admin: false,
        is_active: Some(true),
        created_at: None,
        updated_at: None,
    }
}

fn new_repository(id: RepositoryId, name: &str, owner: &User) -> Repository {
    Repository {
        id,
        name: name.to_string(),
        description: String::new(),
        owner_id: Some(owner.id),
        owner_name: owner.username.clone(),
        is_private: false,
        default_branch: "main".to_string(),
        size: 0,
        stars: 0,
        forks: 0,
        created_at: None,
        updated_at: None,
    }
}

/// Seeded data for a test: alice (token `abc123`) owning one repository.
#[derive(Debug)]
pub struct Fixture {
    pub api: FakeApi,
    pub alice: User,
    pub repo: Repository,
}

impl Fixture {
    pub async fn new() -> Self {
        let api = FakeApi::start().await;
        let alice = api.add_user("alice", "secret", "abc123");
        let repo = api.add_repository("hello-world", &alice);
        Self { api, alice, repo }
    }
}

/// Count recorded requests per path.
#[must_use]
pub fn requests_by_path(requests: &[RecordedRequest]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for request in requests {
        *counts.entry(request.path.clone()).or_insert(0) += 1;
    }
    counts
}
