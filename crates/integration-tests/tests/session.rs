//! Session lifecycle against the fake API: login, registration, restore,
//! identity refresh, and logout.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use gitserver_client::GatewayError;
use gitserver_core::{User, UserId};
use gitserver_integration_tests::Fixture;
use secrecy::{ExposeSecret, SecretString};

fn password(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

#[tokio::test]
async fn test_login_persists_credential_and_identity() {
    let fx = Fixture::new().await;
    let client = fx.api.client();

    let response = client
        .ctx
        .session()
        .login("alice", &password("secret"))
        .await
        .unwrap();

    assert_eq!(response.token, "abc123");
    assert_eq!(response.user.id, UserId::new(1));
    assert_eq!(response.user.username, "alice");

    let session = client.ctx.session();
    assert!(session.is_authenticated());
    assert_eq!(session.credential().unwrap().expose_secret(), "abc123");
    assert_eq!(session.identity().unwrap().username, "alice");

    assert_eq!(client.storage.get("token").as_deref(), Some("abc123"));
    let stored: User = serde_json::from_str(&client.storage.get("user").unwrap()).unwrap();
    assert_eq!(stored, fx.alice);
}

#[tokio::test]
async fn test_login_sends_credentials_without_bearer() {
    let fx = Fixture::new().await;
    let client = fx.api.client();

    client
        .ctx
        .session()
        .login("alice", &password("secret"))
        .await
        .unwrap();

    let requests = fx.api.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/auth/login");
    assert_eq!(requests[0].authorization, None);
}

#[tokio::test]
async fn test_failed_login_leaves_session_anonymous() {
    let fx = Fixture::new().await;
    let client = fx.api.client();

    let err = client
        .ctx
        .session()
        .login("alice", &password("wrong"))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.payload().unwrap().message(), Some("invalid credentials"));
    assert!(!client.ctx.session().is_authenticated());
    assert_eq!(client.storage.get("token"), None);
    assert_eq!(client.storage.get("user"), None);
}

#[tokio::test]
async fn test_login_with_empty_token_is_rejected() {
    let fx = Fixture::new().await;
    fx.api.add_user("carol", "pw", "");
    let client = fx.api.client();

    let err = client
        .ctx
        .session()
        .login("carol", &password("pw"))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Decode(_)));
    assert!(!client.ctx.session().is_authenticated());
    assert!(client.ctx.session().identity().is_none());
    assert_eq!(client.storage.get("token"), None);
    assert_eq!(client.storage.get("user"), None);
}

#[tokio::test]
async fn test_login_with_empty_token_keeps_prior_session() {
    let fx = Fixture::new().await;
    fx.api.add_user("carol", "pw", "");
    let client = fx.api.client_with_session("abc123", Some(&fx.alice));

    client
        .ctx
        .session()
        .login("carol", &password("pw"))
        .await
        .unwrap_err();

    assert_eq!(
        client.ctx.session().credential().unwrap().expose_secret(),
        "abc123"
    );
    assert_eq!(client.ctx.session().identity().unwrap(), fx.alice);
    assert_eq!(client.storage.get("token").as_deref(), Some("abc123"));
}

#[tokio::test]
async fn test_register_does_not_log_in() {
    let fx = Fixture::new().await;
    let client = fx.api.client();

    let user = client
        .ctx
        .session()
        .register("bob", &password("hunter2"), "bob@example.com")
        .await
        .unwrap();

    assert_eq!(user.username, "bob");
    assert_eq!(user.email, "bob@example.com");
    assert!(!client.ctx.session().is_authenticated());
    assert!(client.ctx.session().identity().is_none());
    assert_eq!(client.storage.get("token"), None);

    // The new account can log in afterwards
    client
        .ctx
        .session()
        .login("bob", &password("hunter2"))
        .await
        .unwrap();
    assert_eq!(client.ctx.session().identity().unwrap().id, user.id);
}

#[tokio::test]
async fn test_register_conflict_surfaces_server_message() {
    let fx = Fixture::new().await;
    let client = fx.api.client();

    let err = client
        .ctx
        .session()
        .register("alice", &password("other"), "alice@example.com")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(409));
    assert_eq!(err.payload().unwrap().message(), Some("username already taken"));
    assert!(client.navigator.visits().is_empty());
}

#[tokio::test]
async fn test_restored_session_is_used_immediately() {
    let fx = Fixture::new().await;
    let client = fx.api.client_with_session("abc123", Some(&fx.alice));

    assert!(client.ctx.session().is_authenticated());
    assert_eq!(client.ctx.session().identity().unwrap(), fx.alice);

    let repos = client.ctx.repositories().fetch_repositories().await.unwrap();
    assert_eq!(repos, vec![fx.repo.clone()]);
}

#[tokio::test]
async fn test_current_user_fills_missing_identity() {
    let fx = Fixture::new().await;
    let client = fx.api.client_with_session("abc123", None);
    assert!(client.ctx.session().identity().is_none());

    let mut changes = client.ctx.session().subscribe();
    let user = client.ctx.session().current_user().await.unwrap();

    assert_eq!(user, fx.alice);
    assert_eq!(client.ctx.session().identity().unwrap(), fx.alice);
    assert!(changes.has_changed().unwrap());

    let stored: User = serde_json::from_str(&client.storage.get("user").unwrap()).unwrap();
    assert_eq!(stored.username, "alice");
}

#[tokio::test]
async fn test_logout_clears_memory_and_storage() {
    let fx = Fixture::new().await;
    let client = fx.api.client();
    client
        .ctx
        .session()
        .login("alice", &password("secret"))
        .await
        .unwrap();

    client.ctx.session().logout();
    client.ctx.session().logout();

    assert!(!client.ctx.session().is_authenticated());
    assert!(client.ctx.session().credential().is_none());
    assert_eq!(client.storage.get("token"), None);
    assert_eq!(client.storage.get("user"), None);
    assert!(client.navigator.visits().is_empty());
}
