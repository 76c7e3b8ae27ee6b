//! Login, registration, and logout against the API.

use gitserver_core::{LoginRequest, LoginResponse, RegisterRequest, User};
use secrecy::{ExposeSecret, SecretString};
use serde::de::Error as _;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use super::{Session, SessionState};
use crate::gateway::{Gateway, GatewayError};

/// Owns the authentication lifecycle.
///
/// Reads are served from [`SessionState`]; remote operations go through the
/// [`Gateway`]. A failed operation never mutates the session.
#[derive(Debug, Clone)]
pub struct SessionManager {
    state: SessionState,
    gateway: Gateway,
}

impl SessionManager {
    /// Create a manager over `state`, issuing requests through `gateway`.
    ///
    /// `gateway` should be built with the same `state` so it attaches this
    /// session's credential.
    #[must_use]
    pub const fn new(state: SessionState, gateway: Gateway) -> Self {
        Self { state, gateway }
    }

    /// Shared state handle.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// True iff the current credential is non-empty.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// The current credential, or `None` when unauthenticated.
    #[must_use]
    pub fn credential(&self) -> Option<SecretString> {
        self.state.credential()
    }

    /// The current Identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<User> {
        self.state.identity()
    }

    /// Receive every subsequent change to the session.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Authenticate with username and password.
    ///
    /// On success the returned credential and identity replace the current
    /// session and are persisted.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure unchanged, or `GatewayError::Decode` if
    /// the response carries an empty token. Either way the prior session is
    /// left untouched.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginResponse, GatewayError> {
        let response: LoginResponse = self
            .gateway
            .post(
                "/auth/login",
                &LoginRequest {
                    username,
                    password: password.expose_secret(),
                },
            )
            .await?;

        if response.token.is_empty() {
            warn!(user_id = %response.user.id, "Login response carried no credential");
            return Err(GatewayError::from(serde_json::Error::custom(
                "login response carried an empty token",
            )));
        }

        self.state
            .establish(SecretString::from(response.token.clone()), response.user.clone());
        info!(user_id = %response.user.id, "Logged in");

        Ok(response)
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure unchanged.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn register(
        &self,
        username: &str,
        password: &SecretString,
        email: &str,
    ) -> Result<User, GatewayError> {
        let user: User = self
            .gateway
            .post(
                "/auth/register",
                &RegisterRequest {
                    username,
                    password: password.expose_secret(),
                    email,
                },
            )
            .await?;

        info!(user_id = %user.id, "Registered account");
        Ok(user)
    }

    /// Fetch the authenticated user's profile and store it as the Identity.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure unchanged. A 401 will already have logged
    /// the session out.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User, GatewayError> {
        let user: User = self.gateway.get("/auth/me").await?;
        self.state.set_identity(user.clone());
        Ok(user)
    }

    /// Clear the session in memory and in storage. Never fails.
    pub fn logout(&self) {
        self.state.logout();
        info!("Logged out");
    }
}
