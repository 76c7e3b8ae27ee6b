//! HTTP transport for the gitserver API.

use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use super::{ErrorPayload, GatewayError};
use crate::config::ClientConfig;
use crate::navigation::{LOGIN_ROUTE, Navigator};
use crate::session::SessionState;

/// Sole network egress point for the client.
///
/// # Authentication
///
/// The bearer credential is read from the shared [`SessionState`] before
/// every request. A 401 response logs the session out and sends the
/// [`Navigator`] to [`LOGIN_ROUTE`] before the call fails.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    client: reqwest::Client,
    config: ClientConfig,
    session: SessionState,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.inner.config.base_url)
            .field("timeout", &self.inner.config.timeout)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Create a gateway for `config`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Client` if the HTTP client fails to build.
    pub fn new(
        config: ClientConfig,
        session: SessionState,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                client,
                config,
                session,
                navigator,
            }),
        })
    }

    /// The configuration this gateway was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The session whose credential this gateway attaches.
    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.inner.session
    }

    /// `GET path`, decoding the payload.
    ///
    /// # Errors
    ///
    /// See [`GatewayError`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        self.send::<(), T>(Method::GET, path, None).await
    }

    /// `POST path` with a JSON body, decoding the payload.
    ///
    /// # Errors
    ///
    /// See [`GatewayError`].
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, Some(body)).await
    }

    /// `PUT path` with a JSON body, decoding the payload.
    ///
    /// # Errors
    ///
    /// See [`GatewayError`].
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(Method::PUT, path, Some(body)).await
    }

    /// `DELETE path`. Any response body is discarded.
    ///
    /// # Errors
    ///
    /// See [`GatewayError`].
    pub async fn delete(&self, path: &str) -> Result<(), GatewayError> {
        self.send::<(), serde_json::Value>(Method::DELETE, path, None)
            .await
            .map(drop)
    }

    /// Issue one request and interpret its outcome.
    #[instrument(skip(self, body), fields(method = %method, path = %path))]
    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.inner.config.endpoint(path);
        let mut request = self.inner.client.request(method, &url);

        if let Some(credential) = self.inner.session.credential() {
            request = request.bearer_auth(credential.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, timeout = e.is_timeout(), "Request failed without a response");
            GatewayError::from(e)
        })?;

        let status = response.status();
        let bytes = response.bytes().await;

        if status.is_success() {
            let bytes = bytes?;
            debug!(status = %status, len = bytes.len(), "Request succeeded");
            return decode_payload(&bytes);
        }

        // The server answered; an unreadable body still counts as a response.
        let payload = bytes.map_or_else(
            |_| ErrorPayload::new(serde_json::Value::Null),
            |b| ErrorPayload::from_bytes(&b),
        );

        if status == StatusCode::UNAUTHORIZED {
            info!(error = %payload, "Credential rejected, forcing logout");
            self.inner.session.logout();
            self.inner.navigator.navigate(LOGIN_ROUTE);
            return Err(GatewayError::Unauthorized(payload));
        }

        warn!(status = %status, error = %payload, "Request rejected by server");
        Err(GatewayError::Api {
            status: status.as_u16(),
            payload,
        })
    }
}

/// Decode a success body. An empty body decodes as JSON `null`, so `()` and
/// `Option<_>` targets accept it.
fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, GatewayError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(serde_json::Value::Null)?);
    }
    Ok(serde_json::from_slice(bytes)?)
}
