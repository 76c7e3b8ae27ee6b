//! gitserver Client - the data layer behind gitserver front ends.
//!
//! # Architecture
//!
//! Three collaborating components, leaves first:
//!
//! - [`gateway`] - the single chokepoint for network calls: base address,
//!   timeout, JSON, bearer credential injection, payload unwrapping, and
//!   forced logout on a 401
//! - [`session`] - the Credential and Identity, persisted through a
//!   [`session::SessionStorage`] adapter, plus login/registration/logout
//! - [`stores`] - cached collections with loading/error tracking for
//!   repositories, collaborators, and activities
//!
//! Control flow: store -> gateway -> (credential from) session -> API. On a
//! 401, gateway -> session logout -> [`navigation::Navigator`].
//!
//! [`AppContext`] builds one of each and hands them out by reference.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use gitserver_client::{AppContext, ClientConfig};
//! use gitserver_client::navigation::TracingNavigator;
//! use gitserver_client::session::FileStorage;
//! use secrecy::SecretString;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let storage = Arc::new(FileStorage::new(&config.session_file));
//! let ctx = AppContext::new(config, storage, Arc::new(TracingNavigator))?;
//!
//! ctx.session()
//!     .login("alice", &SecretString::from("secret"))
//!     .await?;
//! let repos = ctx.repositories().fetch_repositories().await?;
//! # let _ = repos;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod context;
pub mod gateway;
pub mod navigation;
pub mod session;
pub mod stores;

pub use config::{ClientConfig, ConfigError};
pub use context::AppContext;
pub use gateway::{ErrorPayload, Gateway, GatewayError};
pub use session::{Session, SessionManager, SessionState};
pub use stores::{ActivityStore, CollaboratorStore, RepositoryStore, ResourceState, ResourceStore};
