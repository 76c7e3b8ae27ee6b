//! Core types for gitserver.
//!
//! This module provides type-safe wrappers for the API's domain records.

pub mod activity;
pub mod auth;
pub mod collaborator;
pub mod id;
pub mod repository;
pub mod resource;
pub mod user;

pub use activity::Activity;
pub use auth::{LoginRequest, LoginResponse, RegisterRequest};
pub use collaborator::{AddCollaborator, Collaborator, ParsePermissionError, Permission};
pub use id::*;
pub use repository::{CreateRepository, Repository, UpdateRepository};
pub use resource::Resource;
pub use user::User;
