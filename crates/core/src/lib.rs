//! gitserver Core - Shared domain types.
//!
//! This crate provides the records exchanged with the gitserver API:
//! - users (the session Identity)
//! - repositories and their collaborators
//! - activity feed entries
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! The client crate layers the gateway, session manager, and resource stores
//! on top of it.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, API records, request payloads, and the
//!   [`Resource`] trait implemented by every cached record

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
