//! Repository collaborators and their access levels.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CollaborationId, RepositoryId, UserId};
use super::resource::Resource;

/// Access level granted to a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Clone and fetch.
    #[default]
    Read,
    /// Read plus push.
    Write,
    /// Write plus collaborator management.
    Admin,
}

impl Permission {
    /// Returns the wire name of this permission.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`Permission`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid permission: {0} (expected read, write, or admin)")]
pub struct ParsePermissionError(String);

impl FromStr for Permission {
    type Err = ParsePermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "admin" => Ok(Self::Admin),
            _ => Err(ParsePermissionError(s.to_owned())),
        }
    }
}

/// A user's access grant on a repository.
///
/// Collaborators are identified by the collaborating user's ID; a user holds
/// at most one grant per repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    /// Collaboration row ID, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CollaborationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<RepositoryId>,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub permission: Permission,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Resource for Collaborator {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.user_id
    }
}

/// Request body for `POST /repos/{id}/collaborators`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCollaborator {
    pub username: String,
    pub permission: Permission,
}
