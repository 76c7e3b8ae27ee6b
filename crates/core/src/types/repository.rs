//! Repository records and the payloads that create or modify them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{RepositoryId, UserId};
use super::resource::Resource;

/// A hosted git repository.
///
/// Only `id` and `name` are required on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Server-assigned identifier.
    pub id: RepositoryId,
    /// Repository name (unique per owner).
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Owning user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    /// Owner's username, joined in by the server.
    #[serde(default)]
    pub owner_name: String,
    /// Private repositories are visible to the owner and collaborators only.
    #[serde(default)]
    pub is_private: bool,
    /// Branch checked out by default.
    #[serde(default)]
    pub default_branch: String,
    /// Size on disk in bytes.
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub stars: i32,
    #[serde(default)]
    pub forks: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resource for Repository {
    type Id = RepositoryId;

    fn id(&self) -> RepositoryId {
        self.id
    }
}

/// Request body for `POST /repos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRepository {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_private: bool,
}

impl CreateRepository {
    /// A public repository with no description.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            is_private: false,
        }
    }
}

/// Request body for `PUT /repos/{id}`.
///
/// Unset fields are omitted from the JSON body and left unchanged by the
/// server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRepository {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
}

impl UpdateRepository {
    /// Returns true if the update would not change anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.is_private.is_none()
            && self.default_branch.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_minimal_repository() {
        let repo: Repository = serde_json::from_str(r#"{"id":7,"name":"x"}"#).unwrap();
        assert_eq!(repo.id(), RepositoryId::new(7));
        assert_eq!(repo.name, "x");
        assert!(!repo.is_private);
        assert!(repo.owner_id.is_none());
    }

    #[test]
    fn test_decode_server_repository() {
        let repo: Repository = serde_json::from_str(
            r#"{
                "id": 12,
                "name": "git-core",
                "description": "object store",
                "owner_id": 1,
                "owner_name": "alice",
                "is_private": true,
                "default_branch": "main",
                "size": 2048,
                "stars": 3,
                "forks": 1,
                "created_at": "2024-05-01T10:00:00Z",
                "updated_at": "2024-05-02T10:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(repo.owner_id, Some(UserId::new(1)));
        assert_eq!(repo.default_branch, "main");
        assert!(repo.is_private);
    }

    #[test]
    fn test_update_omits_unset_fields() {
        let update = UpdateRepository {
            name: Some("y".to_string()),
            ..UpdateRepository::default()
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"name":"y"}"#);
        assert!(!update.is_empty());
        assert!(UpdateRepository::default().is_empty());
    }

    #[test]
    fn test_create_named() {
        let create = CreateRepository::named("demo");
        assert_eq!(
            serde_json::to_value(&create).unwrap(),
            serde_json::json!({"name": "demo", "description": "", "is_private": false})
        );
    }
}
