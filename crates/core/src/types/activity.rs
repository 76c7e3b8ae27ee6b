//! Activity feed entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ActivityId, RepositoryId, UserId};
use super::resource::Resource;

/// Something a user did to a repository (create, push, fork, star, ...).
///
/// Activities are append-only on the server and read-only for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<RepositoryId>,
    /// Action name. Open set, so kept as a string.
    #[serde(default)]
    pub action: String,
    /// Ref affected by a push, if any.
    #[serde(default)]
    pub ref_name: String,
    /// JSON-encoded details, passed through untouched.
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Resource for Activity {
    type Id = ActivityId;

    fn id(&self) -> ActivityId {
        self.id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_push_activity() {
        let activity: Activity = serde_json::from_str(
            r#"{
                "id": 100,
                "user_id": 1,
                "repository_id": 7,
                "action": "push",
                "ref_name": "refs/heads/main",
                "content": "{\"commits\":2}",
                "created_at": "2024-05-01T10:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(activity.id(), ActivityId::new(100));
        assert_eq!(activity.repository_id, Some(RepositoryId::new(7)));
        assert_eq!(activity.ref_name, "refs/heads/main");
    }
}
