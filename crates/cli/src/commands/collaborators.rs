//! Collaborator commands.
//!
//! # Usage
//!
//! ```bash
//! gitserver collaborators list 7
//! gitserver collaborators add 7 -u bob -P write
//! gitserver collaborators remove 7 2
//! ```

use gitserver_client::AppContext;
use gitserver_core::{AddCollaborator, Permission, RepositoryId, UserId};
use tracing::info;

use super::{CliError, emit};

pub async fn list(ctx: &AppContext, repo: RepositoryId) -> Result<(), CliError> {
    let collaborators = ctx.collaborators().fetch_collaborators(repo).await?;
    emit(&collaborators)
}

pub async fn add(
    ctx: &AppContext,
    repo: RepositoryId,
    username: String,
    permission: Permission,
) -> Result<(), CliError> {
    let payload = AddCollaborator {
        username,
        permission,
    };
    let collaborator = ctx.collaborators().add_collaborator(repo, &payload).await?;
    info!("Granted {permission} access on repository {repo}");
    emit(&collaborator)
}

pub async fn remove(ctx: &AppContext, repo: RepositoryId, user: UserId) -> Result<(), CliError> {
    ctx.collaborators().remove_collaborator(repo, user).await?;
    info!("Removed user {user} from repository {repo}");
    Ok(())
}
