//! Repository commands.
//!
//! # Usage
//!
//! ```bash
//! gitserver repos list
//! gitserver repos show 7
//! gitserver repos create my-repo -d "Scratch space" --private
//! gitserver repos update 7 --default-branch main
//! gitserver repos delete 7
//! ```

use gitserver_client::AppContext;
use gitserver_core::{CreateRepository, RepositoryId, UpdateRepository};
use tracing::{info, warn};

use super::{CliError, emit};

pub async fn list(ctx: &AppContext) -> Result<(), CliError> {
    let repos = ctx.repositories().fetch_repositories().await?;
    info!("{} repositories", repos.len());
    emit(&repos)
}

pub async fn show(ctx: &AppContext, id: RepositoryId) -> Result<(), CliError> {
    let repo = ctx.repositories().fetch_repository(id).await?;
    emit(&repo)
}

pub async fn create(
    ctx: &AppContext,
    name: String,
    description: String,
    is_private: bool,
) -> Result<(), CliError> {
    let payload = CreateRepository {
        name,
        description,
        is_private,
    };
    let repo = ctx.repositories().create_repository(&payload).await?;
    info!("Created repository {} (id {})", repo.name, repo.id);
    emit(&repo)
}

pub async fn update(
    ctx: &AppContext,
    id: RepositoryId,
    payload: &UpdateRepository,
) -> Result<(), CliError> {
    if payload.is_empty() {
        warn!("No fields to update, sending an empty update");
    }
    let repo = ctx.repositories().update_repository(id, payload).await?;
    emit(&repo)
}

pub async fn delete(ctx: &AppContext, id: RepositoryId) -> Result<(), CliError> {
    ctx.repositories().delete_repository(id).await?;
    info!("Deleted repository {id}");
    Ok(())
}
