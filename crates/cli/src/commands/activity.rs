//! Activity feed command.

use gitserver_client::AppContext;
use gitserver_core::RepositoryId;

use super::{CliError, emit};

pub async fn show(ctx: &AppContext, repo: Option<RepositoryId>) -> Result<(), CliError> {
    let activities = match repo {
        Some(id) => ctx.activities().fetch_repository_activities(id).await?,
        None => ctx.activities().fetch_activities().await?,
    };
    emit(&activities)
}
