//! Session commands.
//!
//! # Usage
//!
//! ```bash
//! gitserver register -u alice -p secret -e alice@example.com
//! gitserver login -u alice -p secret
//! gitserver whoami
//! gitserver logout
//! ```
//!
//! # Environment Variables
//!
//! - `GITSERVER_SESSION_FILE` - Where the credential and identity are kept
//!   between invocations (default: `.gitserver/session.json`)

use gitserver_client::AppContext;
use secrecy::SecretString;
use tracing::info;

use super::{CliError, emit};

pub async fn login(ctx: &AppContext, username: &str, password: String) -> Result<(), CliError> {
    let password = SecretString::from(password);
    let response = ctx.session().login(username, &password).await?;
    info!("Logged in as {}", response.user.display_name());
    emit(&response.user)
}

pub async fn register(
    ctx: &AppContext,
    username: &str,
    password: String,
    email: &str,
) -> Result<(), CliError> {
    let password = SecretString::from(password);
    let user = ctx.session().register(username, &password, email).await?;
    info!("Account created, run `gitserver login` to sign in");
    emit(&user)
}

pub fn logout(ctx: &AppContext) {
    ctx.session().logout();
}

pub async fn whoami(ctx: &AppContext) -> Result<(), CliError> {
    if !ctx.session().is_authenticated() {
        return Err(CliError::NotLoggedIn);
    }
    let user = ctx.session().current_user().await?;
    info!("Logged in as {}", user.display_name());
    emit(&user)
}
