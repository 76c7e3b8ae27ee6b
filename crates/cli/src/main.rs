//! gitserver CLI - Command-line client for the gitserver API.
//!
//! # Usage
//!
//! ```bash
//! # Log in (the session is saved to GITSERVER_SESSION_FILE)
//! gitserver login -u alice -p secret
//!
//! # List and inspect repositories
//! gitserver repos list
//! gitserver repos show 7
//!
//! # Grant access
//! gitserver collaborators add 7 -u bob -P write
//!
//! # Activity feed, globally or for one repository
//! gitserver activity --repo 7
//! ```
//!
//! # Commands
//!
//! - `login` / `register` / `logout` / `whoami` - Session management
//! - `repos` - Repository CRUD
//! - `collaborators` - Collaborator management
//! - `activity` - Activity feeds
//!
//! # Environment Variables
//!
//! - `GITSERVER_LOG_FORMAT` - Set to `json` for JSON log lines on stderr
//! - `RUST_LOG` - Log filter (default: `gitserver=info,gitserver_client=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use gitserver_client::navigation::TracingNavigator;
use gitserver_client::session::FileStorage;
use gitserver_client::{AppContext, ClientConfig};
use gitserver_core::{Permission, RepositoryId, UserId};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "gitserver")]
#[command(author, version, about = "gitserver API client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and save the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account (does not log in)
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long)]
        email: String,
    },
    /// Forget the saved session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Manage repositories
    Repos {
        #[command(subcommand)]
        action: RepoAction,
    },
    /// Manage repository collaborators
    Collaborators {
        #[command(subcommand)]
        action: CollaboratorAction,
    },
    /// Show the activity feed
    Activity {
        /// Only show activity for this repository
        #[arg(short, long)]
        repo: Option<RepositoryId>,
    },
}

#[derive(Subcommand)]
enum RepoAction {
    /// List repositories
    List,
    /// Show one repository
    Show { id: RepositoryId },
    /// Create a repository
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long)]
        private: bool,
    },
    /// Update a repository
    Update {
        id: RepositoryId,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Set visibility (`true` for private)
        #[arg(long)]
        private: Option<bool>,
        #[arg(long)]
        default_branch: Option<String>,
    },
    /// Delete a repository
    Delete { id: RepositoryId },
}

#[derive(Subcommand)]
enum CollaboratorAction {
    /// List a repository's collaborators
    List { repo: RepositoryId },
    /// Grant a user access to a repository
    Add {
        repo: RepositoryId,
        #[arg(short, long)]
        username: String,
        /// Access level (`read`, `write`, `admin`)
        #[arg(short = 'P', long, default_value = "read")]
        permission: Permission,
    },
    /// Revoke a user's access to a repository
    Remove { repo: RepositoryId, user: UserId },
}

#[tokio::main]
async fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gitserver=info,gitserver_client=info".into());

    // JSON format when GITSERVER_LOG_FORMAT=json, text otherwise. Logs go to
    // stderr; stdout carries command output only.
    let is_json = std::env::var("GITSERVER_LOG_FORMAT").is_ok_and(|v| v == "json");
    let json_layer = is_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!is_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ClientConfig::from_env()?;
    let storage = Arc::new(FileStorage::new(&config.session_file));
    let ctx = AppContext::new(config, storage, Arc::new(TracingNavigator))?;

    match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&ctx, &username, password).await?;
        }
        Commands::Register {
            username,
            password,
            email,
        } => commands::auth::register(&ctx, &username, password, &email).await?,
        Commands::Logout => commands::auth::logout(&ctx),
        Commands::Whoami => commands::auth::whoami(&ctx).await?,
        Commands::Repos { action } => match action {
            RepoAction::List => commands::repos::list(&ctx).await?,
            RepoAction::Show { id } => commands::repos::show(&ctx, id).await?,
            RepoAction::Create {
                name,
                description,
                private,
            } => commands::repos::create(&ctx, name, description, private).await?,
            RepoAction::Update {
                id,
                name,
                description,
                private,
                default_branch,
            } => {
                let update = gitserver_core::UpdateRepository {
                    name,
                    description,
                    is_private: private,
                    default_branch,
                };
                commands::repos::update(&ctx, id, &update).await?;
            }
            RepoAction::Delete { id } => commands::repos::delete(&ctx, id).await?,
        },
        Commands::Collaborators { action } => match action {
            CollaboratorAction::List { repo } => commands::collaborators::list(&ctx, repo).await?,
            CollaboratorAction::Add {
                repo,
                username,
                permission,
            } => commands::collaborators::add(&ctx, repo, username, permission).await?,
            CollaboratorAction::Remove { repo, user } => {
                commands::collaborators::remove(&ctx, repo, user).await?;
            }
        },
        Commands::Activity { repo } => commands::activity::show(&ctx, repo).await?,
    }
    Ok(())
}
