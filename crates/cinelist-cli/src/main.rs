//! Cinelist - a command-line client for the movie catalogue.
//!
//! Browse movies, like and mark them as watched, and manage personal movie
//! lists. Credentials are kept in the OS keyring (or a token file) between
//! runs and refreshed transparently when the access token expires.

mod commands;
mod output;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cinelist_core::{
    ApiClient, ApiError, Config, CredentialStore, FileCredentialStore, KeyringCredentialStore,
    SessionEvent, TokenStoreKind,
};
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

/// Exit status when the stored session could not be renewed
const EXIT_SESSION_EXPIRED: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "cinelist", version, about = "Browse movies and manage your movie lists")]
struct Cli {
    /// Where tokens are kept between runs: keyring or file
    #[arg(long, global = true, value_name = "STORE")]
    token_store: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Create an account
    Register { username: String, email: String },
    /// End the session on the server and forget the stored tokens
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List movies, newest first
    Movies {
        #[arg(short, long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one movie
    Movie { id: i64 },
    /// Like a movie, or remove the like
    Like { id: i64 },
    /// Mark a movie as watched
    Viewed { id: i64 },
    /// List your movie lists
    Lists,
    /// Show a list and its movies
    List { id: i64 },
    /// Create a list
    ListCreate {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Delete a list
    ListDelete { id: i64 },
    /// Add a movie to a list
    ListAdd {
        list: i64,
        movie: i64,
        #[arg(short, long, default_value = "")]
        note: String,
    },
    /// Remove a movie from a list
    ListRemove { list: i64, movie: i64 },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // RUST_LOG controls the level (e.g. RUST_LOG=cinelist_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Open the token store chosen on the command line or in the config file.
fn open_store(kind: TokenStoreKind, config: &Config) -> Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match kind {
        TokenStoreKind::Keyring => Arc::new(KeyringCredentialStore::new()),
        TokenStoreKind::File => {
            let dir = config.cache_dir()?;
            let store = FileCredentialStore::new(dir);
            debug!(path = %store.path().display(), "Using file token store");
            Arc::new(store)
        }
    };
    Ok(store)
}

/// Why the session ended while the command ran, if it did.
///
/// The client emits `Expired` before the failing call returns, so the event is
/// already queued once the command has finished.
fn session_expiry(result: &Result<()>, events: &mut broadcast::Receiver<SessionEvent>) -> Option<String> {
    loop {
        match events.try_recv() {
            Ok(SessionEvent::Expired { reason }) => return Some(reason.to_string()),
            Ok(event) => debug!(?event, "Session event"),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    // A lagging receiver can lose the event; the error still carries the reason
    match result {
        Err(e) => match e.downcast_ref::<ApiError>() {
            Some(ApiError::Auth(reason)) if reason.ends_session() => Some(reason.to_string()),
            _ => None,
        },
        Ok(()) => None,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load()?;
    let kind = match cli.token_store.as_deref() {
        Some(value) => value.parse()?,
        None => config.token_store,
    };
    let store = open_store(kind, &config)?;
    let client = ApiClient::new(&config, store).context("Failed to create API client")?;
    info!(backend = %client.base_url(), "cinelist starting");

    let mut events = client.subscribe();
    let out = output::Output::new(cli.json);

    let result = commands::run(&client, &mut config, &out, cli.command).await;
    if let Some(reason) = session_expiry(&result, &mut events) {
        debug!(%reason, "Session ended");
        eprintln!("session expired, run `cinelist login`");
        return Ok(ExitCode::from(EXIT_SESSION_EXPIRED));
    }
    result?;
    Ok(ExitCode::SUCCESS)
}
