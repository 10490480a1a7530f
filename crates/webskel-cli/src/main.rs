//! webskel - a command-line front end for the web skeleton's auth API.
//!
//! Signs in and out against the remote service and keeps the session
//! between runs, the way the web frontend's navbar and login modal do.

mod commands;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use webskel_core::{ApiClient, ApiError, Config, SessionStore, StorageKind};

// ============================================================================
// Constants
// ============================================================================

/// File name prefix for daily log files written with `--log-dir`
const LOG_FILE_PREFIX: &str = "webskel.log";

#[derive(Parser)]
#[command(name = "webskel", version, about = "Sign in to the web skeleton API from the terminal")]
struct Cli {
    /// Base URL of the API, e.g. http://localhost:3000/api/v1
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Where to keep the session: file, keyring or memory
    #[arg(long, global = true)]
    storage: Option<StorageKind>,

    /// Write logs to daily files in this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: Option<String>,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and forget the stored token
    Logout,
    /// Ask the server who the stored token belongs to
    Whoami,
    /// Show the local session without contacting the server
    Status,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

/// Render an error for the terminal, including the server's detail message
fn describe(err: &anyhow::Error) -> String {
    let Some(api_err) = err.downcast_ref::<ApiError>() else {
        return format!("{:#}", err);
    };
    let mut out = if err.chain().count() > 1 {
        format!("{}: {}", err, api_err.message())
    } else {
        api_err.to_string()
    };
    if let Some(detail) = api_err.detail() {
        out.push_str(&format!(" ({})", detail));
    }
    out
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_deref());
    info!("webskel starting");

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", describe(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    let storage = cli.storage.unwrap_or(config.storage);
    let data_dir = config.data_dir().unwrap_or_else(|_| PathBuf::from("./data"));
    debug!(?storage, ?data_dir, "Opening session storage");
    let session = SessionStore::open(storage.open(data_dir)?)?;

    let base_url = cli.api_url.unwrap_or_else(|| config.base_url());
    debug!(%base_url, "API base URL");
    let api = ApiClient::with_request_timeout(base_url, session.clone(), config.request_timeout())?;

    match cli.command {
        Command::Login { email, password } => {
            commands::login(&api, &session, &mut config, email, password).await
        }
        Command::Register {
            email,
            full_name,
            password,
        } => commands::register(&api, &session, email, full_name, password).await,
        Command::Logout => commands::logout(&session),
        Command::Whoami => commands::whoami(&api, &session).await,
        Command::Status => {
            commands::status(&session, api.base_url(), storage);
            Ok(())
        }
    }
}
