//! certdesk
//!
//! Back end of the certificate-verification admin console.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use certdesk_core::config::{self, Config, StoreBackend};
use certdesk_core::tracing_init::{default_filter, init_tracing};
use certdesk_core::{stats, Repository};
use certdesk_server::{bootstrap, import, routes};

#[derive(Parser, Debug)]
#[command(name = "certdesk")]
#[command(version, about = "Certificate-verification admin console server")]
struct Cli {
    /// Settings file replacing the project `.certdesk/settings.json`.
    #[arg(long, global = true, env = "CERTDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Document store backend: memory, sqlite or firestore.
    #[arg(long, global = true)]
    store: Option<StoreBackend>,

    /// Path of the SQLite document database.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default).
    Serve {
        /// Address to listen on.
        #[arg(long)]
        addr: Option<SocketAddr>,

        /// Path of the admin account database.
        #[arg(long)]
        admin_db: Option<PathBuf>,
    },
    /// Load a JSON array of documents into a collection.
    Import {
        /// Target collection: profiles or certificates.
        collection: String,
        /// JSON file holding an array of objects.
        file: PathBuf,
    },
    /// Print the statistics report as JSON.
    Stats,
}

fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let cwd = std::env::current_dir().ok();
    let mut config = config::load_config(cwd.as_deref(), cli.config.as_deref())?;

    if let Some(backend) = cli.store {
        config.store.backend = backend;
    }
    if let Some(path) = &cli.db_path {
        config.store.database_path = Some(path.clone());
    }
    if cli.log_json {
        config.server.log_json = true;
    }
    if let Some(Command::Serve { addr, admin_db }) = &cli.command {
        if let Some(addr) = addr {
            config.server.addr = *addr;
        }
        if let Some(path) = admin_db {
            config.server.admin_db_path = Some(path.clone());
        }
    }
    Ok(config)
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let state = bootstrap::app_state(config).await?;
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.addr))?;
    info!(addr = %config.server.addr, "certdesk API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("certdesk stopped");
    Ok(())
}

async fn run_import(config: &Config, collection: &str, file: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let docs = import::parse_documents(&raw)?;
    let store = bootstrap::open_store(&config.store).await?;
    let written = import::import_documents(store.as_ref(), collection, docs).await?;
    info!(collection, written, file = %file.display(), "Import complete");
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn print_stats(config: &Config) -> anyhow::Result<()> {
    let repo = Repository::new(bootstrap::open_store(&config.store).await?);
    let (profiles, certificates) =
        tokio::try_join!(repo.list_profiles(), repo.list_certificates())?;
    let report = stats::report(&certificates, profiles.len());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    init_tracing(
        &default_filter(&config.server.log_level),
        config.server.log_json,
    );
    info!(
        version = env!("CARGO_PKG_VERSION"),
        store = ?config.store.backend,
        "Starting certdesk"
    );

    match cli.command.unwrap_or(Command::Serve {
        addr: None,
        admin_db: None,
    }) {
        Command::Serve { .. } => serve(&config).await,
        Command::Import { collection, file } => run_import(&config, &collection, &file).await,
        Command::Stats => print_stats(&config).await,
    }
}
