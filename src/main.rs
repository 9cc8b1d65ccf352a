//! Profile server control plane.
//!
//! # Startup
//!
//! ```text
//! CLI → load + validate config (exit 1 on failure)
//!     → logging, metrics recorder
//!     → collaborators (standalone: noop storage, in-memory users)
//!     → HttpServer::new → bind → serve until SIGINT/SIGTERM
//!     → drain, grace period, report
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use profile_server::config::{load_config, validate_config, ServerConfig};
use profile_server::lifecycle::signals::forward_signals;
use profile_server::observability::{init_logging, install_recorder};
use profile_server::services::{InMemoryUserStore, UserStore};
use profile_server::{Collaborators, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "profile-server")]
#[command(about = "HTTP control plane for the profiling server", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `observability.log_level`.
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match read_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("profile-server: {message}");
            return ExitCode::FAILURE;
        }
    };

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    init_logging(level);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

fn read_config(cli: &Cli) -> Result<ServerConfig, String> {
    match &cli.config {
        Some(path) => load_config(path).map_err(|e| format!("{}: {e}", path.display())),
        None => {
            let config = ServerConfig::default();
            validate_config(&config).map_err(|errors| {
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            })?;
            Ok(config)
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "profile-server starting");

    let metrics = install_recorder();

    let users = InMemoryUserStore::new();
    if let Some(admin) = &config.auth.internal.admin {
        match users
            .create(&admin.name, &admin.password, profile_server::auth::Role::Admin)
            .await
        {
            Ok(_) => tracing::info!(user = %admin.name, "Admin user created"),
            Err(e) => tracing::warn!(user = %admin.name, error = %e, "Admin user not created"),
        }
    }
    let collaborators = Collaborators::standalone(Arc::new(users));

    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config, collaborators, Some(metrics))?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move { forward_signals(&shutdown).await });

    let report = server.run(listener, shutdown_rx).await?;
    tracing::info!(
        elapsed_ms = report.elapsed.as_millis() as u64,
        forced = report.forced,
        "Shutdown complete"
    );
    Ok(())
}
