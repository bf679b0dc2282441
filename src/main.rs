//! go-fault-executor sidecar: Unix socket listener.
//!
//! Accepts JSON requests over a Unix domain socket, dispatches fault
//! experiments to the in-process Go agent over HTTP, and returns JSON
//! responses. Also serves the advertised action catalog.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;
use tokio::net::UnixListener;
use tracing_subscriber::EnvFilter;

use go_fault_executor::catalog::{experiment_models, MatcherTable};
use go_fault_executor::config::ExecutorConfig;
use go_fault_executor::dispatcher::Dispatcher;
use go_fault_executor::registry::ActionRegistry;
use go_fault_executor::server::{self, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let socket_path = std::env::var("GO_FAULT_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp/go-fault-executor.sock"));

    let config = ExecutorConfig::from_env();

    // Catalog inputs are loaded once and never mutated afterwards.
    let registry = ActionRegistry::load(&config.action_dir).unwrap_or_else(|e| {
        tracing::warn!("failed to load action registry: {e:#}");
        ActionRegistry::new()
    });
    let matchers = MatcherTable::load(&config.matcher_file).unwrap_or_else(|e| {
        tracing::warn!("failed to load matcher table: {e:#}");
        MatcherTable::default()
    });
    tracing::info!(
        "{} action(s), {} matcher flag(s) registered",
        registry.len(),
        matchers.len()
    );

    let state = Arc::new(ServerState {
        dispatcher: Dispatcher::new(&config),
        catalog: experiment_models(registry.actions(), &matchers, &config),
    });

    // Remove stale socket file if it exists
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)
            .with_context(|| format!("failed to remove stale socket {}", socket_path.display()))?;
    }

    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("failed to bind {}", socket_path.display()))?;
    tracing::info!("listening on {}", socket_path.display());

    let socket_path_cleanup = socket_path.clone();
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            tracing::info!("shutting down");
            let _ = std::fs::remove_file(&socket_path_cleanup);
            std::process::exit(0);
        }
    });

    loop {
        let (stream, _addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            let (reader, writer) = stream.into_split();
            if let Err(e) = server::handle_connection(BufReader::new(reader), writer, state).await {
                tracing::warn!("connection error: {e}");
            }
        });
    }
}
