//! # pairgate-daemon
//!
//! Gateway server binary — wires settings, store, engine, orchestrator, and
//! the HTTP server together, replays active sessions, and serves until
//! ctrl-c.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pairgate_engine::{ConnectionProvider, StubProvider};
use pairgate_logging::LogLevel;
use pairgate_server::{GatewayServer, ServerConfig};
use pairgate_sessions::{resume_active_sessions, Orchestrator};
use pairgate_settings::GatewaySettings;
use pairgate_store::{new_file, run_migrations, ConnectionConfig, SessionStore};

/// Pairgate gateway server.
#[derive(Parser, Debug)]
#[command(name = "pairgate-daemon", about = "Pairing gateway server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the `SQLite` database (overrides settings).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Root directory for per-number credential workspaces (overrides
    /// settings).
    #[arg(long)]
    sessions_dir: Option<PathBuf>,
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Merge CLI overrides into loaded settings.
fn apply_cli(settings: &mut GatewaySettings, args: &Cli) {
    if let Some(host) = &args.host {
        settings.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(db_path) = &args.db_path {
        settings.store.db_path = db_path.to_string_lossy().into_owned();
    }
    if let Some(dir) = &args.sessions_dir {
        settings.sessions.workspace_root = dir.to_string_lossy().into_owned();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut settings = pairgate_settings::load_settings().unwrap_or_default();
    apply_cli(&mut settings, &args);

    pairgate_logging::init_subscriber(
        LogLevel::from_str_lossy(&settings.logging.level).as_filter_str(),
    );

    // Durable store: path comes from settings/CLI/env only.
    let db_path = PathBuf::from(&settings.store.db_path);
    ensure_parent_dir(&db_path)?;
    let pool = new_file(&settings.store.db_path, &ConnectionConfig::default())
        .context("Failed to open database")?;
    {
        let conn = pool.get().context("Failed to get DB connection")?;
        let _ = run_migrations(&conn).context("Failed to run migrations")?;
    }
    let store = SessionStore::new(pool);

    // Protocol engine backend. Deployments wire a real provider here; the
    // stub keeps the control surface up and reports a clear error on use.
    let engine: Arc<dyn ConnectionProvider> = Arc::new(StubProvider);
    tracing::warn!("no engine backend configured — pairing operations will fail until one is wired");

    let workspace_root = PathBuf::from(&settings.sessions.workspace_root);
    std::fs::create_dir_all(&workspace_root).with_context(|| {
        format!(
            "Failed to create sessions directory: {}",
            workspace_root.display()
        )
    })?;
    let orchestrator = Arc::new(Orchestrator::new(store, engine, workspace_root));

    // Reconnect everything that was active before the restart.
    let report = resume_active_sessions(&orchestrator).await;
    tracing::info!(
        resumed = report.resumed,
        skipped = report.skipped,
        failed = report.failed,
        "startup recovery finished"
    );

    let config = ServerConfig {
        host: settings.server.host.clone(),
        port: settings.server.port,
    };
    let server = GatewayServer::new(config, orchestrator);
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("pairgate listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.shutdown().shutdown();
    let _ = handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
