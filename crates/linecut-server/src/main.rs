use anyhow::Result;
use linecut_common::time::SystemClock;
use linecut_server::app;
use linecut_server::config::ServerConfig;
use linecut_server::scheduler::JobScheduler;
use linecut_server::services::{self, Services};
use linecut_server::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config/server.toml";

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  linecut-server [config.toml]          Start the server (default: {DEFAULT_CONFIG_PATH})");
    eprintln!("  linecut-server sweep <config.toml>    Run the overdue-store sweep once and exit");
}

#[tokio::main]
async fn main() -> Result<()> {
    linecut_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("linecut=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("sweep") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("sweep requires a <config.toml> argument")
            })?;
            run_sweep(config_path).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or(DEFAULT_CONFIG_PATH);
            run_server(config_path).await
        }
    }
}

/// One sweep against the snapshot, which is saved back afterwards so the
/// watermarks persist.
async fn run_sweep(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = services::open_store(&config)?;
    let wiring = Services::build(&config, store, Arc::new(SystemClock))?;

    let report = wiring.sweep.sweep().await?;
    tracing::info!(
        open = report.open,
        overdue = report.overdue,
        notified = report.notified,
        "Sweep finished"
    );
    services::save_store(&config, &wiring.store)
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = Arc::new(ServerConfig::load(config_path)?);

    tracing::info!(
        http_port = config.http_port,
        timezone = %config.timezone,
        snapshot = config.snapshot_path.as_deref().unwrap_or("-"),
        push = %config.push.provider,
        "linecut-server starting"
    );

    let store = services::open_store(&config)?;
    let wiring = Services::build(&config, store, Arc::new(SystemClock))?;
    let triggers = wiring.triggers.start(wiring.store.as_ref())?;

    let sweep_handle = if config.sweep.enabled {
        let scheduler = JobScheduler::new(wiring.sweep.clone(), config.sweep.interval_secs);
        Some(tokio::spawn(async move {
            scheduler.run().await;
        }))
    } else {
        tracing::info!("Overdue sweep disabled");
        None
    };

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let state = AppState::new(wiring.store.clone(), config.clone());
    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    tracing::info!(http = %http_addr, triggers = wiring.triggers.len(), "Server started");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutting down gracefully");
        })
        .await
    {
        tracing::error!(error = %e, "HTTP server error");
    }

    if let Some(h) = sweep_handle {
        h.abort();
    }
    triggers.shutdown().await;
    if let Err(e) = services::save_store(&config, &wiring.store) {
        tracing::error!(error = %e, "Failed to save store snapshot");
    }
    tracing::info!("Server stopped");

    Ok(())
}
