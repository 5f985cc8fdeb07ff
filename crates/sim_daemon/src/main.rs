mod history;
mod routes;
mod state;
mod subscribers;
mod tick_loop;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use crate::routes::make_router_with_cors;
use crate::state::AppState;
use crate::subscribers::BroadcastSubscriber;
use crate::tick_loop::SimulationLoop;

/// Snapshots buffered per SSE client before it starts lagging.
const STREAM_BUFFER: usize = 64;

#[derive(Parser)]
#[command(name = "sim_daemon", about = "EV simulation HTTP daemon")]
struct Cli {
    /// JSON config file. Built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,
    #[arg(long, default_value_t = 3001)]
    port: u16,
    /// Overrides the config seed. Random when neither is set.
    #[arg(long)]
    seed: Option<u64>,
    /// Driving mode to start in.
    #[arg(long)]
    mode: Option<String>,
    /// Start ticking immediately instead of waiting for POST /api/v1/start.
    #[arg(long)]
    autostart: bool,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = sim_world::load_config_or_default(cli.config.as_deref())?;
    let mut sim = sim_world::build_simulation(config, cli.seed)?;
    if let Some(key) = cli.mode.as_deref() {
        sim.change_mode(key)?;
    }
    tracing::info!(
        vehicle = %sim.vehicle_id(),
        seed = sim.seed(),
        mode = %sim.mode(),
        "vehicle ready"
    );

    let sim_loop = Arc::new(SimulationLoop::new(sim));
    let (snapshot_tx, _) = broadcast::channel(STREAM_BUFFER);
    let stream_subscriber = sim_loop
        .register(Arc::new(BroadcastSubscriber::new(snapshot_tx.clone())))
        .context("registering stream subscriber")?;
    if cli.autostart {
        sim_loop.start(None).await;
    }

    let app = make_router_with_cors(
        AppState {
            sim_loop: Arc::clone(&sim_loop),
            snapshot_tx,
        },
        &cli.cors_origin,
    );
    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", cli.bind, cli.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("serving HTTP")?;

    sim_loop.stop().await;
    sim_loop.unregister(stream_subscriber);
    Ok(())
}
