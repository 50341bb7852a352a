//! Arena Client - headless multiplayer soccer client
//!
//! Connects to the arena game server over WebSocket and keeps a local view of
//! the match in step with it:
//! - Predicts the local player between authoritative snapshots
//! - Reconciles snapshots into local entity state
//! - Runs the kickoff countdown in agreement with the server
//! - Estimates input-to-snapshot latency

mod app;
mod config;
mod console;
mod game;
mod util;
mod ws;

use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::ClientState;
use crate::config::Config;
use crate::console::{spawn_stdin_reader, ConsoleCommand, LogRenderer};
use crate::game::GameClient;
use crate::util::time::{init_client_time, uptime_secs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    init_client_time();

    info!("Starting Arena Client");
    info!(player = %config.player_name, server = %config.server_url, "Connecting");

    let connection = ws::connect(&config.server_url).await?;
    let (outbound, events, tasks) = connection.into_parts();

    // Console and Ctrl+C share one command channel
    let (command_tx, command_rx) = mpsc::channel::<ConsoleCommand>(64);
    // Detached: a pending stdin read ends with the process
    let _stdin_thread = spawn_stdin_reader(command_tx.clone())?;
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = command_tx.send(ConsoleCommand::Quit).await;
    });

    info!("Commands: +KeyW/-KeyW to press/release, /create, /join <code>, /team <team>, /move <id> <team>, /settings <team> <minutes>, /start, /leave, /quit");

    let state = ClientState::from_config(&config);
    let client = GameClient::new(state, events, outbound, command_rx, LogRenderer::new());
    let state = client.run().await;

    // Client loop owned the only outbound sender; the writer now drains and closes
    tasks.shutdown().await;

    info!(
        uptime_secs = uptime_secs(),
        player_id = ?state.session.player_id,
        "Client shutdown complete"
    );
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Resolves on Ctrl+C (or SIGTERM on unix)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, leaving");
        }
        _ = terminate => {
            info!("Received terminate signal, leaving");
        }
    }
}
