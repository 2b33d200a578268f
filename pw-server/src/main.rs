//! PedalWatch Server
//!
//! Samples the pedal set, runs the drift and noise monitors, and streams
//! telemetry batches to a single SSE consumer.

use anyhow::{Context, Result};
use pw_adapters::{CommandAlertSink, LogAlertSink};
use pw_core::{AlertSink, MonitorConfig};
use pw_server::{api, monitor, state};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting PedalWatch");

    let config = MonitorConfig::discover().context("failed to load configuration")?;
    let state = state::AppState::new(config);

    let alerts: Arc<dyn AlertSink> = if state.config.alerts.command.is_empty() {
        Arc::new(LogAlertSink)
    } else {
        Arc::new(CommandAlertSink::new(&state.config.alerts.command)?)
    };

    // Bind before sampling so a busy port fails startup cleanly
    let addr = state.config.server.bind;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let sampler = monitor::spawn(&state, alerts, open_source)?;

    {
        let shutdown = state.shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() && shutdown.trigger() {
                info!("Ctrl-C received, shutting down");
            }
        });
    }

    let app = api::create_router(state.clone());
    info!("Server listening on http://{}", addr);

    let shutdown = state.shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;

    // The server can also stop on its own (I/O error)
    state.shutdown.trigger();
    if tokio::task::spawn_blocking(move || sampler.join())
        .await
        .map(|joined| joined.is_err())
        .unwrap_or(true)
    {
        error!("Sampler thread panicked");
    }

    served?;
    info!("PedalWatch stopped");
    Ok(())
}

#[cfg(feature = "gamepad")]
fn open_source() -> Result<pw_adapters::GamepadSource> {
    pw_adapters::GamepadSource::new()
}

#[cfg(not(feature = "gamepad"))]
fn open_source() -> Result<pw_adapters::DemoPedals> {
    Ok(pw_adapters::DemoPedals::new())
}
