//! HTTP routes: telemetry SSE stream, status and quit

use crate::gate::{ConsumerLease, GateError};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use pw_core::model::{BridgeInfo, TelemetryBatch};
use pw_core::Frame;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/telemetry/stream", get(telemetry_stream))
        .route("/api/status", get(status))
        .route("/QUIT", get(quit).post(quit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Telemetry Stream Endpoint ===

#[derive(Deserialize)]
struct StreamQuery {
    takeover: Option<String>,
}

impl StreamQuery {
    fn wants_takeover(&self) -> bool {
        matches!(self.takeover.as_deref(), Some("1") | Some("true"))
    }
}

type EventStream = BoxStream<'static, Result<Event, Infallible>>;

async fn telemetry_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<EventStream> {
    let server = &state.config.server;
    let keep_alive = KeepAlive::new()
        .interval(server.heartbeat())
        .text("heartbeat");

    let lease = match state
        .gate
        .acquire(query.wants_takeover(), server.takeover_wait())
        .await
    {
        Ok(lease) => lease,
        Err(e) => {
            info!("Rejecting stream consumer: {}", e);
            let event = busy_event(e);
            let stream = stream::once(async move { Ok::<_, Infallible>(event) }).boxed();
            return Sse::new(stream).keep_alive(keep_alive);
        }
    };

    info!("Stream consumer connected");
    let stream = stream::unfold(StreamCtx::new(state, lease), next_batch).boxed();
    Sse::new(stream).keep_alive(keep_alive)
}

fn busy_event(err: GateError) -> Event {
    let body = serde_json::json!({
        "error": "busy",
        "message": err.to_string(),
    });
    Event::default().event("busy").data(body.to_string())
}

/// Per-consumer stream state. Dropping it releases the consumer slot.
struct StreamCtx {
    state: AppState,
    cancel: CancellationToken,
    _lease: ConsumerLease,
    first: bool,
}

impl StreamCtx {
    fn new(state: AppState, lease: ConsumerLease) -> Self {
        Self {
            cancel: lease.cancelled_token(),
            _lease: lease,
            state,
            first: true,
        }
    }
}

async fn next_batch(mut ctx: StreamCtx) -> Option<(Result<Event, Infallible>, StreamCtx)> {
    let wait = ctx.state.config.server.batch_wait();

    loop {
        if !ctx.first {
            tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    info!("Stream consumer replaced by takeover");
                    return None;
                }
                _ = ctx.state.shutdown.cancelled() => {
                    debug!("Stream closed for shutdown");
                    return None;
                }
                _ = tokio::time::timeout(wait, ctx.state.queue.notified()) => {}
            }
        }

        let frames = ctx.state.queue.drain();
        // The connect batch goes out even when empty
        if frames.is_empty() && !ctx.first {
            continue;
        }
        ctx.first = false;

        if let Some(event) = batch_event(&ctx.state, &frames) {
            return Some((Ok(event), ctx));
        }
    }
}

fn batch_event(state: &AppState, frames: &[Arc<Frame>]) -> Option<Event> {
    let served_at = Utc::now().timestamp_millis();
    let info = BridgeInfo {
        batch_id: state.stats.next_batch_id(),
        served_at_unix_ms: served_at,
        pending_frame_count: frames.len(),
        dropped_frame_count: state.queue.dropped_frames(),
    };
    let batch = TelemetryBatch::new(info, frames.iter().map(|f| f.as_ref()).collect());

    match serde_json::to_string(&batch) {
        Ok(json) => {
            state.stats.record_sent(served_at);
            debug!(batch_id = info.batch_id, frames = frames.len(), "batch sent");
            Some(Event::default().data(json))
        }
        Err(e) => {
            error!("Failed to serialize batch {}: {}", info.batch_id, e);
            None
        }
    }
}

// === Status Endpoint ===

#[derive(Serialize)]
struct StatusResponse {
    last_sequence: u64,
    queued: usize,
    dropped: u64,
    capacity: usize,
    consumer_active: bool,
    batches_sent: u64,
    last_served_unix_ms: i64,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        last_sequence: state.queue.last_sequence(),
        queued: state.queue.len(),
        dropped: state.queue.dropped_frames(),
        capacity: state.queue.capacity(),
        consumer_active: state.gate.is_active(),
        batches_sent: state.stats.batches_sent(),
        last_served_unix_ms: state.stats.last_served_unix_ms(),
    })
}

// === Quit Endpoint ===

async fn quit(State(state): State<AppState>) -> Json<serde_json::Value> {
    if state.shutdown.trigger() {
        info!("Quit requested");
    }
    Json(serde_json::json!({ "ok": true }))
}
