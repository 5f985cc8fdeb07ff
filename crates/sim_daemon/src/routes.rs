use crate::state::AppState;
use crate::tick_loop::LoopStatus;
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use sim_control::ControlUpdate;
use sim_core::Simulation;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, "http://localhost:5173")
}

pub fn make_router_with_cors(state: AppState, cors_origin: &str) -> Router {
    let origin = cors_origin.parse::<HeaderValue>().unwrap_or_else(|err| {
        tracing::warn!("invalid CORS origin {cors_origin:?} ({err}); allowing none");
        HeaderValue::from_static("null")
    });
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/meta", get(meta_handler))
        .route("/api/v1/snapshot", get(snapshot_handler))
        .route("/api/v1/history", get(history_handler))
        .route("/api/v1/stream", get(stream_handler))
        .route("/api/v1/start", post(start_handler))
        .route("/api/v1/stop", post(stop_handler))
        .route("/api/v1/reset", post(reset_handler))
        .route("/api/v1/mode", post(mode_handler))
        .route("/api/v1/controls", post(controls_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn status_json(status: &LoopStatus) -> serde_json::Value {
    match status {
        LoopStatus::Faulted(err) => {
            serde_json::json!({"status": status.label(), "error": err.to_string()})
        }
        _ => serde_json::json!({"status": status.label()}),
    }
}

pub async fn meta_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let sim_loop = &app_state.sim_loop;
    let mut meta = status_json(&sim_loop.status());
    let interval_ms = sim_loop.tick_interval().as_millis();
    sim_loop.with_sim(|sim: &Simulation| {
        meta["vehicle_id"] = serde_json::json!(sim.vehicle_id());
        meta["seed"] = serde_json::json!(sim.seed());
        meta["tick"] = serde_json::json!(sim.tick());
        meta["mode"] = serde_json::json!(sim.mode());
        meta["kinematics"] = serde_json::json!(sim.config().kinematics);
    });
    meta["tick_interval_ms"] = serde_json::json!(interval_ms);
    meta["running"] = serde_json::json!(sim_loop.is_running());
    meta["history_len"] = serde_json::json!(sim_loop.history_len());
    meta["subscribers"] = serde_json::json!(sim_loop.subscriber_count());
    Json(meta)
}

pub async fn snapshot_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let snapshot = app_state.sim_loop.snapshot();
    match serde_json::to_string(&snapshot) {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        ),
        Err(err) => {
            tracing::error!("snapshot serialization failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"serialization failed"}"#.to_string(),
            )
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    from: Option<f64>,
    to: Option<f64>,
}

pub async fn history_handler(
    State(app_state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<sim_core::Snapshot>> {
    Json(app_state.sim_loop.history(query.from, query.to))
}

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    mode: Option<String>,
}

pub async fn start_handler(
    State(app_state): State<AppState>,
    body: Option<Json<StartRequest>>,
) -> Json<serde_json::Value> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    app_state.sim_loop.start(request.mode.as_deref()).await;
    Json(status_json(&app_state.sim_loop.status()))
}

pub async fn stop_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let status = app_state.sim_loop.stop().await;
    Json(status_json(&status))
}

pub async fn reset_handler(State(app_state): State<AppState>) -> Json<sim_core::Snapshot> {
    Json(app_state.sim_loop.reset())
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    mode: String,
}

pub async fn mode_handler(
    State(app_state): State<AppState>,
    Json(request): Json<ModeRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    match app_state.sim_loop.change_mode(&request.mode) {
        Ok(mode) => (StatusCode::OK, Json(serde_json::json!({"mode": mode}))),
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": err.to_string()})),
        ),
    }
}

pub async fn controls_handler(
    State(app_state): State<AppState>,
    Json(update): Json<ControlUpdate>,
) -> Json<sim_core::ControlInput> {
    Json(app_state.sim_loop.set_controls(update))
}

pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.snapshot_tx.subscribe();
    let sim_loop = app_state.sim_loop.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(5));
        heartbeat.tick().await; // discard the immediate first tick
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(snapshot) => {
                            heartbeat.reset();
                            let data = serde_json::to_string(&snapshot).unwrap_or_default();
                            yield Ok(Event::default().event("snapshot").data(data));
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "stream client lagging");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = heartbeat.tick() => {
                    let hb = serde_json::json!({
                        "heartbeat": true,
                        "tick": sim_loop.with_sim(Simulation::tick),
                        "status": sim_loop.status().label(),
                    });
                    yield Ok(Event::default().event("heartbeat").data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}
