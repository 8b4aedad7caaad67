//! Axum router construction for the gateway.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::dispatch::Dispatcher;
use crate::ws;

/// Build the complete Axum router for the gateway.
///
/// The router includes:
/// - `GET /` -- service identification probe
/// - `GET /ws` -- the `WebSocket` protocol endpoint
///
/// CORS allows any origin; the WebSocket protocol carries its own
/// authentication, and the probe exposes nothing sensitive.
pub fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

/// `GET /` -- a minimal identification payload for health probes.
async fn index() -> Json<Value> {
    Json(json!({
        "name": "ticksight",
        "version": env!("CARGO_PKG_VERSION"),
        "websocket": "/ws",
    }))
}
