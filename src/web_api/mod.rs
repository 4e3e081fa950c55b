//! WebAPI - HTTP/WebSocket Endpoints
//!
//! ## Responsibilities
//!
//! - Live video feed streaming
//! - Prediction endpoints (pull and push)
//! - Threat history queries
//! - Static serving of evidence images

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let classifier_ok = state.classifier.health_check().await;
    let has_frame = state.frame_store.has_frame().await;
    let capture_running = state.capture.is_running().await;

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "classifier_connected": classifier_ok,
        "capture_running": capture_running,
        "camera_ready": has_frame,
    }))
}
