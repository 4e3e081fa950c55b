//! API Routes

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tower_http::services::ServeDir;

use crate::frame_store::FrameStore;
use crate::state::AppState;

/// Interval between WebSocket prediction pushes
const WS_PUSH_INTERVAL: Duration = Duration::from_millis(500);

/// Create API router
pub fn create_router(state: AppState) -> Router {
    let images_dir = state.config.images_dir.clone();

    Router::new()
        .route("/healthz", get(super::health_check))
        .route("/video_feed", get(video_feed))
        .route("/predict", get(get_prediction))
        .route("/history", get(get_history))
        .route("/ws", get(websocket_handler))
        .nest_service("/images", ServeDir::new(images_dir))
        .with_state(state)
}

// ========================================
// Video Feed
// ========================================

/// GET /video_feed
///
/// Endless multipart JPEG stream at capture cadence. Parts are withheld
/// until the camera produces its first frame; the stream ends only when
/// the client disconnects.
async fn video_feed(State(state): State<AppState>) -> impl IntoResponse {
    let frame_store = state.frame_store.clone();
    let tick = state.config.capture_interval;

    let stream = futures::stream::unfold(
        (frame_store, tokio::time::interval(tick)),
        |(store, mut ticker)| async move {
            let part = next_part(&store, &mut ticker).await;
            Some((Ok::<_, Infallible>(part), (store, ticker)))
        },
    );

    (
        [(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace;boundary=frame",
        )],
        Body::from_stream(stream),
    )
}

/// Wait for the next tick that has a frame and build its multipart part
async fn next_part(store: &FrameStore, ticker: &mut tokio::time::Interval) -> Bytes {
    loop {
        ticker.tick().await;
        if let Some(frame) = store.get().await {
            let mut part = Vec::with_capacity(frame.data.len() + 48);
            part.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
            part.extend_from_slice(&frame.data);
            part.extend_from_slice(b"\r\n");
            return Bytes::from(part);
        }
        // No frame yet: withhold data and keep ticking
    }
}

// ========================================
// Predictions
// ========================================

/// GET /predict
async fn get_prediction(State(state): State<AppState>) -> impl IntoResponse {
    match state.prediction.predict_once().await {
        Ok(prediction) => Json(prediction).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /ws (WebSocket upgrade)
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Push a prediction every ~0.5s until the client disconnects
async fn handle_websocket(mut socket: WebSocket, state: AppState) {
    tracing::info!("WebSocket client connected");
    let mut ticker = tokio::time::interval(WS_PUSH_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match state.prediction.predict_once().await {
                    Ok(prediction) => {
                        let payload = match serde_json::to_string(&prediction) {
                            Ok(json) => json,
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to serialize prediction");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        // NoFrame and classifier hiccups withhold this tick
                        tracing::debug!(error = %e, "Prediction unavailable for ws tick");
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    tracing::info!("WebSocket client disconnected");
}

// ========================================
// History
// ========================================

/// GET /history
async fn get_history(State(state): State<AppState>) -> impl IntoResponse {
    match state.history.list().await {
        Ok(records) => Json(json!({ "history": records })).into_response(),
        Err(e) => e.into_response(),
    }
}
