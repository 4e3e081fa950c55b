//! Surveil Server
//!
//! Main entry point for the live threat monitoring service.

use surveil_server::{
    actuator::{ActuatorChannel, BuzzerClient},
    alert::AlertDebouncer,
    capture::{CaptureLoop, FfmpegCamera},
    classifier::RemoteClassifier,
    config::AppConfig,
    effects::EffectDispatcher,
    frame_store::FrameStore,
    history::HistoryStore,
    notification::{NotificationChannel, TwilioNotifier},
    prediction::PredictionService,
    state::AppState,
    web_api,
};

use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "surveil_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting surveil server v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::default();
    tracing::info!(
        camera_source = %config.camera_source,
        classifier_url = %config.classifier_url,
        confidence_threshold = config.confidence_threshold,
        cooldown_seconds = config.cooldown_seconds,
        database_url = %config.database_url,
        images_dir = %config.images_dir.display(),
        "Configuration loaded"
    );

    // Database pool for threat history
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await?;
    tracing::info!("Database connected");

    let history = Arc::new(HistoryStore::new(pool, config.images_dir.clone()).await?);
    tracing::info!("HistoryStore initialized");

    // Alert sinks: missing settings disable a sink, never fail startup
    let notifier: Option<Arc<dyn NotificationChannel>> = match config.twilio.clone() {
        Some(twilio) => Some(Arc::new(TwilioNotifier::new(twilio))),
        None => {
            tracing::info!("SMS alerts disabled (Twilio settings not set)");
            None
        }
    };
    let actuator: Option<Arc<dyn ActuatorChannel>> = match config.buzzer_url.clone() {
        Some(url) => Some(Arc::new(BuzzerClient::new(url))),
        None => {
            tracing::info!("Buzzer disabled (BUZZER_URL not set)");
            None
        }
    };

    let effects = Arc::new(EffectDispatcher::new(notifier, actuator, history.clone()));
    tracing::info!("EffectDispatcher initialized");

    let debouncer = Arc::new(AlertDebouncer::new(
        config.confidence_threshold,
        config.cooldown_seconds,
    ));

    let classifier = Arc::new(RemoteClassifier::new(config.classifier_url.clone()));

    let frame_store = Arc::new(FrameStore::new());
    let camera = Arc::new(FfmpegCamera::new(
        config.camera_source.clone(),
        config.capture_timeout_sec,
    ));
    let capture = Arc::new(CaptureLoop::new(
        camera,
        frame_store.clone(),
        config.capture_interval,
    ));

    let prediction = Arc::new(PredictionService::new(
        frame_store.clone(),
        classifier.clone(),
        debouncer,
        effects.clone(),
        config.threat_labels.clone(),
    ));

    // Fatal only if the camera never delivers a frame; transient mid-run
    // failures are skipped per tick by the loop.
    capture.probe(3).await?;
    capture.start().await;
    tracing::info!("Capture loop started");

    let state = AppState {
        config: config.clone(),
        frame_store,
        capture: capture.clone(),
        classifier,
        prediction,
        history,
    };

    let app = web_api::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Release the camera, then drain queued alert effects so no history
    // record is written partially.
    capture.stop().await;
    effects.shutdown().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
