//! Application state
//!
//! Holds all shared components, injected by handle rather than held as
//! ambient globals so tests can substitute fakes.

use crate::capture::CaptureLoop;
use crate::classifier::RemoteClassifier;
use crate::config::AppConfig;
use crate::frame_store::FrameStore;
use crate::history::HistoryStore;
use crate::prediction::PredictionService;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// FrameStore (latest captured frame)
    pub frame_store: Arc<FrameStore>,
    /// CaptureLoop (background camera polling)
    pub capture: Arc<CaptureLoop>,
    /// Classifier adapter (kept for health checks)
    pub classifier: Arc<RemoteClassifier>,
    /// PredictionService (classify + debounce + effects)
    pub prediction: Arc<PredictionService>,
    /// HistoryStore (threat evidence persistence)
    pub history: Arc<HistoryStore>,
}
