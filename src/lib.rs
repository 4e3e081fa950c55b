//! Surveil Server Library
//!
//! Live video threat monitoring service.
//!
//! ## Architecture
//!
//! 1. FrameStore - single latest camera frame under mutual exclusion
//! 2. CaptureLoop - ~30 Hz background frame capture
//! 3. Classifier - model server adapter (label + confidence)
//! 4. AlertDebouncer - alert episode state machine (cooldown/label rules)
//! 5. EffectDispatcher - SMS/buzzer/history side effects off the serving path
//! 6. PredictionService - frame -> classify -> debounce -> effects
//! 7. HistoryStore - append-only threat evidence (SQLite + JPEG artifacts)
//! 8. WebAPI - /video_feed, /predict, /ws, /history
//!
//! ## Design Principles
//!
//! - Shared state is injected by handle, never ambient
//! - Classification never runs inside the FrameStore lock
//! - Effect failures are contained; serving never observes them

pub mod actuator;
pub mod alert;
pub mod capture;
pub mod classifier;
pub mod config;
pub mod effects;
pub mod error;
pub mod frame_store;
pub mod history;
pub mod notification;
pub mod prediction;
pub mod state;
pub mod web_api;
