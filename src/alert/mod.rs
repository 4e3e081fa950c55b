//! AlertDebouncer - Alert Episode State Machine
//!
//! ## Responsibilities
//!
//! - Decide whether a prediction starts a new reportable alert episode
//! - Suppress repeats of the same sustained threat within the cooldown
//! - Always fire on a label change (a different threat type is never
//!   suppressed by an unrelated prior alert)
//!
//! The check-and-transition is one indivisible operation under a mutex,
//! so two near-simultaneous qualifying predictions cannot both fire.

use crate::classifier::{Prediction, ThreatStatus};
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// An ongoing reported threat
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEpisode {
    pub label: String,
    pub confidence: f64,
    pub started_at: DateTime<Utc>,
}

/// Debouncer state: no active episode, or one active episode
#[derive(Debug, Clone)]
enum State {
    Idle,
    Active(AlertEpisode),
}

/// AlertDebouncer instance
pub struct AlertDebouncer {
    state: Mutex<State>,
    confidence_threshold: f64,
    cooldown: Duration,
}

impl AlertDebouncer {
    /// Create a new debouncer
    ///
    /// `cooldown_seconds` accepts fractional values for test scenarios.
    pub fn new(confidence_threshold: f64, cooldown_seconds: f64) -> Self {
        Self {
            state: Mutex::new(State::Idle),
            confidence_threshold,
            cooldown: Duration::milliseconds((cooldown_seconds * 1000.0) as i64),
        }
    }

    /// Evaluate a prediction at the current time
    ///
    /// Returns the new episode on a FIRE event, None when suppressed.
    pub fn evaluate(&self, prediction: &Prediction) -> Option<AlertEpisode> {
        self.evaluate_at(prediction, Utc::now())
    }

    /// Evaluate a prediction at an explicit time (deterministic for tests)
    pub fn evaluate_at(
        &self,
        prediction: &Prediction,
        now: DateTime<Utc>,
    ) -> Option<AlertEpisode> {
        // A low-confidence or benign reading never starts or extends an
        // episode.
        if prediction.threat_status != ThreatStatus::Threat
            || prediction.confidence < self.confidence_threshold
        {
            return None;
        }

        let mut state = self.state.lock().expect("debouncer mutex poisoned");

        let fire = match &*state {
            State::Idle => true,
            State::Active(episode) => {
                prediction.label != episode.label || now - episode.started_at > self.cooldown
            }
        };

        if !fire {
            tracing::debug!(
                label = %prediction.label,
                confidence = prediction.confidence,
                "Alert suppressed (same threat within cooldown)"
            );
            return None;
        }

        let episode = AlertEpisode {
            label: prediction.label.clone(),
            confidence: prediction.confidence,
            started_at: now,
        };
        *state = State::Active(episode.clone());

        tracing::info!(
            label = %episode.label,
            confidence = episode.confidence,
            "Alert episode fired"
        );

        Some(episode)
    }

    /// The currently active episode, if any
    pub fn active_episode(&self) -> Option<AlertEpisode> {
        match &*self.state.lock().expect("debouncer mutex poisoned") {
            State::Idle => None,
            State::Active(episode) => Some(episode.clone()),
        }
    }
}
