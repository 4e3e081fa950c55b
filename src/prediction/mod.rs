//! PredictionService - Per-Tick Prediction Pipeline
//!
//! ## Responsibilities
//!
//! - Snapshot the current frame (NoFrame error before first capture)
//! - Classify outside the FrameStore lock
//! - Derive threat status from the configured threat-label set
//! - Run the alert debouncer and dispatch effects on a FIRE event
//!
//! Backs both the pull-based /predict endpoint and the push-based /ws
//! stream; the /video_feed passthrough does not classify.

use crate::alert::AlertDebouncer;
use crate::classifier::{Classifier, Prediction, ThreatStatus};
use crate::effects::EffectDispatcher;
use crate::error::{Error, Result};
use crate::frame_store::FrameStore;
use std::collections::HashSet;
use std::sync::Arc;

/// PredictionService instance
pub struct PredictionService {
    frame_store: Arc<FrameStore>,
    classifier: Arc<dyn Classifier>,
    debouncer: Arc<AlertDebouncer>,
    effects: Arc<EffectDispatcher>,
    threat_labels: HashSet<String>,
}

impl PredictionService {
    /// Create a new PredictionService
    pub fn new(
        frame_store: Arc<FrameStore>,
        classifier: Arc<dyn Classifier>,
        debouncer: Arc<AlertDebouncer>,
        effects: Arc<EffectDispatcher>,
        threat_labels: Vec<String>,
    ) -> Self {
        Self {
            frame_store,
            classifier,
            debouncer,
            effects,
            threat_labels: threat_labels.into_iter().collect(),
        }
    }

    /// Classify the current frame and react to the result
    pub async fn predict_once(&self) -> Result<Prediction> {
        // Snapshot under the lock, classify outside it: classification
        // latency must not stall the capture cadence or other readers.
        let frame = self.frame_store.get().await.ok_or(Error::NoFrame)?;

        let raw = self.classifier.classify(&frame.data).await?;

        let threat_status = if self.threat_labels.contains(&raw.label) {
            ThreatStatus::Threat
        } else {
            ThreatStatus::NonThreat
        };

        let prediction = Prediction {
            label: raw.label,
            confidence: raw.confidence,
            threat_status,
        };

        if let Some(episode) = self.debouncer.evaluate(&prediction) {
            self.effects.dispatch(episode, frame);
        }

        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::RawPrediction;
    use crate::frame_store::Frame;
    use crate::history::HistoryStore;
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Mutex;

    struct ScriptedClassifier {
        results: Mutex<Vec<Result<RawPrediction>>>,
    }

    impl ScriptedClassifier {
        fn new(results: Vec<Result<RawPrediction>>) -> Self {
            Self {
                results: Mutex::new(results),
            }
        }
    }

    #[async_trait]
    impl Classifier for ScriptedClassifier {
        async fn classify(&self, _frame: &[u8]) -> Result<RawPrediction> {
            self.results.lock().unwrap().remove(0)
        }
    }

    fn raw(label: &str, confidence: f64) -> Result<RawPrediction> {
        Ok(RawPrediction {
            label: label.to_string(),
            confidence,
        })
    }

    async fn service(
        classifier: ScriptedClassifier,
        with_frame: bool,
    ) -> (PredictionService, Arc<HistoryStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        // One connection, so every acquire sees the same in-memory db
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let history = Arc::new(
            HistoryStore::new(pool, dir.path().to_path_buf())
                .await
                .unwrap(),
        );

        let frame_store = Arc::new(FrameStore::new());
        if with_frame {
            frame_store.put(Frame::new(vec![1, 2, 3])).await;
        }

        let svc = PredictionService::new(
            frame_store,
            Arc::new(classifier),
            Arc::new(AlertDebouncer::new(0.25, 5.0)),
            Arc::new(EffectDispatcher::new(None, None, history.clone())),
            vec!["fire on a street".to_string(), "car crash".to_string()],
        );
        (svc, history, dir)
    }

    #[tokio::test]
    async fn test_no_frame_yields_error() {
        let (svc, _history, _dir) = service(ScriptedClassifier::new(vec![]), false).await;
        assert!(matches!(svc.predict_once().await, Err(Error::NoFrame)));
    }

    #[tokio::test]
    async fn test_threat_label_sets_status_and_fires() {
        let classifier = ScriptedClassifier::new(vec![raw("fire on a street", 0.9)]);
        let (svc, history, _dir) = service(classifier, true).await;

        let prediction = svc.predict_once().await.unwrap();
        assert_eq!(prediction.threat_status, ThreatStatus::Threat);

        svc.effects.shutdown().await;
        assert_eq!(history.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_benign_label_is_non_threat_and_quiet() {
        let classifier = ScriptedClassifier::new(vec![raw("quiet street", 0.95)]);
        let (svc, history, _dir) = service(classifier, true).await;

        let prediction = svc.predict_once().await.unwrap();
        assert_eq!(prediction.threat_status, ThreatStatus::NonThreat);

        svc.effects.shutdown().await;
        assert!(history.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_threat_persists_once() {
        let classifier = ScriptedClassifier::new(vec![
            raw("car crash", 0.9),
            raw("car crash", 0.8),
            raw("car crash", 0.7),
        ]);
        let (svc, history, _dir) = service(classifier, true).await;

        for _ in 0..3 {
            svc.predict_once().await.unwrap();
        }

        svc.effects.shutdown().await;
        assert_eq!(history.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_classifier_failure_propagates_without_firing() {
        let classifier = ScriptedClassifier::new(vec![Err(Error::Classifier(
            "model unavailable".to_string(),
        ))]);
        let (svc, history, _dir) = service(classifier, true).await;

        assert!(matches!(
            svc.predict_once().await,
            Err(Error::Classifier(_))
        ));

        svc.effects.shutdown().await;
        assert!(history.list().await.unwrap().is_empty());
    }
}
