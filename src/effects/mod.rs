//! EffectDispatcher - Alert Side Effects
//!
//! ## Responsibilities
//!
//! - Fan a fired alert episode out to SMS, buzzer and history persistence
//! - Run effects off the serving path through a bounded work queue
//! - Contain every effect failure (log, never propagate, never retry)
//!
//! The three effects of one job run concurrently; one failing or slow
//! sink never blocks the others. A full queue drops the job with a
//! warning rather than stalling the prediction path. Shutdown drops the
//! sender and joins the worker so in-flight history writes complete
//! whole.

use crate::actuator::ActuatorChannel;
use crate::alert::AlertEpisode;
use crate::frame_store::Frame;
use crate::history::HistoryStore;
use crate::notification::NotificationChannel;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default queue bound
const QUEUE_CAPACITY: usize = 64;

/// A unit of side-effect work for one fired episode
pub struct EffectJob {
    pub episode: AlertEpisode,
    pub frame: Frame,
}

/// EffectDispatcher instance
pub struct EffectDispatcher {
    tx: Mutex<Option<mpsc::Sender<EffectJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EffectDispatcher {
    /// Create the dispatcher and spawn its worker task
    pub fn new(
        notifier: Option<Arc<dyn NotificationChannel>>,
        actuator: Option<Arc<dyn ActuatorChannel>>,
        history: Arc<HistoryStore>,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<EffectJob>(QUEUE_CAPACITY);

        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                Self::run_effects(&notifier, &actuator, &history, job).await;
            }
            tracing::info!("Effect worker drained");
        });

        Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Enqueue the side effects of a fired episode
    ///
    /// Never blocks: a full queue or stopped worker drops the job.
    pub fn dispatch(&self, episode: AlertEpisode, frame: Frame) {
        let tx = self.tx.lock().expect("dispatcher mutex poisoned");
        let Some(tx) = tx.as_ref() else {
            tracing::warn!("Effect dispatcher already shut down, dropping job");
            return;
        };

        match tx.try_send(EffectJob { episode, frame }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(
                    label = %job.episode.label,
                    "Effect queue full, dropping alert job"
                );
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::warn!(
                    label = %job.episode.label,
                    "Effect worker gone, dropping alert job"
                );
            }
        }
    }

    /// Stop accepting jobs and wait for queued work to drain
    pub async fn shutdown(&self) {
        let tx = self.tx.lock().expect("dispatcher mutex poisoned").take();
        drop(tx);

        let worker = self.worker.lock().expect("dispatcher mutex poisoned").take();
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Effect worker join failed");
            }
        }
    }

    /// Execute the three effects of one job concurrently
    async fn run_effects(
        notifier: &Option<Arc<dyn NotificationChannel>>,
        actuator: &Option<Arc<dyn ActuatorChannel>>,
        history: &Arc<HistoryStore>,
        job: EffectJob,
    ) {
        let episode = &job.episode;

        let notify = async {
            if let Some(notifier) = notifier {
                if let Err(e) = notifier.send_alert(&episode.label, episode.confidence).await {
                    tracing::warn!(label = %episode.label, error = %e, "Notification effect failed");
                }
            }
        };

        let actuate = async {
            if let Some(actuator) = actuator {
                if let Err(e) = actuator.trigger().await {
                    tracing::warn!(label = %episode.label, error = %e, "Actuator effect failed");
                }
            }
        };

        let persist = async {
            match history.save_image(&job.frame.data).await {
                Ok(image_link) => {
                    if let Err(e) = history
                        .append(episode.started_at, &episode.label, &image_link)
                        .await
                    {
                        tracing::error!(label = %episode.label, error = %e, "History append failed");
                    }
                }
                Err(e) => {
                    tracing::error!(label = %episode.label, error = %e, "Evidence image save failed");
                }
            }
        };

        tokio::join!(notify, actuate, persist);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeNotifier {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl NotificationChannel for FakeNotifier {
        async fn send_alert(&self, _label: &str, _confidence: f64) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Internal("simulated SMS failure".to_string()));
            }
            Ok(())
        }
    }

    struct FakeBuzzer {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ActuatorChannel for FakeBuzzer {
        async fn trigger(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn history() -> (Arc<HistoryStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        // One connection, so every acquire sees the same in-memory db
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = HistoryStore::new(pool, dir.path().to_path_buf())
            .await
            .unwrap();
        (Arc::new(store), dir)
    }

    fn episode(label: &str) -> AlertEpisode {
        AlertEpisode {
            label: label.to_string(),
            confidence: 0.9,
            started_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_fire_produces_all_three_effects() {
        let (store, _dir) = history().await;
        let notifier = Arc::new(FakeNotifier {
            calls: AtomicU32::new(0),
            fail: false,
        });
        let buzzer = Arc::new(FakeBuzzer {
            calls: AtomicU32::new(0),
        });

        let dispatcher = EffectDispatcher::new(
            Some(notifier.clone()),
            Some(buzzer.clone()),
            store.clone(),
        );

        dispatcher.dispatch(episode("fire on a street"), Frame::new(vec![1, 2, 3]));
        dispatcher.shutdown().await;

        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(buzzer.calls.load(Ordering::SeqCst), 1);
        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].threat_type, "fire on a street");
    }

    #[tokio::test]
    async fn test_failing_notifier_does_not_block_persistence() {
        let (store, _dir) = history().await;
        let notifier = Arc::new(FakeNotifier {
            calls: AtomicU32::new(0),
            fail: true,
        });
        let buzzer = Arc::new(FakeBuzzer {
            calls: AtomicU32::new(0),
        });

        let dispatcher = EffectDispatcher::new(
            Some(notifier.clone()),
            Some(buzzer.clone()),
            store.clone(),
        );

        dispatcher.dispatch(episode("car crash"), Frame::new(vec![4, 5, 6]));
        dispatcher.shutdown().await;

        // SMS failed, but both other effects still completed
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(buzzer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_sinks_still_persist() {
        let (store, _dir) = history().await;
        let dispatcher = EffectDispatcher::new(None, None, store.clone());

        dispatcher.dispatch(episode("car crash"), Frame::new(vec![7]));
        dispatcher.shutdown().await;

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_after_shutdown_is_dropped() {
        let (store, _dir) = history().await;
        let dispatcher = EffectDispatcher::new(None, None, store.clone());

        dispatcher.shutdown().await;
        dispatcher.dispatch(episode("car crash"), Frame::new(vec![8]));

        assert_eq!(store.list().await.unwrap().len(), 0);
    }
}
