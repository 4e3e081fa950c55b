//! FrameStore - Latest Captured Frame
//!
//! ## Responsibilities
//!
//! - Hold the single most recent camera frame
//! - Serialize writers (capture loop) against readers (serving path)
//! - Hand out immutable snapshots so later writes never mutate data
//!   already given to a reader
//!
//! The payload is `Arc<[u8]>`: `put` replaces the slot wholesale, so a
//! snapshot taken by `get` is isolated from every subsequent write.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A captured frame (JPEG bytes + capture timestamp)
#[derive(Debug, Clone)]
pub struct Frame {
    /// JPEG image data
    pub data: Arc<[u8]>,
    /// Capture timestamp
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    /// Create a frame captured now
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: data.into(),
            captured_at: Utc::now(),
        }
    }
}

/// FrameStore instance
pub struct FrameStore {
    current: RwLock<Option<Frame>>,
}

impl FrameStore {
    /// Create an empty FrameStore
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Replace the current frame
    pub async fn put(&self, frame: Frame) {
        let mut current = self.current.write().await;
        *current = Some(frame);
    }

    /// Snapshot of the latest frame, or None before the first capture
    ///
    /// Callers must handle None explicitly; there is no blocking wait
    /// for the camera to warm up.
    pub async fn get(&self) -> Option<Frame> {
        let current = self.current.read().await;
        current.clone()
    }

    /// Whether at least one frame has been captured
    pub async fn has_frame(&self) -> bool {
        let current = self.current.read().await;
        current.is_some()
    }
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_store_returns_none() {
        let store = FrameStore::new();
        assert!(store.get().await.is_none());
        assert!(!store.has_frame().await);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = FrameStore::new();
        store.put(Frame::new(vec![1, 2, 3])).await;

        let frame = store.get().await.expect("frame should exist");
        assert_eq!(&frame.data[..], &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_snapshot_isolated_from_later_put() {
        let store = FrameStore::new();
        store.put(Frame::new(vec![1, 2, 3])).await;

        let snapshot = store.get().await.unwrap();
        store.put(Frame::new(vec![9, 9, 9])).await;

        // The snapshot handed out earlier is unaffected by the overwrite
        assert_eq!(&snapshot.data[..], &[1, 2, 3]);
        assert_eq!(&store.get().await.unwrap().data[..], &[9, 9, 9]);
    }

    #[tokio::test]
    async fn test_concurrent_get_put() {
        let store = Arc::new(FrameStore::new());

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..100u8 {
                    store.put(Frame::new(vec![i; 16])).await;
                }
            })
        };

        let reader = {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    if let Some(frame) = store.get().await {
                        // A frame is never torn: all bytes match
                        let first = frame.data[0];
                        assert!(frame.data.iter().all(|b| *b == first));
                    }
                }
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();
    }
}
