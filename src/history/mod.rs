//! HistoryStore - Threat Evidence Persistence
//!
//! ## Responsibilities
//!
//! - Append-only threat history in SQLite (threats table)
//! - Save evidence JPEGs to the images directory
//! - Query interface for the history endpoint (newest first)
//!
//! Records are never mutated or deleted here; retention is an external
//! concern.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

/// A persisted threat record (matches the threats table)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Monotonic id assigned by the store
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub threat_type: String,
    /// Reference path to the saved evidence image
    pub image_link: String,
}

/// HistoryStore instance
pub struct HistoryStore {
    pool: SqlitePool,
    images_dir: PathBuf,
}

impl HistoryStore {
    /// Create the store and ensure schema + images directory exist
    pub async fn new(pool: SqlitePool, images_dir: PathBuf) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS threats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                threat_type TEXT NOT NULL,
                image_link TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        fs::create_dir_all(&images_dir).await?;

        Ok(Self { pool, images_dir })
    }

    /// Save an evidence JPEG, returning its public reference path
    pub async fn save_image(&self, data: &[u8]) -> Result<String> {
        let filename = format!("{}.jpg", Uuid::new_v4());
        let path = self.images_dir.join(&filename);
        fs::write(&path, data).await?;

        tracing::debug!(
            path = %path.display(),
            size = data.len(),
            "Saved evidence image"
        );

        Ok(format!("/images/{}", filename))
    }

    /// Append a threat record, returning it with the assigned id
    pub async fn append(
        &self,
        timestamp: DateTime<Utc>,
        threat_type: &str,
        image_link: &str,
    ) -> Result<HistoryRecord> {
        let result = sqlx::query(
            "INSERT INTO threats (timestamp, threat_type, image_link) VALUES (?, ?, ?)",
        )
        .bind(timestamp.to_rfc3339())
        .bind(threat_type)
        .bind(image_link)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();

        tracing::info!(
            id = id,
            threat_type = %threat_type,
            image_link = %image_link,
            "Threat record persisted"
        );

        Ok(HistoryRecord {
            id,
            timestamp,
            threat_type: threat_type.to_string(),
            image_link: image_link.to_string(),
        })
    }

    /// All threat records, newest first
    pub async fn list(&self) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query(
            "SELECT id, timestamp, threat_type, image_link
             FROM threats ORDER BY timestamp DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .into_iter()
            .map(|row| {
                let ts: String = row.get("timestamp");
                HistoryRecord {
                    id: row.get("id"),
                    timestamp: DateTime::parse_from_rfc3339(&ts)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                    threat_type: row.get("threat_type"),
                    image_link: row.get("image_link"),
                }
            })
            .collect();

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store() -> (HistoryStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        // One connection, so every acquire sees the same in-memory db
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = HistoryStore::new(pool, dir.path().to_path_buf())
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_append_assigns_monotonic_ids() {
        let (store, _dir) = store().await;
        let now = Utc::now();

        let a = store.append(now, "fire on a street", "/images/a.jpg").await.unwrap();
        let b = store.append(now, "car crash", "/images/b.jpg").await.unwrap();

        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (store, _dir) = store().await;
        let base = Utc::now();

        store
            .append(base - Duration::seconds(10), "car crash", "/images/old.jpg")
            .await
            .unwrap();
        store
            .append(base, "fire on a street", "/images/new.jpg")
            .await
            .unwrap();

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].threat_type, "fire on a street");
        assert_eq!(records[1].threat_type, "car crash");
    }

    #[tokio::test]
    async fn test_save_image_writes_file() {
        let (store, dir) = store().await;

        let link = store.save_image(&[0xff, 0xd8, 0xff]).await.unwrap();
        assert!(link.starts_with("/images/"));
        assert!(link.ends_with(".jpg"));

        let filename = link.trim_start_matches("/images/");
        assert!(dir.path().join(filename).exists());
    }
}
