// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding cache keyed by model and text.

use lessonflow_core::LessonflowError;
use rusqlite::params;
use sha2::{Digest, Sha256};

use crate::database::{Database, map_tr_err};
use crate::models::{blob_to_vec, vec_to_blob};

/// Cache key for `text` embedded by `model`.
pub fn cache_key(model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update(b"\0");
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cached vector for `key` unless it expired before `now`.
pub async fn get(db: &Database, key: &str, now: &str) -> Result<Option<Vec<f32>>, LessonflowError> {
    let key = key.to_string();
    let now = now.to_string();
    let blob: Option<Vec<u8>> = db
        .connection()
        .call(move |conn| {
            match conn.query_row(
                "SELECT embedding FROM embedding_cache WHERE key = ?1 AND expires_at > ?2",
                params![key, now],
                |row| row.get(0),
            ) {
                Ok(b) => Ok(Some(b)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;
    Ok(blob.map(|b| blob_to_vec(&b)))
}

/// Store or replace the vector for `key`.
pub async fn put(
    db: &Database,
    key: &str,
    embedding: &[f32],
    expires_at: &str,
) -> Result<(), LessonflowError> {
    let key = key.to_string();
    let blob = vec_to_blob(embedding);
    let expires_at = expires_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO embedding_cache (key, embedding, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET embedding = excluded.embedding,
                 expires_at = excluded.expires_at",
                params![key, blob, expires_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete entries that expired at or before `now`. Returns the number removed.
pub async fn purge_expired(db: &Database, now: &str) -> Result<usize, LessonflowError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM embedding_cache WHERE expires_at <= ?1",
                params![now],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Rows currently stored, expired or not.
pub async fn count_entries(db: &Database) -> Result<i64, LessonflowError> {
    db.connection()
        .call(|conn| conn.query_row("SELECT COUNT(*) FROM embedding_cache", [], |row| row.get(0)))
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_db;

    #[tokio::test]
    async fn expired_entries_miss() {
        let (db, _dir) = setup_db().await;
        let key = cache_key("text-embedding-3-large", "photosynthesis");
        put(&db, &key, &[0.5, 0.25], "2026-02-01T00:00:00.000Z").await.unwrap();

        let hit = get(&db, &key, "2026-01-15T00:00:00.000Z").await.unwrap();
        assert_eq!(hit, Some(vec![0.5, 0.25]));
        assert!(get(&db, &key, "2026-03-01T00:00:00.000Z").await.unwrap().is_none());

        put(&db, &key, &[1.0], "2026-04-01T00:00:00.000Z").await.unwrap();
        let refreshed = get(&db, &key, "2026-03-01T00:00:00.000Z").await.unwrap();
        assert_eq!(refreshed, Some(vec![1.0]));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn purge_removes_only_expired_rows() {
        let (db, _dir) = setup_db().await;
        put(&db, "old", &[0.1], "2026-01-01T00:00:00.000Z").await.unwrap();
        put(&db, "edge", &[0.2], "2026-02-01T00:00:00.000Z").await.unwrap();
        put(&db, "fresh", &[0.3], "2026-03-01T00:00:00.000Z").await.unwrap();

        let removed = purge_expired(&db, "2026-02-01T00:00:00.000Z").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(count_entries(&db).await.unwrap(), 1);
        assert!(get(&db, "fresh", "2026-02-01T00:00:00.000Z").await.unwrap().is_some());
        db.close().await.unwrap();
    }

    #[test]
    fn key_depends_on_model() {
        assert_ne!(cache_key("a", "text"), cache_key("b", "text"));
    }
}
