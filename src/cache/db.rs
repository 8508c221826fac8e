// SPDX-License-Identifier: MPL-2.0

use crate::cache::CacheError;
use crate::cache::schema::SCHEMA;
use crate::config::{APP_NAME, ORPHAN_ENTITY_SECS, STREAM_STALE_SECS};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Handle to the cache database for a specific user
#[derive(Clone)]
pub struct CacheDb {
    conn: Arc<Mutex<Connection>>,
}

impl CacheDb {
    /// Open or create the cache database for a user
    /// Path: ~/.local/share/slipway/{user_id}/cache.db
    pub fn open(user_id: &str) -> Result<Self, CacheError> {
        Self::open_at(&Self::cache_path(user_id)?)
    }

    /// Open or create a cache database at an explicit path
    pub fn open_at(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Path(format!("failed to create cache dir: {}", e)))?;
        }

        let conn = Connection::open(path).map_err(CacheError::db("open", path.display().to_string()))?;
        Self::migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, used by tests
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory().map_err(CacheError::db("open", ":memory:"))?;
        Self::migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run schema migrations
    fn migrate(conn: &Connection) -> Result<(), CacheError> {
        // Execute the schema (all CREATE IF NOT EXISTS)
        conn.execute_batch(SCHEMA)
            .map_err(CacheError::db("migrate", "schema"))?;
        Ok(())
    }

    /// Get XDG data directory for cache
    fn cache_path(user_id: &str) -> Result<PathBuf, CacheError> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| CacheError::Path("could not find data directory".to_string()))?;

        // Sanitize the pubkey for the filesystem
        let safe_id = user_id.replace([':', '/'], "_");

        Ok(data_dir.join(APP_NAME).join(safe_id).join("cache.db"))
    }

    /// Access connection for operations
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("cache lock poisoned")
    }

    /// Get current unix timestamp
    pub fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    /// Drop all cached rows. Used on logout/reset.
    pub fn clear_all(&self) -> Result<(), CacheError> {
        let conn = self.conn();

        for table in [
            "streams",
            "post_details",
            "post_counts",
            "post_relationships",
            "post_tags",
            "user_details",
            "user_counts",
            "user_relationships",
            "user_tags",
            "notifications_meta",
            "hot_tags",
        ] {
            conn.execute(&format!("DELETE FROM {}", table), [])
                .map_err(CacheError::db("clear_all", table))?;
        }

        Ok(())
    }

    /// Cleanup old entries with sensible defaults:
    /// - Stream records: 24 hours (presentation order changes constantly)
    /// - Synced entities: 7 days past their sync TTL
    /// - Locally authored records are never pruned
    pub fn cleanup_stale(&self) -> Result<(), CacheError> {
        let conn = self.conn();
        let now = Self::now();

        let stream_cutoff = now - STREAM_STALE_SECS;
        conn.execute("DELETE FROM streams WHERE updated_at < ?", [stream_cutoff])
            .map_err(CacheError::db("cleanup_stale", "streams"))?;

        // Hot-tag snapshots go stale on the same schedule as streams
        conn.execute("DELETE FROM hot_tags WHERE updated_at < ?", [stream_cutoff])
            .map_err(CacheError::db("cleanup_stale", "hot_tags"))?;

        let entity_cutoff = now - ORPHAN_ENTITY_SECS;
        conn.execute(
            r#"
            DELETE FROM post_details
            WHERE sync_ttl < ? AND sync_status != 'local'
            "#,
            [entity_cutoff],
        )
        .map_err(CacheError::db("cleanup_stale", "post_details"))?;

        conn.execute(
            "DELETE FROM post_counts WHERE id NOT IN (SELECT id FROM post_details)",
            [],
        )
        .map_err(CacheError::db("cleanup_stale", "post_counts"))?;
        conn.execute(
            "DELETE FROM post_relationships WHERE id NOT IN (SELECT id FROM post_details)",
            [],
        )
        .map_err(CacheError::db("cleanup_stale", "post_relationships"))?;
        conn.execute(
            "DELETE FROM post_tags WHERE id NOT IN (SELECT id FROM post_details)",
            [],
        )
        .map_err(CacheError::db("cleanup_stale", "post_tags"))?;

        // Users no post references, past TTL
        conn.execute(
            r#"
            DELETE FROM user_details
            WHERE sync_ttl < ? AND sync_status != 'local'
            AND id NOT IN (SELECT owner_id FROM post_details)
            "#,
            [entity_cutoff],
        )
        .map_err(CacheError::db("cleanup_stale", "user_details"))?;

        for table in ["user_counts", "user_relationships", "user_tags"] {
            conn.execute(
                &format!(
                    "DELETE FROM {} WHERE id NOT IN (SELECT id FROM user_details)",
                    table
                ),
                [],
            )
            .map_err(CacheError::db("cleanup_stale", table))?;
        }

        Ok(())
    }
}
