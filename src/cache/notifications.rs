// SPDX-License-Identifier: MPL-2.0

use crate::cache::{CacheDb, CacheError};
use rusqlite::params;

/// Per-user "last read" watermark for notifications.
///
/// The remote homeserver copy is the cross-device source of truth; this
/// table is a read-through cache of it. The watermark is monotonic: the
/// MAX in the upsert makes rollback impossible at the table level.
pub struct NotificationsMetaCache<'a> {
    db: &'a CacheDb,
}

impl<'a> NotificationsMetaCache<'a> {
    pub fn new(db: &'a CacheDb) -> Self {
        Self { db }
    }

    /// Last-read timestamp for a user; 0 when never set.
    pub fn last_read(&self, user_id: &str) -> Result<i64, CacheError> {
        let conn = self.db.conn();

        conn.query_row(
            "SELECT last_read FROM notifications_meta WHERE user_id = ?",
            [user_id],
            |row| row.get(0),
        )
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(0),
            other => Err(CacheError::db("last_read", user_id)(other)),
        })
    }

    /// Advance the watermark. A timestamp older than the stored one is a
    /// no-op, never a rollback.
    pub fn advance_last_read(&self, user_id: &str, timestamp: i64) -> Result<(), CacheError> {
        let conn = self.db.conn();

        conn.execute(
            r#"
            INSERT INTO notifications_meta (user_id, last_read)
            VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET
                last_read = MAX(notifications_meta.last_read, excluded.last_read)
            "#,
            params![user_id, timestamp],
        )
        .map_err(CacheError::db("advance_last_read", user_id))?;

        Ok(())
    }
}
