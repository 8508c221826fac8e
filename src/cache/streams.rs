// SPDX-License-Identifier: MPL-2.0

use crate::cache::{CacheDb, CacheError};
use rusqlite::params;

/// A cached ordered ID list for one logical stream.
///
/// Order is presentation order. The list never contains duplicates; callers
/// compute merged lists before writing, the table itself does no merging.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    pub stream_id: String,
    pub ids: Vec<String>,
    pub updated_at: i64,
}

/// Cache operations for stream ID lists
pub struct StreamCache<'a> {
    db: &'a CacheDb,
}

impl<'a> StreamCache<'a> {
    pub fn new(db: &'a CacheDb) -> Self {
        Self { db }
    }

    /// Get a stream record. `None` means "no cache entry yet", which is
    /// distinct from a persisted empty list (a confirmed-empty stream).
    pub fn get(&self, stream_id: &str) -> Result<Option<StreamRecord>, CacheError> {
        let conn = self.db.conn();

        let mut stmt = conn
            .prepare("SELECT ids_json, updated_at FROM streams WHERE stream_id = ?")
            .map_err(CacheError::db("stream_get", stream_id))?;

        let row = stmt
            .query_row([stream_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(CacheError::db("stream_get", stream_id)(other)),
            })?;

        let Some((ids_json, updated_at)) = row else {
            return Ok(None);
        };

        let ids: Vec<String> = serde_json::from_str(&ids_json)?;
        Ok(Some(StreamRecord {
            stream_id: stream_id.to_string(),
            ids,
            updated_at,
        }))
    }

    /// Replace-or-insert the full ordered list for a stream. Writing the
    /// same list twice leaves the record identical to one write.
    pub fn upsert(&self, stream_id: &str, ids: &[String]) -> Result<(), CacheError> {
        let conn = self.db.conn();
        let ids_json = serde_json::to_string(ids)?;

        conn.execute(
            r#"
            INSERT INTO streams (stream_id, ids_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(stream_id) DO UPDATE SET
                ids_json = excluded.ids_json,
                updated_at = excluded.updated_at
            "#,
            params![stream_id, ids_json, CacheDb::now()],
        )
        .map_err(CacheError::db("stream_upsert", stream_id))?;

        Ok(())
    }

    /// Drop one stream record
    pub fn clear(&self, stream_id: &str) -> Result<(), CacheError> {
        let conn = self.db.conn();

        conn.execute("DELETE FROM streams WHERE stream_id = ?", [stream_id])
            .map_err(CacheError::db("stream_clear", stream_id))?;

        Ok(())
    }
}
