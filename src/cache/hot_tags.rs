// SPDX-License-Identifier: MPL-2.0

use crate::cache::{CacheDb, CacheError};
use crate::remote::{HotTag, Reach, Timeframe};
use rusqlite::params;

/// Snapshot key for a hot-tag leaderboard, e.g. `today:all`.
pub fn snapshot_key(timeframe: Timeframe, reach: Reach) -> String {
    format!("{}:{}", timeframe.as_str(), reach.as_str())
}

/// Cache operations for hot-tag leaderboard snapshots
pub struct HotTagCache<'a> {
    db: &'a CacheDb,
}

impl<'a> HotTagCache<'a> {
    pub fn new(db: &'a CacheDb) -> Self {
        Self { db }
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<HotTag>>, CacheError> {
        let conn = self.db.conn();

        let tags_json = conn
            .query_row(
                "SELECT tags_json FROM hot_tags WHERE snapshot_key = ?",
                [key],
                |row| row.get::<_, String>(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(CacheError::db("hot_tags_get", key)(other)),
            })?;

        let Some(tags_json) = tags_json else {
            return Ok(None);
        };

        Ok(Some(serde_json::from_str(&tags_json)?))
    }

    /// Store a snapshot. An empty list is never persisted: an empty remote
    /// result means "no data yet", and caching it would mask a later
    /// successful fetch.
    pub fn put(&self, key: &str, tags: &[HotTag]) -> Result<(), CacheError> {
        if tags.is_empty() {
            return Ok(());
        }

        let conn = self.db.conn();
        let tags_json = serde_json::to_string(tags)?;

        conn.execute(
            r#"
            INSERT INTO hot_tags (snapshot_key, tags_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(snapshot_key) DO UPDATE SET
                tags_json = excluded.tags_json,
                updated_at = excluded.updated_at
            "#,
            params![key, tags_json, CacheDb::now()],
        )
        .map_err(CacheError::db("hot_tags_put", key))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(label: &str, count: u32) -> HotTag {
        HotTag {
            label: label.to_string(),
            tagged_count: count,
            taggers_count: count,
            taggers_id: vec![],
        }
    }

    #[test]
    fn test_put_and_get_snapshot() {
        let db = CacheDb::open_in_memory().unwrap();
        let cache = HotTagCache::new(&db);
        let key = snapshot_key(Timeframe::Today, Reach::All);
        assert_eq!(key, "today:all");

        cache.put(&key, &[tag("rust", 10), tag("bitcoin", 5)]).unwrap();

        let tags = cache.get(&key).unwrap().unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].label, "rust");
    }

    #[test]
    fn test_empty_snapshot_is_never_persisted() {
        let db = CacheDb::open_in_memory().unwrap();
        let cache = HotTagCache::new(&db);

        cache.put("today:all", &[]).unwrap();
        assert!(cache.get("today:all").unwrap().is_none());
    }

    #[test]
    fn test_empty_put_does_not_overwrite_existing() {
        let db = CacheDb::open_in_memory().unwrap();
        let cache = HotTagCache::new(&db);

        cache.put("today:all", &[tag("rust", 10)]).unwrap();
        cache.put("today:all", &[]).unwrap();

        let tags = cache.get("today:all").unwrap().unwrap();
        assert_eq!(tags[0].label, "rust");
    }
}
