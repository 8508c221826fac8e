// SPDX-License-Identifier: MPL-2.0

use crate::cache::posts::SyncStatus;
use crate::cache::{CacheDb, CacheError};
use crate::config::ENTITY_SYNC_TTL_SECS;
use crate::remote::{TagView, UserCounts, UserDetails, UserLink, UserRelationship, UserView};
use rusqlite::{Transaction, params};
use std::collections::{HashMap, HashSet};

/// A cached user: the remote index's shape plus local bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    /// Owner public key
    pub id: String,
    pub details: UserDetails,
    pub counts: UserCounts,
    pub relationship: UserRelationship,
    pub tags: Vec<TagView>,
    pub sync_status: SyncStatus,
    pub created_at: i64,
    pub sync_ttl: i64,
}

impl UserRecord {
    pub fn is_stale(&self) -> bool {
        CacheDb::now() > self.sync_ttl
    }
}

/// Cache operations for users
pub struct UserCache<'a> {
    db: &'a CacheDb,
}

impl<'a> UserCache<'a> {
    pub fn new(db: &'a CacheDb) -> Self {
        Self { db }
    }

    /// Store a batch of fetched users in one transaction.
    pub fn store_batch(&self, users: &[UserView]) -> Result<(), CacheError> {
        let mut conn = self.db.conn();
        let tx = conn
            .transaction()
            .map_err(CacheError::db("user_store_batch", "begin"))?;
        let now = CacheDb::now();

        for user in users {
            Self::upsert_one(&tx, user, now)?;
        }

        tx.commit()
            .map_err(CacheError::db("user_store_batch", "commit"))?;
        Ok(())
    }

    fn upsert_one(tx: &Transaction, user: &UserView, now: i64) -> Result<(), CacheError> {
        let id = &user.details.id;
        let links_json = serde_json::to_string(&user.details.links)?;
        let tags_json = serde_json::to_string(&user.tags)?;

        tx.execute(
            r#"
            INSERT INTO user_details (
                id, name, bio, image, links_json, status, indexed_at,
                sync_status, created_at, sync_ttl
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'synced', ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                bio = excluded.bio,
                image = excluded.image,
                links_json = excluded.links_json,
                status = excluded.status,
                indexed_at = excluded.indexed_at,
                sync_status = excluded.sync_status,
                sync_ttl = excluded.sync_ttl
            "#,
            params![
                id,
                user.details.name,
                user.details.bio,
                user.details.image,
                links_json,
                user.details.status,
                user.details.indexed_at,
                now,
                now + ENTITY_SYNC_TTL_SECS,
            ],
        )
        .map_err(CacheError::db("user_upsert", id.clone()))?;

        tx.execute(
            r#"
            INSERT INTO user_counts (id, followers, following, posts, tags)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                followers = excluded.followers,
                following = excluded.following,
                posts = excluded.posts,
                tags = excluded.tags
            "#,
            params![
                id,
                user.counts.followers,
                user.counts.following,
                user.counts.posts,
                user.counts.tags,
            ],
        )
        .map_err(CacheError::db("user_upsert", id.clone()))?;

        tx.execute(
            r#"
            INSERT INTO user_relationships (id, following, followed_by, muted)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                following = excluded.following,
                followed_by = excluded.followed_by,
                muted = excluded.muted
            "#,
            params![
                id,
                user.relationship.following as i32,
                user.relationship.followed_by as i32,
                user.relationship.muted as i32,
            ],
        )
        .map_err(CacheError::db("user_upsert", id.clone()))?;

        tx.execute(
            r#"
            INSERT INTO user_tags (id, tags_json)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET tags_json = excluded.tags_json
            "#,
            params![id, tags_json],
        )
        .map_err(CacheError::db("user_upsert", id.clone()))?;

        Ok(())
    }

    /// Get a user by public key
    pub fn get(&self, id: &str) -> Result<UserRecord, CacheError> {
        let conn = self.db.conn();

        let query = format!("{} WHERE d.id = ?", SELECT_USER_BASE);
        let mut stmt = conn
            .prepare(&query)
            .map_err(CacheError::db("user_get", id))?;

        stmt.query_row([id], Self::row_to_record)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => CacheError::NotFound,
                other => CacheError::db("user_get", id)(other),
            })
    }

    /// Get multiple users, preserving input order; missing IDs are skipped.
    pub fn get_batch(&self, ids: &[String]) -> Result<Vec<UserRecord>, CacheError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.db.conn();

        let placeholders: Vec<_> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
        let query = format!("{} WHERE d.id IN ({})", SELECT_USER_BASE, placeholders.join(", "));

        let mut stmt = conn
            .prepare(&query)
            .map_err(CacheError::db("user_get_batch", ids.join(",")))?;

        let sql_params: Vec<&dyn rusqlite::ToSql> =
            ids.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

        let mut rows = stmt
            .query(sql_params.as_slice())
            .map_err(CacheError::db("user_get_batch", ids.join(",")))?;

        let mut found = HashMap::new();
        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => return Err(CacheError::db("user_get_batch", ids.join(","))(e)),
            };
            let record = Self::row_to_record(row)
                .map_err(CacheError::db("user_get_batch", ids.join(",")))?;
            found.insert(record.id.clone(), record);
        }

        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    /// Assemble the set of muted owner IDs for the mute filters.
    pub fn muted_ids(&self) -> Result<HashSet<String>, CacheError> {
        let conn = self.db.conn();

        let mut stmt = conn
            .prepare("SELECT id FROM user_relationships WHERE muted = 1")
            .map_err(CacheError::db("user_muted_ids", "user_relationships"))?;

        let mut rows = stmt
            .query([])
            .map_err(CacheError::db("user_muted_ids", "user_relationships"))?;

        let mut muted = HashSet::new();
        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => return Err(CacheError::db("user_muted_ids", "user_relationships")(e)),
            };
            muted.insert(
                row.get::<_, String>(0)
                    .map_err(CacheError::db("user_muted_ids", "user_relationships"))?,
            );
        }

        Ok(muted)
    }

    /// Local optimistic mute toggle (the write-through to the homeserver is
    /// the caller's concern).
    pub fn set_muted(&self, id: &str, muted: bool) -> Result<(), CacheError> {
        let conn = self.db.conn();

        conn.execute(
            r#"
            INSERT INTO user_relationships (id, muted) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET muted = excluded.muted
            "#,
            params![id, muted as i32],
        )
        .map_err(CacheError::db("user_set_muted", id))?;

        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<UserRecord, rusqlite::Error> {
        let links_json: Option<String> = row.get(4)?;
        let tags_json: Option<String> = row.get(17)?;

        let links: Vec<UserLink> = links_json
            .as_ref()
            .and_then(|j| serde_json::from_str(j).ok())
            .unwrap_or_default();
        let tags: Vec<TagView> = tags_json
            .as_ref()
            .and_then(|j| serde_json::from_str(j).ok())
            .unwrap_or_default();

        let sync_status: String = row.get(7)?;

        Ok(UserRecord {
            id: row.get(0)?,
            details: UserDetails {
                id: row.get(0)?,
                name: row.get(1)?,
                bio: row.get(2)?,
                image: row.get(3)?,
                links,
                status: row.get(5)?,
                indexed_at: row.get(6)?,
            },
            sync_status: match sync_status.as_str() {
                "local" => SyncStatus::Local,
                _ => SyncStatus::Synced,
            },
            created_at: row.get(8)?,
            sync_ttl: row.get(9)?,
            counts: UserCounts {
                followers: row.get::<_, Option<u32>>(10)?.unwrap_or(0),
                following: row.get::<_, Option<u32>>(11)?.unwrap_or(0),
                posts: row.get::<_, Option<u32>>(12)?.unwrap_or(0),
                tags: row.get::<_, Option<u32>>(13)?.unwrap_or(0),
            },
            relationship: UserRelationship {
                following: row.get::<_, Option<i32>>(14)?.unwrap_or(0) != 0,
                followed_by: row.get::<_, Option<i32>>(15)?.unwrap_or(0) != 0,
                muted: row.get::<_, Option<i32>>(16)?.unwrap_or(0) != 0,
            },
            tags,
        })
    }
}

const SELECT_USER_BASE: &str = r#"
    SELECT
        d.id, d.name, d.bio, d.image, d.links_json, d.status, d.indexed_at,
        d.sync_status, d.created_at, d.sync_ttl,
        c.followers, c.following, c.posts, c.tags,
        r.following, r.followed_by, r.muted,
        t.tags_json
    FROM user_details d
    LEFT JOIN user_counts c ON d.id = c.id
    LEFT JOIN user_relationships r ON d.id = r.id
    LEFT JOIN user_tags t ON d.id = t.id
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str) -> UserView {
        UserView {
            details: UserDetails {
                id: id.to_string(),
                name: name.to_string(),
                indexed_at: 1_700_000_000,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_store_and_get_round_trip() {
        let db = CacheDb::open_in_memory().unwrap();
        let users = UserCache::new(&db);

        let mut view = user("alice", "Alice");
        view.relationship.following = true;
        users.store_batch(std::slice::from_ref(&view)).unwrap();

        let record = users.get("alice").unwrap();
        assert_eq!(record.details.name, "Alice");
        assert!(record.relationship.following);
        assert!(!record.relationship.muted);
    }

    #[test]
    fn test_get_batch_preserves_order() {
        let db = CacheDb::open_in_memory().unwrap();
        let users = UserCache::new(&db);

        users
            .store_batch(&[user("carol", "Carol"), user("bob", "Bob")])
            .unwrap();

        let ids = vec!["bob".to_string(), "carol".to_string()];
        let records = users.get_batch(&ids).unwrap();
        let got: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(got, vec!["bob", "carol"]);
    }

    #[test]
    fn test_muted_set_assembly() {
        let db = CacheDb::open_in_memory().unwrap();
        let users = UserCache::new(&db);

        let mut spammer = user("spammer", "Spam");
        spammer.relationship.muted = true;
        users.store_batch(&[spammer, user("alice", "Alice")]).unwrap();
        users.set_muted("troll", true).unwrap();

        let muted = users.muted_ids().unwrap();
        assert!(muted.contains("spammer"));
        assert!(muted.contains("troll"));
        assert!(!muted.contains("alice"));
    }

    #[test]
    fn test_unmute_clears_flag() {
        let db = CacheDb::open_in_memory().unwrap();
        let users = UserCache::new(&db);

        users.set_muted("spammer", true).unwrap();
        users.set_muted("spammer", false).unwrap();
        assert!(users.muted_ids().unwrap().is_empty());
    }
}
