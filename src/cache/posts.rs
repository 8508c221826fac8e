// SPDX-License-Identifier: MPL-2.0

use crate::cache::{CacheDb, CacheError};
use crate::config::{ENTITY_SYNC_TTL_SECS, TOMBSTONE};
use crate::remote::{PostCounts, PostDetails, PostRelationships, PostView, TagView};
use rusqlite::{Transaction, params};
use std::collections::HashMap;

/// Whether a record originated locally (optimistic write awaiting the
/// index) or was fetched from the remote index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    Local,
    #[default]
    Synced,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Local => "local",
            SyncStatus::Synced => "synced",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "local" => SyncStatus::Local,
            _ => SyncStatus::Synced,
        }
    }
}

/// A cached post: the remote index's shape plus local bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    /// Composite ID (`<author>:<local id>`)
    pub id: String,
    pub details: PostDetails,
    pub counts: PostCounts,
    pub relationships: PostRelationships,
    pub tags: Vec<TagView>,
    pub sync_status: SyncStatus,
    pub created_at: i64,
    pub sync_ttl: i64,
}

impl PostRecord {
    pub fn is_stale(&self) -> bool {
        CacheDb::now() > self.sync_ttl
    }

    pub fn is_tombstone(&self) -> bool {
        self.details.content == TOMBSTONE
    }
}

/// Shallow-merge edit: only the provided sub-objects are replaced, the
/// rest of the record is untouched.
#[derive(Debug, Clone, Default)]
pub struct PostEdit {
    pub content: Option<String>,
    pub counts: Option<PostCounts>,
    pub relationships: Option<PostRelationships>,
    pub tags: Option<Vec<TagView>>,
}

/// Cache operations for posts
pub struct PostCache<'a> {
    db: &'a CacheDb,
}

impl<'a> PostCache<'a> {
    pub fn new(db: &'a CacheDb) -> Self {
        Self { db }
    }

    /// Store a batch of fetched posts in one transaction. All four entity
    /// tables are written together or not at all.
    pub fn store_batch(&self, posts: &[PostView]) -> Result<(), CacheError> {
        self.store_batch_with_status(posts, SyncStatus::Synced)
    }

    /// Store a locally authored post before the index has seen it.
    pub fn store_local(&self, post: &PostView) -> Result<(), CacheError> {
        self.store_batch_with_status(std::slice::from_ref(post), SyncStatus::Local)
    }

    fn store_batch_with_status(
        &self,
        posts: &[PostView],
        status: SyncStatus,
    ) -> Result<(), CacheError> {
        let mut conn = self.db.conn();
        let tx = conn
            .transaction()
            .map_err(CacheError::db("post_store_batch", "begin"))?;
        let now = CacheDb::now();

        for post in posts {
            Self::upsert_one(&tx, post, status, now)?;
        }

        tx.commit()
            .map_err(CacheError::db("post_store_batch", "commit"))?;
        Ok(())
    }

    fn upsert_one(
        tx: &Transaction,
        post: &PostView,
        status: SyncStatus,
        now: i64,
    ) -> Result<(), CacheError> {
        let id = post.composite_id();
        let attachments_json = post
            .details
            .attachments
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let mentioned_json = serde_json::to_string(&post.relationships.mentioned)?;
        let tags_json = serde_json::to_string(&post.tags)?;

        tx.execute(
            r#"
            INSERT INTO post_details (
                id, owner_id, local_id, content, kind, uri, indexed_at,
                attachments_json, sync_status, created_at, sync_ttl
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                kind = excluded.kind,
                uri = excluded.uri,
                indexed_at = excluded.indexed_at,
                attachments_json = excluded.attachments_json,
                sync_status = excluded.sync_status,
                sync_ttl = excluded.sync_ttl
            "#,
            params![
                id,
                post.details.author,
                post.details.id,
                post.details.content,
                post.details.kind,
                post.details.uri,
                post.details.indexed_at,
                attachments_json,
                status.as_str(),
                now,
                now + ENTITY_SYNC_TTL_SECS,
            ],
        )
        .map_err(CacheError::db("post_upsert", id.clone()))?;

        tx.execute(
            r#"
            INSERT INTO post_counts (id, tags, unique_tags, replies, reposts)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                tags = excluded.tags,
                unique_tags = excluded.unique_tags,
                replies = excluded.replies,
                reposts = excluded.reposts
            "#,
            params![
                id,
                post.counts.tags,
                post.counts.unique_tags,
                post.counts.replies,
                post.counts.reposts,
            ],
        )
        .map_err(CacheError::db("post_upsert", id.clone()))?;

        tx.execute(
            r#"
            INSERT INTO post_relationships (id, replied, reposted, mentioned_json)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                replied = excluded.replied,
                reposted = excluded.reposted,
                mentioned_json = excluded.mentioned_json
            "#,
            params![
                id,
                post.relationships.replied,
                post.relationships.reposted,
                mentioned_json,
            ],
        )
        .map_err(CacheError::db("post_upsert", id.clone()))?;

        tx.execute(
            r#"
            INSERT INTO post_tags (id, tags_json)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET tags_json = excluded.tags_json
            "#,
            params![id, tags_json],
        )
        .map_err(CacheError::db("post_upsert", id))?;

        Ok(())
    }

    /// Get a post by composite ID
    pub fn get(&self, id: &str) -> Result<PostRecord, CacheError> {
        let conn = self.db.conn();

        let query = format!("{} WHERE d.id = ?", SELECT_POST_BASE);
        let mut stmt = conn
            .prepare(&query)
            .map_err(CacheError::db("post_get", id))?;

        stmt.query_row([id], Self::row_to_record)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => CacheError::NotFound,
                other => CacheError::db("post_get", id)(other),
            })
    }

    /// Get multiple posts by composite ID, preserving the input order.
    /// Missing IDs are skipped; callers decide whether to hydrate them.
    pub fn get_batch(&self, ids: &[String]) -> Result<Vec<PostRecord>, CacheError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.db.conn();

        let placeholders: Vec<_> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
        let query = format!("{} WHERE d.id IN ({})", SELECT_POST_BASE, placeholders.join(", "));

        let mut stmt = conn
            .prepare(&query)
            .map_err(CacheError::db("post_get_batch", ids.join(",")))?;

        let sql_params: Vec<&dyn rusqlite::ToSql> =
            ids.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

        let mut rows = stmt
            .query(sql_params.as_slice())
            .map_err(CacheError::db("post_get_batch", ids.join(",")))?;

        let mut found = HashMap::new();
        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => return Err(CacheError::db("post_get_batch", ids.join(","))(e)),
            };
            let record = Self::row_to_record(row)
                .map_err(CacheError::db("post_get_batch", ids.join(",")))?;
            found.insert(record.id.clone(), record);
        }

        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    /// Shallow-merge edit of an existing record
    pub fn edit(&self, id: &str, edit: &PostEdit) -> Result<(), CacheError> {
        let mut conn = self.db.conn();
        let tx = conn
            .transaction()
            .map_err(CacheError::db("post_edit", id))?;

        if let Some(content) = &edit.content {
            let changed = tx
                .execute(
                    "UPDATE post_details SET content = ? WHERE id = ?",
                    params![content, id],
                )
                .map_err(CacheError::db("post_edit", id))?;
            if changed == 0 {
                return Err(CacheError::NotFound);
            }
        }

        if let Some(counts) = &edit.counts {
            tx.execute(
                r#"
                UPDATE post_counts
                SET tags = ?, unique_tags = ?, replies = ?, reposts = ?
                WHERE id = ?
                "#,
                params![counts.tags, counts.unique_tags, counts.replies, counts.reposts, id],
            )
            .map_err(CacheError::db("post_edit", id))?;
        }

        if let Some(rel) = &edit.relationships {
            let mentioned_json = serde_json::to_string(&rel.mentioned)?;
            tx.execute(
                r#"
                UPDATE post_relationships
                SET replied = ?, reposted = ?, mentioned_json = ?
                WHERE id = ?
                "#,
                params![rel.replied, rel.reposted, mentioned_json, id],
            )
            .map_err(CacheError::db("post_edit", id))?;
        }

        if let Some(tags) = &edit.tags {
            let tags_json = serde_json::to_string(tags)?;
            tx.execute(
                "UPDATE post_tags SET tags_json = ? WHERE id = ?",
                params![tags_json, id],
            )
            .map_err(CacheError::db("post_edit", id))?;
        }

        tx.commit().map_err(CacheError::db("post_edit", id))?;
        Ok(())
    }

    /// Delete a post. Hard delete only when nothing attaches to it: no tags
    /// on the record and no other post replying to or reposting it.
    /// Otherwise the content is replaced by a tombstone so replies, reposts
    /// and tags keep a valid target.
    pub fn delete(&self, id: &str) -> Result<(), CacheError> {
        let mut conn = self.db.conn();
        let tx = conn
            .transaction()
            .map_err(CacheError::db("post_delete", id))?;

        let has_tags: bool = tx
            .query_row(
                "SELECT tags_json != '[]' FROM post_tags WHERE id = ?",
                [id],
                |row| row.get(0),
            )
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(false),
                other => Err(CacheError::db("post_delete", id)(other)),
            })?;

        let referenced: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM post_relationships WHERE replied = ?1 OR reposted = ?1)",
                [id],
                |row| row.get(0),
            )
            .map_err(CacheError::db("post_delete", id))?;

        if has_tags || referenced {
            tx.execute(
                "UPDATE post_details SET content = ? WHERE id = ?",
                params![TOMBSTONE, id],
            )
            .map_err(CacheError::db("post_delete", id))?;
        } else {
            for table in ["post_details", "post_counts", "post_relationships", "post_tags"] {
                tx.execute(&format!("DELETE FROM {} WHERE id = ?", table), [id])
                    .map_err(CacheError::db("post_delete", id))?;
            }
        }

        tx.commit().map_err(CacheError::db("post_delete", id))?;
        Ok(())
    }

    /// Mark a local record as synced once the index confirms it.
    pub fn mark_synced(&self, id: &str) -> Result<(), CacheError> {
        let conn = self.db.conn();

        let changed = conn
            .execute(
                "UPDATE post_details SET sync_status = 'synced' WHERE id = ?",
                [id],
            )
            .map_err(CacheError::db("post_mark_synced", id))?;

        if changed == 0 {
            return Err(CacheError::NotFound);
        }
        Ok(())
    }

    /// Convert a database row to a PostRecord
    fn row_to_record(row: &rusqlite::Row) -> Result<PostRecord, rusqlite::Error> {
        let attachments_json: Option<String> = row.get(7)?;
        let mentioned_json: Option<String> = row.get(14)?;
        let tags_json: Option<String> = row.get(15)?;

        let attachments = attachments_json
            .as_ref()
            .and_then(|j| serde_json::from_str(j).ok());
        let mentioned: Vec<String> = mentioned_json
            .as_ref()
            .and_then(|j| serde_json::from_str(j).ok())
            .unwrap_or_default();
        let tags: Vec<TagView> = tags_json
            .as_ref()
            .and_then(|j| serde_json::from_str(j).ok())
            .unwrap_or_default();

        Ok(PostRecord {
            id: row.get(0)?,
            details: PostDetails {
                author: row.get(1)?,
                id: row.get(2)?,
                content: row.get(3)?,
                kind: row.get(4)?,
                uri: row.get(5)?,
                indexed_at: row.get(6)?,
                attachments,
            },
            sync_status: SyncStatus::from_str(&row.get::<_, String>(8)?),
            created_at: row.get(9)?,
            sync_ttl: row.get(10)?,
            counts: PostCounts {
                tags: row.get::<_, Option<u32>>(11)?.unwrap_or(0),
                unique_tags: row.get::<_, Option<u32>>(16)?.unwrap_or(0),
                replies: row.get::<_, Option<u32>>(17)?.unwrap_or(0),
                reposts: row.get::<_, Option<u32>>(18)?.unwrap_or(0),
            },
            relationships: PostRelationships {
                replied: row.get(12)?,
                reposted: row.get(13)?,
                mentioned,
            },
            tags,
        })
    }
}

const SELECT_POST_BASE: &str = r#"
    SELECT
        d.id, d.owner_id, d.local_id, d.content, d.kind, d.uri, d.indexed_at,
        d.attachments_json, d.sync_status, d.created_at, d.sync_ttl,
        c.tags, r.replied, r.reposted, r.mentioned_json, t.tags_json,
        c.unique_tags, c.replies, c.reposts
    FROM post_details d
    LEFT JOIN post_counts c ON d.id = c.id
    LEFT JOIN post_relationships r ON d.id = r.id
    LEFT JOIN post_tags t ON d.id = t.id
"#;
