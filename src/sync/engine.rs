// SPDX-License-Identifier: MPL-2.0

//! Stream synchronization engine.
//!
//! Given a stream key and a pagination cursor, decides cache-hit vs.
//! cache-miss vs. partial-hit, persists newly fetched data, and keeps the
//! foreground read fast by pushing re-validation into a fire-and-forget
//! background refresh.
//!
//! Only the first page of a stream is cache-eligible: a `skip > 0` read
//! always goes remote so stale tails are never served. Concurrent misses
//! on the same key may double-fetch; that is safe because every write is
//! an idempotent last-write-wins replacement, never an increment.

use crate::cache::{CacheDb, PostCache, PostRecord, StreamCache, UserCache, UserRecord};
use crate::remote::{PostView, RemoteIndex, StreamQuery};
use crate::runtime;
use crate::sync::SyncError;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Where a page was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
    Cache,
    Remote,
}

/// One page of composite IDs plus the advanced cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub ids: Vec<String>,
    /// Skip value for the next page request
    pub next_skip: usize,
    pub has_more: bool,
    pub source: PageSource,
}

/// The core orchestrator between the persistent cache tables and the
/// remote index.
pub struct StreamSync<R: RemoteIndex> {
    db: CacheDb,
    remote: Arc<R>,
    viewer_id: Option<String>,
}

impl<R: RemoteIndex> StreamSync<R> {
    pub fn new(db: CacheDb, remote: Arc<R>, viewer_id: Option<String>) -> Self {
        Self {
            db,
            remote,
            viewer_id,
        }
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    pub fn viewer_id(&self) -> Option<&str> {
        self.viewer_id.as_deref()
    }

    /// Next page of a post stream. Fetched detail records are persisted
    /// alongside the ID list so follow-up single-post reads hit the cache.
    pub async fn post_slice(
        &self,
        query: &StreamQuery,
        skip: usize,
        limit: usize,
    ) -> Result<Page, SyncError> {
        let remote = Arc::clone(&self.remote);
        let db = self.db.clone();
        let viewer = self.viewer_id.clone();
        let query = query.clone();
        let key = query.key();

        let fetch = move |skip: usize, limit: usize| {
            let remote = Arc::clone(&remote);
            let db = db.clone();
            let viewer = viewer.clone();
            let query = query.clone();
            async move {
                let posts = remote
                    .stream_posts(&query, viewer.as_deref(), skip, limit)
                    .await?;
                if !posts.is_empty() {
                    PostCache::new(&db).store_batch(&posts)?;
                }
                let ids: Vec<String> = posts.iter().map(PostView::composite_id).collect();
                Ok(ids)
            }
        };

        self.slice_with(key, skip, limit, fetch).await
    }

    /// Shared cache-first slice logic. `fetch` retrieves one remote slice,
    /// persists any entity details it carries, and returns the slice's IDs
    /// in presentation order.
    pub async fn slice_with<F, Fut>(
        &self,
        stream_key: String,
        skip: usize,
        limit: usize,
        fetch: F,
    ) -> Result<Page, SyncError>
    where
        F: Fn(usize, usize) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<String>, SyncError>> + Send + 'static,
    {
        if skip == 0 {
            let cached = StreamCache::new(&self.db).get(&stream_key)?;
            if let Some(record) = cached
                && record.ids.len() >= limit
            {
                let ids: Vec<String> = record.ids[..limit].to_vec();
                // Serve the fast cached page, re-validate behind it
                self.spawn_refresh(stream_key, limit, fetch);
                return Ok(Page {
                    ids,
                    next_skip: limit,
                    has_more: true,
                    source: PageSource::Cache,
                });
            }
        }

        let fetched = fetch(skip, limit).await?;

        let streams = StreamCache::new(&self.db);
        if skip == 0 {
            // The first page replaces any stale cached first page. An empty
            // first page is persisted too: a confirmed-empty stream is a
            // valid terminal state, distinct from "no cache entry yet".
            streams.upsert(&stream_key, &fetched)?;
        } else if !fetched.is_empty() {
            let mut merged = streams
                .get(&stream_key)?
                .map(|record| record.ids)
                .unwrap_or_default();
            let seen: HashSet<String> = merged.iter().cloned().collect();
            merged.extend(fetched.iter().filter(|id| !seen.contains(*id)).cloned());
            streams.upsert(&stream_key, &merged)?;
        }

        let has_more = fetched.len() == limit && limit > 0;
        Ok(Page {
            next_skip: skip + fetched.len(),
            has_more,
            ids: fetched,
            source: PageSource::Remote,
        })
    }

    /// Fire-and-forget refresh-ahead after a cache hit. Re-fetches the
    /// logical first page and overwrites the cached record only when it
    /// differs. Failures are debug-logged, never surfaced; the caller
    /// already holds a valid, if slightly stale, page. Overlapping
    /// refreshes on one key are tolerated (last write wins on the same
    /// logical query).
    fn spawn_refresh<F, Fut>(&self, stream_key: String, limit: usize, fetch: F)
    where
        F: Fn(usize, usize) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<String>, SyncError>> + Send + 'static,
    {
        let db = self.db.clone();
        runtime::spawn(async move {
            let fresh = match fetch(0, limit).await {
                Ok(fresh) => fresh,
                Err(e) => {
                    debug!(stream = %stream_key, error = %e, "background refresh fetch failed");
                    return;
                }
            };

            let streams = StreamCache::new(&db);
            let head = match streams.get(&stream_key) {
                Ok(record) => record
                    .map(|r| r.ids.into_iter().take(limit).collect::<Vec<_>>())
                    .unwrap_or_default(),
                Err(e) => {
                    debug!(stream = %stream_key, error = %e, "background refresh read failed");
                    return;
                }
            };

            if fresh != head
                && let Err(e) = streams.upsert(&stream_key, &fresh)
            {
                debug!(stream = %stream_key, error = %e, "background refresh write failed");
            }
        });
    }

    /// Resolve post IDs to full records, fetching only the details missing
    /// locally in one batched call. Order follows the input IDs.
    pub async fn hydrate_posts(&self, ids: &[String]) -> Result<Vec<PostRecord>, SyncError> {
        let cache = PostCache::new(&self.db);
        let cached = cache.get_batch(ids)?;

        let have: HashSet<&str> = cached.iter().map(|r| r.id.as_str()).collect();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !have.contains(id.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() {
            return Ok(cached);
        }

        let fetched = self
            .remote
            .posts_by_ids(&missing, self.viewer_id.as_deref())
            .await?;
        if !fetched.is_empty() {
            cache.store_batch(&fetched)?;
        }

        Ok(cache.get_batch(ids)?)
    }

    /// Same as [`Self::hydrate_posts`] for user records.
    pub async fn hydrate_users(&self, ids: &[String]) -> Result<Vec<UserRecord>, SyncError> {
        let cache = UserCache::new(&self.db);
        let cached = cache.get_batch(ids)?;

        let have: HashSet<&str> = cached.iter().map(|r| r.id.as_str()).collect();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !have.contains(id.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() {
            return Ok(cached);
        }

        let fetched = self
            .remote
            .users_by_ids(&missing, self.viewer_id.as_deref())
            .await?;
        if !fetched.is_empty() {
            cache.store_batch(&fetched)?;
        }

        Ok(cache.get_batch(ids)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testing::{MockIndex, post};
    use std::sync::atomic::Ordering;

    fn engine(remote: MockIndex) -> StreamSync<MockIndex> {
        let db = CacheDb::open_in_memory().unwrap();
        StreamSync::new(db, Arc::new(remote), Some("viewer".to_string()))
    }

    fn seed_stream(engine: &StreamSync<MockIndex>, key: &str, count: usize) -> Vec<String> {
        let ids: Vec<String> = (0..count).map(|i| format!("u{i}:p{i}")).collect();
        StreamCache::new(engine.db()).upsert(key, &ids).unwrap();
        ids
    }

    #[tokio::test]
    async fn test_first_page_served_from_cache_without_remote_calls() {
        let engine = engine(MockIndex::default());
        let query = StreamQuery::timeline();
        let ids = seed_stream(&engine, &query.key(), 20);

        let page = engine.post_slice(&query, 0, 10).await.unwrap();

        assert_eq!(page.ids, ids[..10].to_vec());
        assert_eq!(page.source, PageSource::Cache);
        assert_eq!(page.next_skip, 10);
        // Zero foreground remote calls on a cache hit (the queued
        // background refresh has not run on this single-threaded runtime)
        assert_eq!(engine.remote().stream_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_skip_always_bypasses_cache() {
        let stream: Vec<PostView> = (0..30).map(|i| post(&format!("u{i}"), &format!("p{i}"))).collect();
        let engine = engine(MockIndex::with_stream(stream));
        let query = StreamQuery::timeline();
        seed_stream(&engine, &query.key(), 20);

        let page = engine.post_slice(&query, 10, 10).await.unwrap();

        assert_eq!(page.source, PageSource::Remote);
        assert_eq!(engine.remote().stream_calls.load(Ordering::SeqCst), 1);
        assert_eq!(page.next_skip, 20);
    }

    #[tokio::test]
    async fn test_miss_fetches_persists_and_advances_cursor() {
        let stream: Vec<PostView> = (1..=5).map(|i| post(&format!("u{i}"), &format!("p{i}"))).collect();
        let engine = engine(MockIndex::with_stream(stream));
        let query = StreamQuery::timeline().with_tags(["bitcoin", "lightning"]);

        let page = engine.post_slice(&query, 0, 10).await.unwrap();

        let expected: Vec<String> = (1..=5).map(|i| format!("u{i}:p{i}")).collect();
        assert_eq!(page.ids, expected);
        assert_eq!(page.next_skip, 5);
        assert!(!page.has_more);
        assert_eq!(page.source, PageSource::Remote);

        // The ID list is persisted under the stream key...
        let record = StreamCache::new(engine.db())
            .get("timeline:all:all:bitcoin,lightning")
            .unwrap()
            .unwrap();
        assert_eq!(record.ids, expected);

        // ...and so are the full detail records
        let detail = PostCache::new(engine.db()).get("u3:p3").unwrap();
        assert_eq!(detail.details.content, "post p3");
    }

    #[tokio::test]
    async fn test_insufficient_cache_falls_through_to_remote() {
        let stream: Vec<PostView> = (0..10).map(|i| post(&format!("u{i}"), &format!("p{i}"))).collect();
        let engine = engine(MockIndex::with_stream(stream));
        let query = StreamQuery::timeline();
        seed_stream(&engine, &query.key(), 3);

        let page = engine.post_slice(&query, 0, 10).await.unwrap();

        assert_eq!(page.source, PageSource::Remote);
        assert_eq!(page.ids.len(), 10);
        assert_eq!(engine.remote().stream_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_remote_result_is_terminal_and_persisted() {
        let engine = engine(MockIndex::default());
        let query = StreamQuery::timeline();

        let page = engine.post_slice(&query, 0, 10).await.unwrap();

        assert!(page.ids.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.next_skip, 0);

        // Confirmed-empty, not "no cache entry"
        let record = StreamCache::new(engine.db()).get(&query.key()).unwrap();
        assert!(matches!(record, Some(r) if r.ids.is_empty()));
    }

    #[tokio::test]
    async fn test_later_pages_append_deduplicated() {
        let stream: Vec<PostView> = (0..8).map(|i| post(&format!("u{i}"), &format!("p{i}"))).collect();
        let engine = engine(MockIndex::with_stream(stream));
        let query = StreamQuery::timeline();

        engine.post_slice(&query, 0, 5).await.unwrap();
        // Overlapping second page (remote shifted underneath us)
        engine.post_slice(&query, 3, 5).await.unwrap();

        let record = StreamCache::new(engine.db()).get(&query.key()).unwrap().unwrap();
        let expected: Vec<String> = (0..8).map(|i| format!("u{i}:p{i}")).collect();
        assert_eq!(record.ids, expected);
    }

    #[tokio::test]
    async fn test_background_refresh_overwrites_changed_first_page() {
        let stream: Vec<PostView> = (0..10).map(|i| post(&format!("f{i}"), &format!("p{i}"))).collect();
        let engine = engine(MockIndex::with_stream(stream));
        let query = StreamQuery::timeline();
        let stale = seed_stream(&engine, &query.key(), 10);

        let page = engine.post_slice(&query, 0, 10).await.unwrap();
        assert_eq!(page.ids, stale);

        // Let the queued refresh task run
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        let record = StreamCache::new(engine.db()).get(&query.key()).unwrap().unwrap();
        let fresh: Vec<String> = (0..10).map(|i| format!("f{i}:p{i}")).collect();
        assert_eq!(record.ids, fresh);
        assert_eq!(engine.remote().stream_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hydrate_posts_fetches_only_missing() {
        let engine = engine(MockIndex::default());
        PostCache::new(engine.db())
            .store_batch(&[post("a", "1")])
            .unwrap();

        let ids = vec!["a:1".to_string(), "b:2".to_string(), "c:3".to_string()];
        let records = engine.hydrate_posts(&ids).await.unwrap();

        let got: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(got, vec!["a:1", "b:2", "c:3"]);

        let args = engine.remote().by_ids_args.lock().unwrap();
        assert_eq!(args.as_slice(), &[vec!["b:2".to_string(), "c:3".to_string()]]);
    }

    #[tokio::test]
    async fn test_hydrate_posts_fully_cached_never_calls_remote() {
        let engine = engine(MockIndex::default());
        PostCache::new(engine.db())
            .store_batch(&[post("a", "1"), post("b", "2")])
            .unwrap();

        let ids = vec!["a:1".to_string(), "b:2".to_string()];
        engine.hydrate_posts(&ids).await.unwrap();

        assert_eq!(engine.remote().by_ids_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hydrate_users_round_trip() {
        let engine = engine(MockIndex::default());

        let ids = vec!["alice".to_string(), "bob".to_string()];
        let records = engine.hydrate_users(&ids).await.unwrap();

        let got: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(got, vec!["alice", "bob"]);
        assert_eq!(records[0].details.name, "ALICE");
    }
}
