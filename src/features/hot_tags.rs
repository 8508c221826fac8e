// SPDX-License-Identifier: MPL-2.0

use crate::cache::{CacheDb, HotTagCache, snapshot_key};
use crate::features::FeatureError;
use crate::remote::{HotTag, Reach, RemoteIndex, Timeframe};
use crate::runtime;
use std::sync::Arc;
use tracing::debug;

/// Default leaderboard size when the caller does not cap it.
const DEFAULT_LIMIT: usize = 20;

/// How many tagger IDs to carry per tag.
const LIMIT_TAGGERS: usize = 5;

/// Hot-tag leaderboard orchestrator.
///
/// A non-critical enhancement surface: every internal error is swallowed
/// (debug-logged) and degrades to an empty list, so a broken leaderboard
/// never takes a screen down with it.
pub struct HotTags<R: RemoteIndex> {
    db: CacheDb,
    remote: Arc<R>,
}

impl<R: RemoteIndex> HotTags<R> {
    pub fn new(db: CacheDb, remote: Arc<R>) -> Self {
        Self { db, remote }
    }

    /// Current leaderboard for a timeframe/reach pair.
    ///
    /// `skip > 0` always goes live. A cache hit applies the optional limit
    /// slice and still triggers a background refresh of the snapshot.
    pub async fn get(
        &self,
        timeframe: Timeframe,
        reach: Reach,
        skip: usize,
        limit: Option<usize>,
    ) -> Vec<HotTag> {
        match self.get_inner(timeframe, reach, skip, limit).await {
            Ok(tags) => tags,
            Err(e) => {
                debug!(
                    timeframe = timeframe.as_str(),
                    reach = reach.as_str(),
                    error = %e,
                    "hot tags degraded to empty"
                );
                Vec::new()
            }
        }
    }

    async fn get_inner(
        &self,
        timeframe: Timeframe,
        reach: Reach,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Vec<HotTag>, FeatureError> {
        let key = snapshot_key(timeframe, reach);
        let fetch_limit = limit.unwrap_or(DEFAULT_LIMIT);

        if skip == 0
            && let Some(cached) = HotTagCache::new(&self.db).get(&key)?
        {
            let page = match limit {
                Some(n) => cached.into_iter().take(n).collect(),
                None => cached,
            };
            self.spawn_refresh(key, timeframe, reach, fetch_limit);
            return Ok(page);
        }

        let fetched = self
            .remote
            .hot_tags(timeframe, reach, skip, fetch_limit, LIMIT_TAGGERS)
            .await?;

        if skip == 0 {
            // Empty snapshots are never persisted (put is a no-op for them)
            HotTagCache::new(&self.db).put(&key, &fetched)?;
        }

        Ok(fetched)
    }

    fn spawn_refresh(&self, key: String, timeframe: Timeframe, reach: Reach, limit: usize) {
        let db = self.db.clone();
        let remote = Arc::clone(&self.remote);

        runtime::spawn(async move {
            match remote.hot_tags(timeframe, reach, 0, limit, LIMIT_TAGGERS).await {
                Ok(tags) => {
                    if let Err(e) = HotTagCache::new(&db).put(&key, &tags) {
                        debug!(key = %key, error = %e, "hot tag refresh write failed");
                    }
                }
                Err(e) => debug!(key = %key, error = %e, "hot tag refresh failed"),
            }
        });
    }
}
