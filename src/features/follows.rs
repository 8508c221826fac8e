// SPDX-License-Identifier: MPL-2.0

use crate::cache::UserRecord;
use crate::features::FeatureError;
use crate::remote::{FollowList, RemoteIndex};
use crate::sync::StreamSync;
use std::sync::Arc;

/// Follow-graph pages for a profile screen.
///
/// Follow lists are ID streams like any other: the cache-first slice logic
/// is shared with post streams, only the fetch and the hydration differ.
pub struct Follows<R: RemoteIndex> {
    engine: Arc<StreamSync<R>>,
}

impl<R: RemoteIndex> Follows<R> {
    pub fn new(engine: Arc<StreamSync<R>>) -> Self {
        Self { engine }
    }

    /// Accounts `user_id` follows, as full user records.
    pub async fn following(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<UserRecord>, FeatureError> {
        self.list(FollowList::Following, user_id, skip, limit).await
    }

    /// Accounts following `user_id`, as full user records.
    pub async fn followers(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<UserRecord>, FeatureError> {
        self.list(FollowList::Followers, user_id, skip, limit).await
    }

    async fn list(
        &self,
        list: FollowList,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<UserRecord>, FeatureError> {
        let key = format!("{}:{user_id}", list.as_str());

        let remote = Arc::clone(self.engine.remote());
        let owner = user_id.to_string();
        let fetch = move |skip: usize, limit: usize| {
            let remote = Arc::clone(&remote);
            let owner = owner.clone();
            async move {
                let ids = remote.follow_ids(list, &owner, skip, limit).await?;
                Ok(ids)
            }
        };

        let page = self.engine.slice_with(key, skip, limit, fetch).await?;
        let records = self.engine.hydrate_users(&page.ids).await?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheDb, StreamCache};
    use crate::remote::testing::MockIndex;
    use std::sync::atomic::Ordering;

    fn feature(remote: MockIndex) -> Follows<MockIndex> {
        let db = CacheDb::open_in_memory().unwrap();
        let engine = StreamSync::new(db, Arc::new(remote), None);
        Follows::new(Arc::new(engine))
    }

    fn remote(feature: &Follows<MockIndex>) -> &MockIndex {
        feature.engine.remote()
    }

    #[tokio::test]
    async fn test_following_hydrates_full_records() {
        let feature = feature(MockIndex::with_follows(vec![
            "alice".to_string(),
            "bob".to_string(),
        ]));

        let records = feature.following("carol", 0, 10).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "alice");
        assert_eq!(records[0].details.name, "ALICE");
    }

    #[tokio::test]
    async fn test_lists_are_keyed_per_direction_and_user() {
        let feature = feature(MockIndex::with_follows(vec!["alice".to_string()]));

        feature.following("carol", 0, 1).await.unwrap();
        feature.followers("carol", 0, 1).await.unwrap();

        let streams = StreamCache::new(feature.engine.db());
        assert!(streams.get("following:carol").unwrap().is_some());
        assert!(streams.get("followers:carol").unwrap().is_some());
        assert!(streams.get("following:dave").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cached_first_page_skips_the_follow_fetch() {
        let feature = feature(MockIndex::with_follows(vec!["alice".to_string()]));
        StreamCache::new(feature.engine.db())
            .upsert("followers:carol", &["alice".to_string()])
            .unwrap();

        let records = feature.followers("carol", 0, 1).await.unwrap();

        assert_eq!(records.len(), 1);
        // The ID list came from cache; only hydration hit the remote
        assert_eq!(remote(&feature).follow_calls.load(Ordering::SeqCst), 0);
        assert_eq!(remote(&feature).by_ids_calls.load(Ordering::SeqCst), 1);
    }
}
