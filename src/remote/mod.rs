// SPDX-License-Identifier: MPL-2.0

mod client;
#[cfg(test)]
pub(crate) mod testing;
mod types;

pub use client::IndexClient;
pub use types::{
    ContentKind, FollowList, HotTag, NotificationView, PostCounts, PostDetails, PostRelationships,
    PostView, Reach, StreamQuery, StreamSort, TagView, Timeframe, UserCounts, UserDetails,
    UserLink, UserRelationship, UserView,
};

use chrono::{DateTime, Utc};
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("index returned status {0}")]
    Status(u16),
    #[error("invalid url: {0}")]
    Url(String),
}

/// Structured outcome for polling-style calls where the caller needs to
/// tell "try again" (timeout) apart from "give up" (not found) without
/// treating either as an exception.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Success(T),
    Timeout,
    NotFound,
}

/// Drive a timeout-retries-immediately polling loop bounded by an explicit
/// expiry. The expiry is re-checked on every iteration, never only at
/// entry, so a slow request cannot spin the loop past its deadline.
pub async fn long_poll<T, F, Fut>(
    expiry: DateTime<Utc>,
    mut op: F,
) -> Result<FetchOutcome<T>, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<FetchOutcome<T>, RemoteError>>,
{
    loop {
        if Utc::now() >= expiry {
            return Ok(FetchOutcome::Timeout);
        }
        match op().await? {
            FetchOutcome::Timeout => continue,
            outcome => return Ok(outcome),
        }
    }
}

/// Query surface of the remote index.
///
/// The sync engine and the feature orchestrators are generic over this
/// trait; [`IndexClient`] is the HTTP implementation and tests substitute
/// recording mocks. Empty results are `Ok(vec![])`, never errors.
pub trait RemoteIndex: Send + Sync + 'static {
    /// One slice of a post stream, newest first.
    fn stream_posts(
        &self,
        query: &StreamQuery,
        viewer_id: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<PostView>, RemoteError>> + Send;

    /// Batched detail fetch for specific posts (cache-miss hydration).
    fn posts_by_ids(
        &self,
        post_ids: &[String],
        viewer_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<PostView>, RemoteError>> + Send;

    /// Batched detail fetch for specific users.
    fn users_by_ids(
        &self,
        user_ids: &[String],
        viewer_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<UserView>, RemoteError>> + Send;

    /// One slice of a follower/following list: bare user IDs.
    fn follow_ids(
        &self,
        list: FollowList,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<String>, RemoteError>> + Send;

    /// Hot-tag leaderboard for a timeframe/reach pair.
    fn hot_tags(
        &self,
        timeframe: Timeframe,
        reach: Reach,
        skip: usize,
        limit: usize,
        limit_taggers: usize,
    ) -> impl Future<Output = Result<Vec<HotTag>, RemoteError>> + Send;

    /// Notifications strictly older than a timestamp.
    fn notifications(
        &self,
        user_id: &str,
        older_than: i64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<NotificationView>, RemoteError>> + Send;

    /// Count of notifications newer than a timestamp.
    fn notification_count(
        &self,
        user_id: &str,
        since: i64,
    ) -> impl Future<Output = Result<u64, RemoteError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_long_poll_expired_before_first_call() {
        let calls = Cell::new(0u32);
        let expiry = Utc::now() - Duration::seconds(1);

        let outcome = long_poll(expiry, || {
            calls.set(calls.get() + 1);
            async { Ok(FetchOutcome::Success(42)) }
        })
        .await
        .unwrap();

        // Expiry is checked before every request, including the first
        assert_eq!(outcome, FetchOutcome::Timeout);
        assert_eq!(calls.get(), 0);
    }

    #[tokio::test]
    async fn test_long_poll_retries_timeouts_until_success() {
        let calls = Cell::new(0u32);
        let expiry = Utc::now() + Duration::seconds(30);

        let outcome = long_poll(expiry, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Ok(FetchOutcome::Timeout)
                } else {
                    Ok(FetchOutcome::Success("indexed"))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(outcome, FetchOutcome::Success("indexed"));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_long_poll_not_found_gives_up() {
        let expiry = Utc::now() + Duration::seconds(30);

        let outcome: FetchOutcome<i32> = long_poll(expiry, || async { Ok(FetchOutcome::NotFound) })
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::NotFound);
    }
}
