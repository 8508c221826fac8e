// SPDX-License-Identifier: MPL-2.0

//! Recording stand-in for the remote index, shared by the engine and
//! orchestrator tests.

use crate::ids;
use crate::remote::types::{
    FollowList, HotTag, NotificationView, PostDetails, PostView, Reach, StreamQuery, Timeframe,
    UserDetails, UserView,
};
use crate::remote::{RemoteError, RemoteIndex};
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

pub(crate) fn post(author: &str, local: &str) -> PostView {
    PostView {
        details: PostDetails {
            id: local.to_string(),
            author: author.to_string(),
            content: format!("post {local}"),
            kind: "short".to_string(),
            uri: format!("slipway://{author}/posts/{local}"),
            indexed_at: 1_700_000_000,
            attachments: None,
        },
        ..Default::default()
    }
}

pub(crate) fn user(id: &str) -> UserView {
    UserView {
        details: UserDetails {
            id: id.to_string(),
            name: id.to_uppercase(),
            indexed_at: 1_700_000_000,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub(crate) fn hot_tag(label: &str, count: u32) -> HotTag {
    HotTag {
        label: label.to_string(),
        tagged_count: count,
        taggers_count: count,
        taggers_id: vec![],
    }
}

#[derive(Default)]
pub(crate) struct MockIndex {
    pub stream: Vec<PostView>,
    pub hot: Vec<HotTag>,
    pub follows: Vec<String>,
    pub notes: Vec<NotificationView>,
    /// Every call fails with a network error when set
    pub fail: bool,

    pub stream_calls: AtomicUsize,
    pub hot_calls: AtomicUsize,
    pub follow_calls: AtomicUsize,
    pub by_ids_calls: AtomicUsize,
    pub by_ids_args: Mutex<Vec<Vec<String>>>,
    pub count_calls: AtomicUsize,
}

impl MockIndex {
    pub fn with_stream(stream: Vec<PostView>) -> Self {
        Self {
            stream,
            ..Default::default()
        }
    }

    pub fn with_hot(hot: Vec<HotTag>) -> Self {
        Self {
            hot,
            ..Default::default()
        }
    }

    pub fn with_follows(follows: Vec<String>) -> Self {
        Self {
            follows,
            ..Default::default()
        }
    }

    pub fn with_notes(notes: Vec<NotificationView>) -> Self {
        Self {
            notes,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn check(&self) -> Result<(), RemoteError> {
        if self.fail {
            Err(RemoteError::Network("mock failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl RemoteIndex for MockIndex {
    async fn stream_posts(
        &self,
        _query: &StreamQuery,
        _viewer_id: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<PostView>, RemoteError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.stream.iter().skip(skip).take(limit).cloned().collect())
    }

    async fn posts_by_ids(
        &self,
        post_ids: &[String],
        _viewer_id: Option<&str>,
    ) -> Result<Vec<PostView>, RemoteError> {
        self.by_ids_calls.fetch_add(1, Ordering::SeqCst);
        self.by_ids_args.lock().unwrap().push(post_ids.to_vec());
        self.check()?;
        Ok(post_ids
            .iter()
            .filter_map(|id| {
                let (owner, local) = ids::decode(id).ok()?;
                Some(post(owner, local))
            })
            .collect())
    }

    async fn users_by_ids(
        &self,
        user_ids: &[String],
        _viewer_id: Option<&str>,
    ) -> Result<Vec<UserView>, RemoteError> {
        self.by_ids_calls.fetch_add(1, Ordering::SeqCst);
        self.by_ids_args.lock().unwrap().push(user_ids.to_vec());
        self.check()?;
        Ok(user_ids.iter().map(|id| user(id)).collect())
    }

    async fn follow_ids(
        &self,
        _list: FollowList,
        _user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<String>, RemoteError> {
        self.follow_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.follows.iter().skip(skip).take(limit).cloned().collect())
    }

    async fn hot_tags(
        &self,
        _timeframe: Timeframe,
        _reach: Reach,
        skip: usize,
        limit: usize,
        _limit_taggers: usize,
    ) -> Result<Vec<HotTag>, RemoteError> {
        self.hot_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.hot.iter().skip(skip).take(limit).cloned().collect())
    }

    async fn notifications(
        &self,
        _user_id: &str,
        older_than: i64,
        limit: usize,
    ) -> Result<Vec<NotificationView>, RemoteError> {
        self.check()?;
        Ok(self
            .notes
            .iter()
            .filter(|n| n.timestamp < older_than)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn notification_count(&self, _user_id: &str, since: i64) -> Result<u64, RemoteError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.notes.iter().filter(|n| n.timestamp > since).count() as u64)
    }
}
