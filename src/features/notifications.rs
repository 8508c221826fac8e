// SPDX-License-Identifier: MPL-2.0

use crate::cache::{CacheDb, NotificationsMetaCache};
use crate::config::LAST_READ_PATH;
use crate::features::FeatureError;
use crate::homeserver::{Action, Homeserver};
use crate::remote::{NotificationView, RemoteIndex};
use crate::runtime;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Notification orchestrator: unread badge plus the inbox listing.
///
/// The unread count is derived from the per-user last-read watermark. The
/// watermark's source of truth is the user's homeserver record so other
/// devices agree on read state; the local table mirrors it.
pub struct Notifications<R: RemoteIndex, H: Homeserver> {
    db: CacheDb,
    remote: Arc<R>,
    homeserver: Arc<H>,
    unread: AtomicU64,
}

impl<R: RemoteIndex, H: Homeserver> Notifications<R, H> {
    pub fn new(db: CacheDb, remote: Arc<R>, homeserver: Arc<H>) -> Self {
        Self {
            db,
            remote,
            homeserver,
            unread: AtomicU64::new(0),
        }
    }

    /// Last count observed by [`poll`](Self::poll), without a network trip.
    pub fn unread(&self) -> u64 {
        self.unread.load(Ordering::SeqCst)
    }

    /// Refresh the unread count from the index.
    pub async fn poll(&self, user_id: &str) -> Result<u64, FeatureError> {
        let last_read = NotificationsMetaCache::new(&self.db).last_read(user_id)?;
        let count = self.remote.notification_count(user_id, last_read).await?;
        self.unread.store(count, Ordering::SeqCst);
        Ok(count)
    }

    /// Inbox page, newest first. `older_than` pages backwards through time.
    pub async fn list(
        &self,
        user_id: &str,
        older_than: Option<i64>,
        limit: usize,
    ) -> Result<Vec<NotificationView>, FeatureError> {
        let older_than = older_than.unwrap_or(i64::MAX);
        let notes = self.remote.notifications(user_id, older_than, limit).await?;
        Ok(notes)
    }

    /// Advance the watermark to now and clear the badge.
    ///
    /// The local watermark moves first, then the homeserver write is
    /// dispatched without being awaited; a failed write only delays other
    /// devices, it never resurrects the badge here.
    pub fn mark_all_as_read(&self, user_id: &str) -> Result<(), FeatureError> {
        let now = CacheDb::now();
        NotificationsMetaCache::new(&self.db).advance_last_read(user_id, now)?;

        let homeserver = Arc::clone(&self.homeserver);
        runtime::spawn(async move {
            let body = json!({ "timestamp": now });
            if let Err(e) = homeserver
                .request(Action::Put, LAST_READ_PATH, Some(body))
                .await
            {
                debug!(error = %e, "last_read write-through failed");
            }
        });

        self.unread.store(0, Ordering::SeqCst);
        Ok(())
    }
}
