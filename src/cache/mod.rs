// SPDX-License-Identifier: MPL-2.0

mod db;
mod hot_tags;
mod notifications;
mod posts;
mod schema;
mod streams;
mod users;

pub use db::CacheDb;
pub use hot_tags::{HotTagCache, snapshot_key};
pub use notifications::NotificationsMetaCache;
pub use posts::{PostCache, PostEdit, PostRecord, SyncStatus};
pub use streams::{StreamCache, StreamRecord};
pub use users::{UserCache, UserRecord};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("database error during {op} for {key:?}: {source}")]
    Database {
        op: &'static str,
        key: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found")]
    NotFound,
    #[error("database path error: {0}")]
    Path(String),
}

impl CacheError {
    /// Wrap a rusqlite error with the failing operation and key so callers
    /// can decide between fatal and degrade-to-no-cache handling.
    pub(crate) fn db(
        op: &'static str,
        key: impl Into<String>,
    ) -> impl FnOnce(rusqlite::Error) -> CacheError {
        let key = key.into();
        move |source| CacheError::Database { op, key, source }
    }
}
