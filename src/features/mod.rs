// SPDX-License-Identifier: MPL-2.0

mod follows;
mod hot_tags;
mod notifications;

pub use follows::Follows;
pub use hot_tags::HotTags;
pub use notifications::Notifications;

use crate::cache::CacheError;
use crate::remote::RemoteError;
use crate::sync::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
