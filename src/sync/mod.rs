// SPDX-License-Identifier: MPL-2.0

mod engine;
mod guard;

pub use engine::{Page, PageSource, StreamSync};
pub use guard::{RequestGuard, RequestTicket};

use crate::cache::CacheError;
use crate::remote::RemoteError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
