// SPDX-License-Identifier: MPL-2.0

//! Local-first stream cache and sync layer for the Slipway social client.
//!
//! Screens read from the persistent cache first and re-validate against
//! the remote index in the background. The crate owns the composite ID
//! codec, the SQLite cache tables, the index client, the cache-first
//! stream sync engine, mute filtering, and the feature orchestrators
//! built on top (hot tags, notifications, follow lists).

pub mod cache;
pub mod config;
pub mod features;
pub mod filters;
pub mod homeserver;
pub mod ids;
pub mod remote;
pub(crate) mod runtime;
pub mod sync;

pub use cache::CacheDb;
pub use remote::{IndexClient, RemoteIndex, StreamQuery};
pub use sync::{Page, PageSource, RequestGuard, StreamSync};
