// SPDX-License-Identifier: MPL-2.0

pub const APP_NAME: &str = "slipway";

/// Default base URL of the remote index service.
pub const DEFAULT_INDEX_URL: &str = "https://index.slipway.app";

/// API version segment prepended to every index path.
pub const API_VERSION: &str = "v0";

/// How long a synced entity record is considered fresh (seconds).
pub const ENTITY_SYNC_TTL_SECS: i64 = 5 * 60;

/// Stream records older than this are pruned by `cleanup_stale` (the
/// presentation order of a feed goes stale quickly).
pub const STREAM_STALE_SECS: i64 = 24 * 60 * 60;

/// TTL-expired entities are pruned once they are this far past expiry.
pub const ORPHAN_ENTITY_SECS: i64 = 7 * 24 * 60 * 60;

/// Content marker left behind when a post is soft-deleted but still has
/// tags or relationships pointing at it.
pub const TOMBSTONE: &str = "[DELETED]";

/// Homeserver path under which the notification watermark is persisted.
pub const LAST_READ_PATH: &str = "/pub/slipway.app/last_read";
