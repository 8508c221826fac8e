// SPDX-License-Identifier: MPL-2.0

/// SQL schema for the cache database
pub const SCHEMA: &str = r#"
-- Database version for migrations
PRAGMA user_version = 1;

-- streams: ordered composite-ID lists keyed by stream id
-- (upsert replaces the whole list; the table does no merging)
CREATE TABLE IF NOT EXISTS streams (
    stream_id TEXT PRIMARY KEY,
    ids_json TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_streams_updated ON streams(updated_at);

-- post_details: core post data, composite-ID keyed
CREATE TABLE IF NOT EXISTS post_details (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    local_id TEXT NOT NULL,
    content TEXT NOT NULL,
    kind TEXT NOT NULL,
    uri TEXT NOT NULL,
    indexed_at INTEGER NOT NULL,
    attachments_json TEXT,
    sync_status TEXT NOT NULL DEFAULT 'synced',
    created_at INTEGER NOT NULL,
    sync_ttl INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_post_details_owner ON post_details(owner_id);
CREATE INDEX IF NOT EXISTS idx_post_details_ttl ON post_details(sync_ttl);

CREATE TABLE IF NOT EXISTS post_counts (
    id TEXT PRIMARY KEY,
    tags INTEGER NOT NULL DEFAULT 0,
    unique_tags INTEGER NOT NULL DEFAULT 0,
    replies INTEGER NOT NULL DEFAULT 0,
    reposts INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS post_relationships (
    id TEXT PRIMARY KEY,
    replied TEXT,
    reposted TEXT,
    mentioned_json TEXT
);

CREATE TABLE IF NOT EXISTS post_tags (
    id TEXT PRIMARY KEY,
    tags_json TEXT NOT NULL
);

-- user_details: pubkey keyed
CREATE TABLE IF NOT EXISTS user_details (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    bio TEXT,
    image TEXT,
    links_json TEXT,
    status TEXT,
    indexed_at INTEGER NOT NULL,
    sync_status TEXT NOT NULL DEFAULT 'synced',
    created_at INTEGER NOT NULL,
    sync_ttl INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_user_details_ttl ON user_details(sync_ttl);

CREATE TABLE IF NOT EXISTS user_counts (
    id TEXT PRIMARY KEY,
    followers INTEGER NOT NULL DEFAULT 0,
    following INTEGER NOT NULL DEFAULT 0,
    posts INTEGER NOT NULL DEFAULT 0,
    tags INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS user_relationships (
    id TEXT PRIMARY KEY,
    following INTEGER NOT NULL DEFAULT 0,
    followed_by INTEGER NOT NULL DEFAULT 0,
    muted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_user_relationships_muted ON user_relationships(muted);

CREATE TABLE IF NOT EXISTS user_tags (
    id TEXT PRIMARY KEY,
    tags_json TEXT NOT NULL
);

-- notifications_meta: per-user read watermark
CREATE TABLE IF NOT EXISTS notifications_meta (
    user_id TEXT PRIMARY KEY,
    last_read INTEGER NOT NULL DEFAULT 0
);

-- hot_tags: leaderboard snapshots keyed by "<timeframe>:<reach>"
CREATE TABLE IF NOT EXISTS hot_tags (
    snapshot_key TEXT PRIMARY KEY,
    tags_json TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;
