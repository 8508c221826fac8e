// SPDX-License-Identifier: MPL-2.0

//! Owned views of the remote index's wire shapes.
//!
//! Raw JSON from the index is mapped into these types immediately at the
//! boundary so nothing else in the crate inspects loosely-typed values.

use crate::ids;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PostDetails {
    /// Record-local identifier (the part after the colon in a composite ID)
    pub id: String,
    /// Owner public key
    pub author: String,
    pub content: String,
    pub kind: String,
    pub uri: String,
    pub indexed_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostCounts {
    pub tags: u32,
    pub unique_tags: u32,
    pub replies: u32,
    pub reposts: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PostRelationships {
    /// Composite ID of the post this one replies to
    #[serde(default)]
    pub replied: Option<String>,
    /// Composite ID of the post this one reposts
    #[serde(default)]
    pub reposted: Option<String>,
    #[serde(default)]
    pub mentioned: Vec<String>,
}

impl PostRelationships {
    pub fn is_empty(&self) -> bool {
        self.replied.is_none() && self.reposted.is_none() && self.mentioned.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TagView {
    pub label: String,
    #[serde(default)]
    pub taggers: Vec<String>,
    #[serde(default)]
    pub taggers_count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PostView {
    pub details: PostDetails,
    #[serde(default)]
    pub counts: PostCounts,
    #[serde(default)]
    pub relationships: PostRelationships,
    #[serde(default)]
    pub tags: Vec<TagView>,
}

impl PostView {
    /// Composite ID this post is keyed by everywhere in the cache.
    pub fn composite_id(&self) -> String {
        ids::encode(&self.details.author, &self.details.id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserLink {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserDetails {
    /// Owner public key (user IDs have no local part)
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub links: Vec<UserLink>,
    #[serde(default)]
    pub status: Option<String>,
    pub indexed_at: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserCounts {
    pub followers: u32,
    pub following: u32,
    pub posts: u32,
    pub tags: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRelationship {
    pub following: bool,
    pub followed_by: bool,
    pub muted: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserView {
    pub details: UserDetails,
    #[serde(default)]
    pub counts: UserCounts,
    #[serde(default)]
    pub relationship: UserRelationship,
    #[serde(default)]
    pub tags: Vec<TagView>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HotTag {
    pub label: String,
    pub tagged_count: u32,
    pub taggers_count: u32,
    #[serde(default)]
    pub taggers_id: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationView {
    pub timestamp: i64,
    pub body: serde_json::Value,
}

/// Reach filter for streams and leaderboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Reach {
    #[default]
    All,
    Following,
    Friends,
}

impl Reach {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reach::All => "all",
            Reach::Following => "following",
            Reach::Friends => "friends",
        }
    }
}

/// Content-type filter for post streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentKind {
    #[default]
    All,
    Short,
    Long,
    Image,
    Video,
    Link,
    File,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::All => "all",
            ContentKind::Short => "short",
            ContentKind::Long => "long",
            ContentKind::Image => "image",
            ContentKind::Video => "video",
            ContentKind::Link => "link",
            ContentKind::File => "file",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamSort {
    #[default]
    Recent,
    Popularity,
}

impl StreamSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamSort::Recent => "recent",
            StreamSort::Popularity => "popularity",
        }
    }
}

/// Hot-tag leaderboard timeframe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timeframe {
    #[default]
    Today,
    ThisMonth,
    AllTime,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Today => "today",
            Timeframe::ThisMonth => "this_month",
            Timeframe::AllTime => "all_time",
        }
    }
}

/// Which side of the follow graph a user stream covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowList {
    Followers,
    Following,
}

impl FollowList {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowList::Followers => "followers",
            FollowList::Following => "following",
        }
    }
}

/// Everything that identifies one logical post stream: the feature, sort
/// mode, reach filter, content-type filter and tag filter. Renders both the
/// cache key and the remote query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamQuery {
    pub sort: StreamSort,
    pub reach: Reach,
    pub kind: ContentKind,
    pub tags: Vec<String>,
    /// Profile streams are scoped to a single author
    pub author: Option<String>,
}

impl StreamQuery {
    /// The home timeline with no filters.
    pub fn timeline() -> Self {
        Self::default()
    }

    pub fn with_reach(mut self, reach: Reach) -> Self {
        self.reach = reach;
        self
    }

    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_sort(mut self, sort: StreamSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn by_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Colon-joined stream key, e.g. `timeline:friends:video:tag1,tag2`.
    /// The sort segment is only rendered when it differs from the default
    /// so the common recent-first keys stay short.
    pub fn key(&self) -> String {
        let feature = match &self.author {
            Some(author) => format!("profile:{author}"),
            None => "timeline".to_string(),
        };

        let mut key = feature;
        if self.sort != StreamSort::Recent {
            key.push(':');
            key.push_str(self.sort.as_str());
        }
        key.push(':');
        key.push_str(self.reach.as_str());
        key.push(':');
        key.push_str(self.kind.as_str());
        if !self.tags.is_empty() {
            key.push(':');
            key.push_str(&self.tags.join(","));
        }

        key
    }
}
