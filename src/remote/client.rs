// SPDX-License-Identifier: MPL-2.0

use crate::config::{API_VERSION, DEFAULT_INDEX_URL};
use crate::remote::types::{
    FollowList, HotTag, NotificationView, PostView, Reach, StreamQuery, StreamSort, Timeframe,
    UserView,
};
use crate::remote::{FetchOutcome, RemoteError, RemoteIndex, long_poll};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

/// Stateless HTTP client for the remote index. No caching lives here; the
/// sync engine decides what to persist.
pub struct IndexClient {
    http: reqwest::Client,
    base: Url,
}

impl IndexClient {
    pub fn new() -> Self {
        Self::with_base(DEFAULT_INDEX_URL).expect("default index url is valid")
    }

    pub fn with_base(base_url: &str) -> Result<Self, RemoteError> {
        let base = Url::parse(base_url).map_err(|e| RemoteError::Url(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(RemoteError::Url(format!("cannot be a base: {base_url}")));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    /// Build `<base>/<version>/<segments...>`, percent-encoding each path
    /// segment individually.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| RemoteError::Url("base url has no path".to_string()))?;
            path.pop_if_empty();
            path.push(API_VERSION);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// GET returning a JSON array. A 404 on a list endpoint means "nothing
    /// indexed yet" and maps to an empty list, never an error.
    async fn get_list<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, RemoteError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(RemoteError::Status(resp.status().as_u16()));
        }

        resp.json::<Vec<T>>()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    /// POST with a JSON body, returning a JSON array with the same empty
    /// semantics as [`Self::get_list`].
    async fn post_list<T: DeserializeOwned>(
        &self,
        url: Url,
        body: serde_json::Value,
    ) -> Result<Vec<T>, RemoteError> {
        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(RemoteError::Status(resp.status().as_u16()));
        }

        resp.json::<Vec<T>>()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    /// Wait until the index has ingested a user record, bounded by `expiry`.
    ///
    /// Request timeouts retry immediately (the index may still be
    /// ingesting); a definitive 404 means the record is unknown and the
    /// loop gives up.
    pub async fn poll_user_indexed(
        &self,
        user_id: &str,
        expiry: DateTime<Utc>,
    ) -> Result<FetchOutcome<UserView>, RemoteError> {
        long_poll(expiry, || self.fetch_user_outcome(user_id)).await
    }

    async fn fetch_user_outcome(
        &self,
        user_id: &str,
    ) -> Result<FetchOutcome<UserView>, RemoteError> {
        let url = self.endpoint(&["user", user_id])?;

        let resp = match self.http.get(url).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => return Ok(FetchOutcome::Timeout),
            Err(e) => return Err(RemoteError::Network(e.to_string())),
        };

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(FetchOutcome::NotFound),
            status if status.is_success() => {
                let user = resp
                    .json::<UserView>()
                    .await
                    .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
                Ok(FetchOutcome::Success(user))
            }
            status => Err(RemoteError::Status(status.as_u16())),
        }
    }
}

impl Default for IndexClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteIndex for IndexClient {
    async fn stream_posts(
        &self,
        query: &StreamQuery,
        viewer_id: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<PostView>, RemoteError> {
        let mut url = self.endpoint(&["stream", "posts"])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("sorting", query.sort.as_str())
                .append_pair("source", query.reach.as_str())
                .append_pair("kind", query.kind.as_str())
                .append_pair("skip", &skip.to_string())
                .append_pair("limit", &limit.to_string());
            if !query.tags.is_empty() {
                pairs.append_pair("tags", &query.tags.join(","));
            }
            if let Some(author) = &query.author {
                pairs.append_pair("author_id", author);
            }
            if let Some(viewer) = viewer_id {
                pairs.append_pair("viewer_id", viewer);
            }
        }

        self.get_list(url).await
    }

    async fn posts_by_ids(
        &self,
        post_ids: &[String],
        viewer_id: Option<&str>,
    ) -> Result<Vec<PostView>, RemoteError> {
        let url = self.endpoint(&["stream", "posts", "by_ids"])?;
        let body = serde_json::json!({ "post_ids": post_ids, "viewer_id": viewer_id });
        self.post_list(url, body).await
    }

    async fn users_by_ids(
        &self,
        user_ids: &[String],
        viewer_id: Option<&str>,
    ) -> Result<Vec<UserView>, RemoteError> {
        let url = self.endpoint(&["stream", "users", "by_ids"])?;
        let body = serde_json::json!({ "user_ids": user_ids, "viewer_id": viewer_id });
        self.post_list(url, body).await
    }

    async fn follow_ids(
        &self,
        list: FollowList,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<String>, RemoteError> {
        let mut url = self.endpoint(&["user", user_id, list.as_str()])?;
        url.query_pairs_mut()
            .append_pair("skip", &skip.to_string())
            .append_pair("limit", &limit.to_string());

        self.get_list(url).await
    }

    async fn hot_tags(
        &self,
        timeframe: Timeframe,
        reach: Reach,
        skip: usize,
        limit: usize,
        limit_taggers: usize,
    ) -> Result<Vec<HotTag>, RemoteError> {
        let mut url = self.endpoint(&["tags", "hot"])?;
        url.query_pairs_mut()
            .append_pair("timeframe", timeframe.as_str())
            .append_pair("reach", reach.as_str())
            .append_pair("skip_tags", &skip.to_string())
            .append_pair("limit_tags", &limit.to_string())
            .append_pair("limit_taggers", &limit_taggers.to_string());

        self.get_list(url).await
    }

    async fn notifications(
        &self,
        user_id: &str,
        older_than: i64,
        limit: usize,
    ) -> Result<Vec<NotificationView>, RemoteError> {
        let mut url = self.endpoint(&["user", user_id, "notifications"])?;
        url.query_pairs_mut()
            .append_pair("older_than", &older_than.to_string())
            .append_pair("limit", &limit.to_string());

        self.get_list(url).await
    }

    async fn notification_count(&self, user_id: &str, since: i64) -> Result<u64, RemoteError> {
        let mut url = self.endpoint(&["user", user_id, "notifications", "count"])?;
        url.query_pairs_mut()
            .append_pair("since", &since.to_string());

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(0);
        }
        if !resp.status().is_success() {
            return Err(RemoteError::Status(resp.status().as_u16()));
        }

        let count = resp
            .json::<CountResponse>()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        Ok(count.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_percent_encodes_segments() {
        let client = IndexClient::with_base("https://index.example.com").unwrap();
        let url = client
            .endpoint(&["post", "alice", "at://did:plc:abc/record/1"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://index.example.com/v0/post/alice/at:%2F%2Fdid:plc:abc%2Frecord%2F1"
        );
    }

    #[test]
    fn test_endpoint_respects_base_path() {
        let client = IndexClient::with_base("https://example.com/index/").unwrap();
        let url = client.endpoint(&["stream", "posts"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/index/v0/stream/posts");
    }

    #[test]
    fn test_with_base_rejects_opaque_urls() {
        assert!(IndexClient::with_base("mailto:index@example.com").is_err());
        assert!(IndexClient::with_base("not a url").is_err());
    }
}
