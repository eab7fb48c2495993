// Bluesky AT Protocol client: createSession auth, paged getFeed reads,
// and the repo writes used by feed registration.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use papersky_common::Post;

const LINK_FEATURE_TYPE: &str = "app.bsky.richtext.facet#link";

pub struct BlueskyClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_attempts: u32,
    retry_base: Duration,
    session: Option<Session>,
}

struct Session {
    access_jwt: String,
    did: String,
}

impl BlueskyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_base: Duration::from_millis(500),
            session: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_policy(mut self, max_attempts: u32, retry_base: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_base = retry_base;
        self
    }

    /// Authenticate with an app password and retain the session token.
    pub async fn login(&mut self, identifier: &str, app_password: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!(
                "{}/xrpc/com.atproto.server.createSession",
                self.base_url
            ))
            .json(&json!({ "identifier": identifier, "password": app_password }))
            .timeout(self.timeout)
            .send()
            .await
            .context("createSession request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Bluesky login failed {status}: {body}");
        }

        let session: SessionResponse = resp
            .json()
            .await
            .context("Failed to parse createSession response")?;

        info!(did = session.did.as_str(), "bluesky: session created");
        self.session = Some(Session {
            access_jwt: session.access_jwt,
            did: session.did,
        });
        Ok(())
    }

    fn session(&self) -> Result<&Session> {
        self.session.as_ref().context("Not logged in")
    }

    /// Pull up to `pages` pages of `limit` posts from a feed, following
    /// cursors. Any page failing (after retries) aborts the whole fetch:
    /// no posts, no run.
    pub async fn fetch_feed(&self, feed_uri: &str, limit: u32, pages: u32) -> Result<Vec<Post>> {
        let session = self.session()?;
        let mut posts = Vec::new();
        let mut dropped = 0usize;
        let mut cursor: Option<String> = None;

        for page in 0..pages {
            let response = self
                .get_feed_page(session, feed_uri, limit, cursor.as_deref())
                .await
                .with_context(|| format!("getFeed page {page} failed"))?;

            for item in response.feed {
                match convert_post(item.post) {
                    Some(post) => posts.push(post),
                    None => dropped += 1,
                }
            }

            cursor = response.cursor;
            if cursor.is_none() {
                break; // upstream exhausted
            }
        }

        info!(
            feed = feed_uri,
            posts = posts.len(),
            dropped,
            "bluesky: feed fetched"
        );
        Ok(posts)
    }

    async fn get_feed_page(
        &self,
        session: &Session,
        feed_uri: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<FeedResponse> {
        let mut attempt = 0;
        loop {
            match self
                .try_get_feed_page(session, feed_uri, limit, cursor)
                .await
            {
                Ok(page) => return Ok(page),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(e);
                    }
                    let backoff = self.retry_base * 2u32.pow(attempt - 1);
                    warn!(attempt, error = %e, "bluesky: getFeed failed, retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn try_get_feed_page(
        &self,
        session: &Session,
        feed_uri: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<FeedResponse> {
        let mut query: Vec<(&str, String)> = vec![
            ("feed", feed_uri.to_string()),
            ("limit", limit.min(100).to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }

        let resp = self
            .client
            .get(format!("{}/xrpc/app.bsky.feed.getFeed", self.base_url))
            .query(&query)
            .bearer_auth(&session.access_jwt)
            .timeout(self.timeout)
            .send()
            .await
            .context("getFeed request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Bluesky API error {status}: {body}");
        }

        resp.json().await.context("Failed to parse getFeed response")
    }

    /// Upload an image blob, returning the blob ref for record embedding.
    pub async fn upload_blob(&self, data: Vec<u8>, mime: &str) -> Result<serde_json::Value> {
        let session = self.session()?;
        let resp = self
            .client
            .post(format!("{}/xrpc/com.atproto.repo.uploadBlob", self.base_url))
            .bearer_auth(&session.access_jwt)
            .header("Content-Type", mime)
            .body(data)
            .timeout(self.timeout)
            .send()
            .await
            .context("uploadBlob request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Blob upload failed {status}: {body}");
        }

        let uploaded: BlobResponse = resp
            .json()
            .await
            .context("Failed to parse uploadBlob response")?;
        Ok(uploaded.blob)
    }

    /// Write the feed generator record that points the network at the
    /// hosting service. Returns the record URI.
    pub async fn put_feed_generator(
        &self,
        rkey: &str,
        record: serde_json::Value,
    ) -> Result<String> {
        let session = self.session()?;
        let resp = self
            .client
            .post(format!("{}/xrpc/com.atproto.repo.putRecord", self.base_url))
            .bearer_auth(&session.access_jwt)
            .json(&json!({
                "repo": session.did,
                "collection": "app.bsky.feed.generator",
                "rkey": rkey,
                "record": record,
            }))
            .timeout(self.timeout)
            .send()
            .await
            .context("putRecord request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("putRecord failed {status}: {body}");
        }

        let put: PutRecordResponse = resp
            .json()
            .await
            .context("Failed to parse putRecord response")?;
        Ok(put.uri)
    }
}

/// Convert a wire post into the domain snapshot. Facet features of kind
/// link become link targets. A post whose indexedAt does not parse is
/// dropped with a diagnostic so nothing mis-ranks downstream.
fn convert_post(post: PostView) -> Option<Post> {
    let indexed_at = match DateTime::parse_from_rfc3339(&post.indexed_at) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            warn!(
                uri = post.uri.as_str(),
                indexed_at = post.indexed_at.as_str(),
                error = %e,
                "bluesky: unparseable indexedAt, dropping post"
            );
            return None;
        }
    };

    let link_targets: Vec<String> = post
        .record
        .facets
        .unwrap_or_default()
        .into_iter()
        .flat_map(|facet| facet.features)
        .filter_map(|feature| {
            if feature.r#type == LINK_FEATURE_TYPE {
                feature.uri
            } else {
                None
            }
        })
        .collect();

    Some(Post {
        uri: post.uri,
        author_handle: post.author.handle,
        indexed_at,
        like_count: post.like_count.unwrap_or(0),
        quote_count: post.quote_count.unwrap_or(0),
        reply_count: post.reply_count.unwrap_or(0),
        repost_count: post.repost_count.unwrap_or(0),
        text: post.record.text.unwrap_or_default(),
        link_targets,
    })
}

// --- AT Protocol response types ---

#[derive(Deserialize)]
struct SessionResponse {
    #[serde(rename = "accessJwt")]
    access_jwt: String,
    did: String,
}

#[derive(Deserialize)]
struct FeedResponse {
    feed: Vec<FeedItem>,
    cursor: Option<String>,
}

#[derive(Deserialize)]
struct FeedItem {
    post: PostView,
}

#[derive(Deserialize)]
struct PostView {
    uri: String,
    author: BskyAuthor,
    record: BskyRecord,
    #[serde(rename = "indexedAt")]
    indexed_at: String,
    #[serde(rename = "likeCount")]
    like_count: Option<u32>,
    #[serde(rename = "quoteCount")]
    quote_count: Option<u32>,
    #[serde(rename = "replyCount")]
    reply_count: Option<u32>,
    #[serde(rename = "repostCount")]
    repost_count: Option<u32>,
}

#[derive(Deserialize)]
struct BskyAuthor {
    handle: String,
}

#[derive(Deserialize)]
struct BskyRecord {
    text: Option<String>,
    facets: Option<Vec<BskyFacet>>,
}

#[derive(Deserialize)]
struct BskyFacet {
    features: Vec<BskyFacetFeature>,
}

#[derive(Deserialize)]
struct BskyFacetFeature {
    #[serde(rename = "$type")]
    r#type: String,
    /// Target for link features.
    uri: Option<String>,
}

#[derive(Deserialize)]
struct BlobResponse {
    blob: serde_json::Value,
}

#[derive(Deserialize)]
struct PutRecordResponse {
    uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire_post(value: serde_json::Value) -> PostView {
        serde_json::from_value(value).expect("valid wire post")
    }

    #[test]
    fn converts_post_with_link_facets() {
        let post = wire_post(json!({
            "uri": "at://did:plc:abc/app.bsky.feed.post/xyz",
            "author": { "handle": "a.bsky.social" },
            "indexedAt": "2024-01-05T12:30:00.123Z",
            "likeCount": 3,
            "quoteCount": 1,
            "replyCount": 2,
            "repostCount": 4,
            "record": {
                "text": "new paper https://arxiv.org/abs/2401.12345",
                "facets": [{
                    "features": [
                        { "$type": "app.bsky.richtext.facet#link", "uri": "https://arxiv.org/abs/2401.12345" },
                        { "$type": "app.bsky.richtext.facet#mention", "did": "did:plc:someone" }
                    ]
                }]
            }
        }));

        let converted = convert_post(post).expect("convertible");
        assert_eq!(converted.author_handle, "a.bsky.social");
        assert_eq!(converted.engagement_total(), 10);
        assert_eq!(
            converted.link_targets,
            vec!["https://arxiv.org/abs/2401.12345"]
        );
        assert_eq!(converted.indexed_at.to_rfc3339(), "2024-01-05T12:30:00.123+00:00");
    }

    #[test]
    fn missing_counters_default_to_zero() {
        let post = wire_post(json!({
            "uri": "at://did:plc:abc/app.bsky.feed.post/xyz",
            "author": { "handle": "a.bsky.social" },
            "indexedAt": "2024-01-05T12:30:00Z",
            "record": { "text": "hello" }
        }));

        let converted = convert_post(post).expect("convertible");
        assert_eq!(converted.engagement_total(), 0);
        assert!(converted.link_targets.is_empty());
    }

    #[test]
    fn bad_timestamp_drops_post() {
        let post = wire_post(json!({
            "uri": "at://did:plc:abc/app.bsky.feed.post/xyz",
            "author": { "handle": "a.bsky.social" },
            "indexedAt": "yesterday-ish",
            "record": { "text": "hello" }
        }));

        assert!(convert_post(post).is_none());
    }
}
