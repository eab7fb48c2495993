// arXiv export API client. Resolves identifiers to primary subject
// categories via the Atom query endpoint.

pub mod error;

pub use error::{ArxivError, Result};

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::Feed;
use regex::Regex;
use tracing::{info, warn};

const DEFAULT_BASE_URL: &str = "https://export.arxiv.org";

/// Primary categories accepted as ML research.
/// Reference: https://arxiv.org/category_taxonomy
pub const ALLOWED_CATEGORIES: [&str; 4] = ["cs.AI", "cs.CL", "cs.CV", "cs.MA"];

/// Outcome of classifying one arXiv identifier.
///
/// `Unknown` covers both lookup failures and identifiers missing from
/// the index. Callers must treat it as non-passing; it is a distinct
/// variant so nobody can mistake it for `Allowed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryVerdict {
    Allowed,
    NotAllowed,
    Unknown,
}

/// Classifies arXiv identifiers by primary category.
/// `ArxivClient` is the live implementation; tests stub this seam.
#[async_trait]
pub trait PreprintLookup: Send + Sync {
    async fn classify(&self, arxiv_id: &str) -> CategoryVerdict;
}

static VERSION_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v\d+$").expect("valid regex"));

/// Derive a normalized arXiv identifier from a link.
///
/// Takes the last path segment, strips fragment and query, a `.pdf`
/// extension, and a trailing `vN` version suffix. Idempotent. Malformed
/// input never fails; it just yields an identifier the index won't
/// resolve.
pub fn extract_arxiv_id(url: &str) -> String {
    let tail = url.rsplit('/').next().unwrap_or(url);
    let tail = tail.split('#').next().unwrap_or(tail);
    let tail = tail.split('?').next().unwrap_or(tail);
    let tail = tail.strip_suffix(".pdf").unwrap_or(tail);
    VERSION_SUFFIX_RE.replace(tail, "").into_owned()
}

pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_attempts: u32,
    retry_base: Duration,
}

impl ArxivClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_base: Duration::from_millis(500),
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

    /// Query the Atom endpoint for one identifier, retrying failures
    /// with exponential backoff (base * 2^attempt).
    async fn query(&self, arxiv_id: &str) -> Result<Feed> {
        let mut attempt = 0;
        loop {
            match self.try_query(arxiv_id).await {
                Ok(feed) => return Ok(feed),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(e);
                    }
                    let backoff = self.retry_base * 2u32.pow(attempt - 1);
                    warn!(arxiv_id, attempt, error = %e, "arxiv: query failed, retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn try_query(&self, arxiv_id: &str) -> Result<Feed> {
        let resp = self
            .client
            .get(format!("{}/api/query", self.base_url))
            .query(&[("id_list", arxiv_id), ("max_results", "1")])
            .timeout(self.timeout)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(ArxivError::Api { status, message });
        }

        let bytes = resp.bytes().await?;
        Ok(feed_rs::parser::parse(&bytes[..])?)
    }
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreprintLookup for ArxivClient {
    /// Lookup failures and unknown identifiers degrade to `Unknown`
    /// rather than erroring, so one bad link never aborts a batch.
    async fn classify(&self, arxiv_id: &str) -> CategoryVerdict {
        match self.query(arxiv_id).await {
            Ok(feed) => {
                let verdict = verdict_for(&feed);
                if verdict == CategoryVerdict::Unknown {
                    info!(arxiv_id, "arxiv: identifier missing from index");
                }
                verdict
            }
            Err(e) => {
                warn!(arxiv_id, error = %e, "arxiv: lookup failed");
                CategoryVerdict::Unknown
            }
        }
    }
}

/// Map a query response to a verdict. The primary classification is the
/// first category term of the first entry; arXiv lists it first.
fn verdict_for(feed: &Feed) -> CategoryVerdict {
    let Some(entry) = feed.entries.first() else {
        return CategoryVerdict::Unknown;
    };
    let Some(category) = entry.categories.first() else {
        return CategoryVerdict::Unknown;
    };
    if ALLOWED_CATEGORIES.contains(&category.term.as_str()) {
        CategoryVerdict::Allowed
    } else {
        CategoryVerdict::NotAllowed
    }
}
