use chrono::{DateTime, Utc};

/// A post snapshot pulled from the upstream feed.
/// Immutable for the duration of a run: fetched once, evaluated,
/// optionally emitted into the skeleton.
#[derive(Debug, Clone)]
pub struct Post {
    /// AT-Protocol record URI. The only field that survives ranking.
    pub uri: String,
    pub author_handle: String,
    /// When the network indexed the post. Always timezone-aware UTC;
    /// conversion from the wire drops posts this cannot be parsed for.
    pub indexed_at: DateTime<Utc>,
    pub like_count: u32,
    pub quote_count: u32,
    pub reply_count: u32,
    pub repost_count: u32,
    pub text: String,
    /// Targets of rich-text facet features of kind link.
    /// Plain-text URLs in the post body are not collected here.
    pub link_targets: Vec<String>,
}

impl Post {
    /// Total engagement across all four counters.
    pub fn engagement_total(&self) -> u32 {
        self.like_count + self.quote_count + self.reply_count + self.repost_count
    }
}
