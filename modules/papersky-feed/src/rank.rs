use chrono::{DateTime, Utc};

use papersky_common::Post;

/// Decay exponent of the popularity formula.
pub const DEFAULT_GRAVITY: f64 = 2.5;

/// Posts at or past this age score zero regardless of engagement.
pub const FRESHNESS_CUTOFF_HOURS: f64 = 12.0;

/// Decayed-popularity score: total engagement divided by a power of age.
/// Recent high-engagement posts dominate; posts past the freshness
/// cutoff floor at zero.
pub fn engagement_score(post: &Post, now: DateTime<Utc>, gravity: f64) -> f64 {
    // Clock skew can put indexed_at slightly in the future; clamp to zero age.
    let hours = ((now - post.indexed_at).num_milliseconds() as f64 / 3_600_000.0).max(0.0);
    if hours >= FRESHNESS_CUTOFF_HOURS {
        return 0.0;
    }
    post.engagement_total() as f64 / (hours + 2.0).powf(gravity)
}

/// Order posts by descending score. The sort is stable, so equal scores
/// (every post past the cutoff, for one) keep their fetch order.
pub fn rank_posts(posts: Vec<Post>, now: DateTime<Utc>, gravity: f64) -> Vec<Post> {
    let mut scored: Vec<(f64, Post)> = posts
        .into_iter()
        .map(|post| (engagement_score(&post, now, gravity), post))
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(_, post)| post).collect()
}
