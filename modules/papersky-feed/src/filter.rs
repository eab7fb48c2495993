// Topical relevance policy. Two tiers: arXiv links are classified by
// primary category; posts without preprint links fall back to a venue
// keyword match, which recovers posts discussing published papers.

use futures::stream::{self, StreamExt};
use tracing::debug;

use arxiv_client::{extract_arxiv_id, CategoryVerdict, PreprintLookup};
use papersky_common::Post;

/// Author handles (exact or prefix) whose posts are always dropped.
/// Known spam and duplicate aggregator accounts.
const DENIED_AUTHOR_PREFIXES: [&str; 5] = [
    "arxiv-cs-",
    "arxiv-stat-",
    "paperposterbot.bsky.social",
    "optb0t.bsky.social",
    "ericzzj.bsky.social",
];

/// Published-venue domains matched case-insensitively against post text.
const VENUE_KEYWORDS: [&str; 2] = ["aclweb.org", "aclanthology.org"];

const ARXIV_HOST: &str = "arxiv.org";

/// Facet link targets whose host is on the arXiv domain.
fn arxiv_links(post: &Post) -> Vec<&str> {
    post.link_targets
        .iter()
        .filter(|target| {
            url::Url::parse(target.as_str())
                .ok()
                .and_then(|u| u.host_str().map(|h| h.contains(ARXIV_HOST)))
                .unwrap_or(false)
        })
        .map(String::as_str)
        .collect()
}

/// Decide whether one post is topical.
///
/// Deny-listed authors are rejected before anything else. Posts linking
/// arXiv pass if ANY linked paper classifies into an allowed category
/// (`Unknown` never passes). Posts without arXiv links pass on a venue
/// keyword match.
pub async fn passes(post: &Post, lookup: &dyn PreprintLookup) -> bool {
    if DENIED_AUTHOR_PREFIXES
        .iter()
        .any(|prefix| post.author_handle.starts_with(prefix))
    {
        debug!(handle = post.author_handle.as_str(), "filter: denied author");
        return false;
    }

    let links = arxiv_links(post);
    if links.is_empty() {
        let text = post.text.to_lowercase();
        return VENUE_KEYWORDS.iter().any(|keyword| text.contains(keyword));
    }

    for link in links {
        let arxiv_id = extract_arxiv_id(link);
        if lookup.classify(&arxiv_id).await == CategoryVerdict::Allowed {
            return true;
        }
    }
    false
}

/// Apply `passes` across a batch with bounded parallel classification.
/// Verdicts recombine by original index, so completion order never
/// changes which posts survive or their relative order.
pub async fn filter_posts(
    posts: Vec<Post>,
    lookup: &dyn PreprintLookup,
    concurrency: usize,
) -> Vec<Post> {
    let verdicts: Vec<(usize, bool)> =
        stream::iter(posts.iter().enumerate().map(|(idx, post)| async move {
            (idx, passes(post, lookup).await)
        }))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut keep = vec![false; posts.len()];
    for (idx, pass) in verdicts {
        keep[idx] = pass;
    }

    posts
        .into_iter()
        .zip(keep)
        .filter_map(|(post, pass)| pass.then_some(post))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;

    struct StubLookup {
        verdicts: HashMap<&'static str, CategoryVerdict>,
    }

    impl StubLookup {
        fn new(verdicts: &[(&'static str, CategoryVerdict)]) -> Self {
            Self {
                verdicts: verdicts.iter().copied().collect(),
            }
        }
    }

    #[async_trait]
    impl PreprintLookup for StubLookup {
        async fn classify(&self, arxiv_id: &str) -> CategoryVerdict {
            self.verdicts
                .get(arxiv_id)
                .copied()
                .unwrap_or(CategoryVerdict::Unknown)
        }
    }

    fn post(handle: &str, text: &str, links: &[&str]) -> Post {
        Post {
            uri: "at://did:plc:abc/app.bsky.feed.post/xyz".to_string(),
            author_handle: handle.to_string(),
            indexed_at: Utc::now(),
            like_count: 0,
            quote_count: 0,
            reply_count: 0,
            repost_count: 0,
            text: text.to_string(),
            link_targets: links.iter().map(|l| l.to_string()).collect(),
        }
    }

    // --- deny-list ---

    #[tokio::test]
    async fn denied_prefix_rejects_even_with_qualifying_link() {
        let lookup = StubLookup::new(&[("2401.12345", CategoryVerdict::Allowed)]);
        let p = post(
            "arxiv-cs-cv.bsky.social",
            "new paper",
            &["https://arxiv.org/abs/2401.12345"],
        );
        assert!(!passes(&p, &lookup).await);
    }

    #[tokio::test]
    async fn denied_exact_handle_rejects() {
        let lookup = StubLookup::new(&[]);
        let p = post("optb0t.bsky.social", "aclanthology.org link inside", &[]);
        assert!(!passes(&p, &lookup).await);
    }

    // --- arXiv link classification ---

    #[tokio::test]
    async fn allowed_link_passes() {
        let lookup = StubLookup::new(&[("2401.12345", CategoryVerdict::Allowed)]);
        let p = post("a.bsky.social", "", &["https://arxiv.org/abs/2401.12345v1"]);
        assert!(passes(&p, &lookup).await);
    }

    #[tokio::test]
    async fn any_allowed_link_passes_alongside_unknown() {
        let lookup = StubLookup::new(&[
            ("2401.11111", CategoryVerdict::Unknown),
            ("2401.22222", CategoryVerdict::Allowed),
        ]);
        let p = post(
            "a.bsky.social",
            "",
            &[
                "https://arxiv.org/abs/2401.11111",
                "https://arxiv.org/abs/2401.22222",
            ],
        );
        assert!(passes(&p, &lookup).await);
    }

    #[tokio::test]
    async fn unknown_only_links_reject() {
        let lookup = StubLookup::new(&[]);
        let p = post("a.bsky.social", "", &["https://arxiv.org/abs/2401.99999"]);
        assert!(!passes(&p, &lookup).await);
    }

    #[tokio::test]
    async fn disallowed_link_rejects_with_no_keyword_fallback() {
        // An arXiv link exists, so the keyword tier is never consulted
        let lookup = StubLookup::new(&[("2401.12345", CategoryVerdict::NotAllowed)]);
        let p = post(
            "a.bsky.social",
            "also see aclanthology.org",
            &["https://arxiv.org/abs/2401.12345"],
        );
        assert!(!passes(&p, &lookup).await);
    }

    #[tokio::test]
    async fn non_arxiv_hosts_are_not_classified() {
        let lookup = StubLookup::new(&[("2401.12345", CategoryVerdict::Allowed)]);
        let p = post(
            "a.bsky.social",
            "mirror link",
            &["https://example.com/abs/2401.12345"],
        );
        assert!(!passes(&p, &lookup).await);
    }

    // --- keyword fallback ---

    #[tokio::test]
    async fn keyword_fallback_is_case_insensitive() {
        let lookup = StubLookup::new(&[]);
        let p = post("a.bsky.social", "great paper at ACLAnthology.org/abc", &[]);
        assert!(passes(&p, &lookup).await);
    }

    #[tokio::test]
    async fn unrelated_text_without_links_rejects() {
        let lookup = StubLookup::new(&[]);
        let p = post("a.bsky.social", "what I had for lunch", &[]);
        assert!(!passes(&p, &lookup).await);
    }

    // --- batch recombination ---

    #[tokio::test]
    async fn batch_preserves_input_order_of_survivors() {
        let lookup = StubLookup::new(&[("2401.00002", CategoryVerdict::Allowed)]);
        let posts = vec![
            post("a.bsky.social", "aclweb.org paper", &[]),
            post("b.bsky.social", "nothing relevant", &[]),
            post("c.bsky.social", "", &["https://arxiv.org/abs/2401.00002"]),
        ];
        let kept = filter_posts(posts, &lookup, 2).await;
        let handles: Vec<_> = kept.iter().map(|p| p.author_handle.as_str()).collect();
        assert_eq!(handles, vec!["a.bsky.social", "c.bsky.social"]);
    }
}
