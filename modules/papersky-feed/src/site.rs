// Static artifacts of the feed-generator protocol. Pure functions of
// configuration and the ranked URI list, regenerated in full every run.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

/// DID document advertising the generator service endpoint.
pub fn did_document(service_domain: &str) -> serde_json::Value {
    json!({
        "@context": ["https://www.w3.org/ns/did/v1"],
        "id": format!("did:web:{service_domain}"),
        "service": [{
            "id": "#bsky_fg",
            "type": "BskyFeedGenerator",
            "serviceEndpoint": format!("https://{service_domain}"),
        }],
    })
}

pub fn describe_feed_generator(service_did: &str, feed_uri: &str) -> serde_json::Value {
    json!({
        "encoding": "application/json",
        "body": {
            "did": service_did,
            "feeds": [{ "uri": feed_uri }],
        },
    })
}

/// Skeleton document: the ranked post URIs, order preserved.
pub fn feed_skeleton(post_uris: &[String]) -> serde_json::Value {
    json!({
        "feed": post_uris.iter().map(|uri| json!({ "post": uri })).collect::<Vec<_>>(),
    })
}

/// Write one artifact, creating parent directories. Full-document overwrite.
fn write_json(value: &serde_json::Value, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(value).context("Failed to serialize artifact")?;
    fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Emit the full document set under `output_dir`.
pub fn write_site(
    output_dir: &str,
    service_domain: &str,
    service_did: &str,
    feed_uri: &str,
    post_uris: &[String],
) -> Result<()> {
    let root = Path::new(output_dir);
    write_json(&did_document(service_domain), &root.join(".well-known/did.json"))?;
    write_json(
        &describe_feed_generator(service_did, feed_uri),
        &root.join("xrpc/app.bsky.feed.describeFeedGenerator"),
    )?;
    write_json(
        &feed_skeleton(post_uris),
        &root.join("xrpc/app.bsky.feed.getFeedSkeleton"),
    )?;
    info!(output_dir, posts = post_uris.len(), "site: artifacts written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn did_document_shape() {
        let doc = did_document("feed.example.com");
        assert_eq!(
            doc,
            json!({
                "@context": ["https://www.w3.org/ns/did/v1"],
                "id": "did:web:feed.example.com",
                "service": [{
                    "id": "#bsky_fg",
                    "type": "BskyFeedGenerator",
                    "serviceEndpoint": "https://feed.example.com",
                }],
            })
        );
    }

    #[test]
    fn describe_document_shape() {
        let doc = describe_feed_generator(
            "did:web:feed.example.com",
            "at://did:plc:abc/app.bsky.feed.generator/papers",
        );
        assert_eq!(
            doc,
            json!({
                "encoding": "application/json",
                "body": {
                    "did": "did:web:feed.example.com",
                    "feeds": [{ "uri": "at://did:plc:abc/app.bsky.feed.generator/papers" }],
                },
            })
        );
    }

    #[test]
    fn skeleton_preserves_ranked_order() {
        let uris = vec!["at://a".to_string(), "at://b".to_string()];
        assert_eq!(
            feed_skeleton(&uris),
            json!({ "feed": [{ "post": "at://a" }, { "post": "at://b" }] })
        );
    }

    #[test]
    fn skeleton_of_empty_list() {
        assert_eq!(feed_skeleton(&[]), json!({ "feed": [] }));
    }

    #[test]
    fn writes_all_three_artifacts() {
        let dir = std::env::temp_dir().join("papersky-site-test");
        let _ = fs::remove_dir_all(&dir);
        let out = dir.to_str().expect("utf8 path");

        write_site(
            out,
            "feed.example.com",
            "did:web:feed.example.com",
            "at://did:plc:abc/app.bsky.feed.generator/papers",
            &["at://a".to_string()],
        )
        .expect("write succeeds");

        let skeleton: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.join("xrpc/app.bsky.feed.getFeedSkeleton")).expect("read"),
        )
        .expect("json");
        assert_eq!(skeleton, json!({ "feed": [{ "post": "at://a" }] }));

        assert!(dir.join(".well-known/did.json").exists());
        assert!(dir.join("xrpc/app.bsky.feed.describeFeedGenerator").exists());

        let _ = fs::remove_dir_all(&dir);
    }
}
