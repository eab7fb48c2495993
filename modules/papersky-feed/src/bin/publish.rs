// One-shot feed registration. Publishes the app.bsky.feed.generator
// record pointing at the hosting service and prints the record URI the
// operator sets as FEED_URI for the generator.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use papersky_common::PublishConfig;
use papersky_feed::BlueskyClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("publish=info".parse()?)
                .add_directive("papersky_feed=info".parse()?),
        )
        .init();

    let config = PublishConfig::from_env();

    let mut bluesky = BlueskyClient::new(&config.pds_base)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .retry_policy(config.max_attempts, Duration::from_millis(config.retry_base_ms));
    bluesky.login(&config.handle, &config.app_password).await?;

    let avatar = match &config.avatar_path {
        Some(path) => {
            let data =
                std::fs::read(path).with_context(|| format!("Failed to read avatar {path}"))?;
            let mime = if path.ends_with(".png") {
                "image/png"
            } else {
                "image/jpeg"
            };
            info!(path = path.as_str(), mime, "Uploading avatar");
            Some(bluesky.upload_blob(data, mime).await?)
        }
        None => None,
    };

    let mut record = json!({
        "$type": "app.bsky.feed.generator",
        "did": config.service_did,
        "displayName": config.display_name,
        "description": config.description,
        "createdAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    });
    if let Some(blob) = avatar {
        record["avatar"] = blob;
    }

    let uri = bluesky.put_feed_generator(&config.record_name, record).await?;

    info!(uri = uri.as_str(), "Feed generator record published");
    println!("Successfully published!");
    println!("Feed URI (set FEED_URI for the generator): {uri}");
    Ok(())
}
