use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use arxiv_client::ArxivClient;
use papersky_common::Config;
use papersky_feed::{filter, rank, site, BlueskyClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("papersky_feed=info".parse()?)
                .add_directive("papersky_common=info".parse()?)
                .add_directive("arxiv_client=info".parse()?),
        )
        .init();

    info!("Papersky feed generator starting...");

    let config = Config::from_env();
    config.log_redacted();

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let retry_base = Duration::from_millis(config.retry_base_ms);

    let mut bluesky = BlueskyClient::new(&config.pds_base)
        .timeout(timeout)
        .retry_policy(config.max_attempts, retry_base);
    bluesky.login(&config.handle, &config.app_password).await?;

    // A failed fetch is fatal: no posts, no skeleton.
    let posts = bluesky
        .fetch_feed(&config.feed_source_path, config.page_limit, config.page_count)
        .await?;

    let posts = if config.apply_topical_filter {
        let arxiv = ArxivClient::new()
            .timeout(timeout)
            .retry_policy(config.max_attempts, retry_base);
        let total = posts.len();
        let kept = filter::filter_posts(posts, &arxiv, config.classify_concurrency).await;
        info!(total, kept = kept.len(), "filter: topical filter applied");
        kept
    } else {
        posts
    };

    let ranked = rank::rank_posts(posts, Utc::now(), config.gravity);
    let post_uris: Vec<String> = ranked.into_iter().map(|post| post.uri).collect();

    site::write_site(
        &config.output_dir,
        &config.service_domain,
        &config.service_did,
        &config.feed_uri,
        &post_uris,
    )?;

    info!("Feed generation complete");
    Ok(())
}
