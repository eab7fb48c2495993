use std::env;

use tracing::info;

/// Feed generator configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Hosting service identity
    pub service_domain: String,
    pub service_did: String,
    pub feed_uri: String,

    // Upstream feed the candidate posts come from
    pub feed_source_path: String,

    // Bluesky account
    pub pds_base: String,
    pub handle: String,
    pub app_password: String,

    // Fetch shape
    pub page_limit: u32,
    pub page_count: u32,

    // Ranking
    pub gravity: f64,

    // Filtering
    pub apply_topical_filter: bool,
    pub classify_concurrency: usize,

    // Networking
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_base_ms: u64,

    // Output
    pub output_dir: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing,
    /// before any network call is made.
    pub fn from_env() -> Self {
        let service_domain = required_env("SERVICE_DOMAIN");
        Self {
            service_did: env::var("SERVICE_DID")
                .unwrap_or_else(|_| format!("did:web:{service_domain}")),
            feed_uri: required_env("FEED_URI"),
            feed_source_path: required_env("FEED_SOURCE_PATH"),
            pds_base: env::var("PDS_BASE").unwrap_or_else(|_| "https://bsky.social".to_string()),
            handle: required_env("BSKY_HANDLE"),
            app_password: required_env("BSKY_APP_PASSWORD"),
            page_limit: parsed_env("PAGE_LIMIT", 100),
            page_count: parsed_env("PAGE_COUNT", 3),
            gravity: parsed_env("RANK_GRAVITY", 2.5),
            apply_topical_filter: bool_env("APPLY_TOPICAL_FILTER", false),
            classify_concurrency: parsed_env("CLASSIFY_CONCURRENCY", 8),
            request_timeout_secs: parsed_env("REQUEST_TIMEOUT_SECS", 30),
            max_attempts: parsed_env("MAX_ATTEMPTS", 3),
            retry_base_ms: parsed_env("RETRY_BASE_MS", 500),
            output_dir: env::var("OUTPUT_DIR").unwrap_or_else(|_| "./_site".to_string()),
            service_domain,
        }
    }

    /// Log the non-secret configuration at startup.
    pub fn log_redacted(&self) {
        info!(
            service_domain = self.service_domain.as_str(),
            service_did = self.service_did.as_str(),
            feed_uri = self.feed_uri.as_str(),
            feed_source_path = self.feed_source_path.as_str(),
            handle = self.handle.as_str(),
            page_limit = self.page_limit,
            page_count = self.page_count,
            gravity = self.gravity,
            apply_topical_filter = self.apply_topical_filter,
            output_dir = self.output_dir.as_str(),
            "Config loaded"
        );
    }
}

/// Configuration for the one-shot feed registration binary.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub pds_base: String,
    pub handle: String,
    pub app_password: String,

    /// Hostname the static artifacts are served from.
    pub service_domain: String,
    /// DID the generator record points at. Defaults to did:web of the domain.
    pub service_did: String,

    /// Record key; shows up in the feed URI.
    pub record_name: String,
    pub display_name: String,
    pub description: String,
    pub avatar_path: Option<String>,

    // Networking
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_base_ms: u64,
}

impl PublishConfig {
    pub fn from_env() -> Self {
        let service_domain = required_env("SERVICE_DOMAIN");
        Self {
            pds_base: env::var("PDS_BASE").unwrap_or_else(|_| "https://bsky.social".to_string()),
            handle: required_env("BSKY_HANDLE"),
            app_password: required_env("BSKY_APP_PASSWORD"),
            service_did: env::var("SERVICE_DID")
                .unwrap_or_else(|_| format!("did:web:{service_domain}")),
            record_name: env::var("RECORD_NAME").unwrap_or_else(|_| "arxiv-feed".to_string()),
            display_name: env::var("FEED_DISPLAY_NAME").unwrap_or_else(|_| "Papers".to_string()),
            description: env::var("FEED_DESCRIPTION")
                .unwrap_or_else(|_| DEFAULT_DESCRIPTION.trim().to_string()),
            avatar_path: env::var("AVATAR_PATH").ok().filter(|p| !p.is_empty()),
            request_timeout_secs: parsed_env("REQUEST_TIMEOUT_SECS", 30),
            max_attempts: parsed_env("MAX_ATTEMPTS", 3),
            retry_base_ms: parsed_env("RETRY_BASE_MS", 500),
            service_domain,
        }
    }
}

const DEFAULT_DESCRIPTION: &str = "
Latest ML research papers and preprints from arxiv.org discussed on Bluesky.

Logic:
- Pulls arxiv preprints and filters out non-ML via the arxiv API
- Ranks the items with a time-decayed engagement score
";

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid number")),
        Err(_) => default,
    }
}

fn bool_env(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => value == "1" || value.eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}
