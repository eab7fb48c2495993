/// Result type alias for arXiv lookups.
pub type Result<T> = std::result::Result<T, ArxivError>;

#[derive(Debug, thiserror::Error)]
pub enum ArxivError {
    #[error("arXiv API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Atom parse error: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}
