pub mod bluesky;
pub mod filter;
pub mod rank;
pub mod site;

pub use bluesky::BlueskyClient;
