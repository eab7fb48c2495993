pub mod config;
pub mod types;

pub use config::{Config, PublishConfig};
pub use types::Post;
