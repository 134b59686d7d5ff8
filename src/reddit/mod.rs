pub mod bloom;
pub mod client;
pub mod extractor;

use async_trait::async_trait;

use crate::models::RedditGameEntry;

pub use client::RedditClient;
pub use extractor::{GameEntryExtractor, MAX_GAME_ENTRIES};

/// Anything that can produce the current deduplicated list of feed entries.
///
/// Implementations never fail: transport or shape problems yield an empty list.
#[async_trait]
pub trait GameSource: Send + Sync {
    async fn list_games(&self) -> Vec<RedditGameEntry>;
}
