//! The two long-running loops: fetching feeds into the store and
//! publishing stored articles to the channel.

mod fetcher;
mod message;
mod publisher;
#[cfg(test)]
mod testing;

pub use fetcher::{FetchLoop, FetchStats};
pub use message::{compose_message, hashtags, UNKNOWN_SOURCE};
pub use publisher::{PublishLoop, PublishOutcome};
