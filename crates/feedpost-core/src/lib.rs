pub mod ai;
pub mod config;
pub mod content;
pub mod error;
pub mod feed;
pub mod reporter;
pub mod scheduler;
pub mod shutdown;
pub mod storage;
pub mod telegram;

#[cfg(test)]
mod test_http;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use shutdown::Shutdown;
