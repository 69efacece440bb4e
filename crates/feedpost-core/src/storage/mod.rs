mod article_repo;
mod database;
mod retry;
mod source_repo;

pub use article_repo::ArticleRepository;
pub use database::Database;
pub use source_repo::SourceRepository;

use chrono::{DateTime, Utc};

use crate::feed::{Article, NewArticle, Source};
use crate::Result;

/// Article operations used by the fetch and publish loops
#[async_trait::async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert unless an article with the same link exists. Returns true if inserted.
    async fn store(&self, article: &NewArticle) -> Result<bool>;

    /// Unposted articles stored at or after `since`, in a stable oldest-first order.
    ///
    /// The window is measured from when the article was fetched, not from the
    /// feed's own date, so late-surfacing entries still get their turn.
    async fn list_unposted(&self, since: DateTime<Utc>, limit: u32) -> Result<Vec<Article>>;

    /// Mark an article as posted. Repeating the call is a no-op.
    async fn mark_posted(&self, article: &Article) -> Result<()>;
}

/// Source lookups used by the fetch and publish loops
#[async_trait::async_trait]
pub trait SourceStore: Send + Sync {
    async fn list_sources(&self) -> Result<Vec<Source>>;

    async fn source_by_id(&self, id: i64) -> Result<Source>;
}
