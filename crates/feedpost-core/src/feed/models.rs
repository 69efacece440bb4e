use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured feed endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub feed_url: String,
    /// Ordering hint, not used by the scheduler
    pub priority: i64,
    /// Skip TLS certificate validation when fetching this feed
    pub insecure: bool,
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new source
#[derive(Debug, Clone)]
pub struct NewSource {
    pub name: String,
    pub feed_url: String,
    pub priority: i64,
    pub insecure: bool,
}

/// An entry fetched from a feed during one cycle, not yet persisted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub title: String,
    pub categories: Vec<String>,
    pub link: String,
    /// `None` when the feed carried no usable date
    pub date: Option<DateTime<Utc>>,
    /// Plain-text body, full content preferred over the excerpt
    pub summary: String,
    pub source_name: String,
}

/// A persisted article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub link: String,
    pub summary: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub published_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new article
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub source_id: i64,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub categories: Vec<String>,
    pub published_at: DateTime<Utc>,
}

impl NewArticle {
    /// Build an article from a fetched item, stamping `now` when the item has no date
    pub fn from_item(source_id: i64, item: Item, now: DateTime<Utc>) -> Self {
        Self {
            source_id,
            title: item.title,
            link: item.link,
            summary: item.summary,
            categories: item.categories,
            published_at: item.date.unwrap_or(now),
        }
    }
}

impl Article {
    pub fn is_posted(&self) -> bool {
        self.posted_at.is_some()
    }
}
