//! In-memory stand-ins for the store, feed, summarizer and sender traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::ai::AiProvider;
use crate::content::ContentProvider;
use crate::feed::{Article, FeedSource, Item, NewArticle, Source, SourceConnector};
use crate::shutdown::Shutdown;
use crate::storage::{ArticleStore, SourceStore};
use crate::telegram::MessageSender;
use crate::{Error, Result};

pub fn source(id: i64, name: &str) -> Source {
    Source {
        id,
        name: name.to_string(),
        feed_url: format!("https://feeds.example.com/{}.xml", id),
        priority: 0,
        insecure: false,
        created_at: Utc::now(),
    }
}

pub fn item(title: &str, link: &str) -> Item {
    Item {
        title: title.to_string(),
        link: link.to_string(),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct MemoryArticles {
    pub rows: Mutex<Vec<Article>>,
    pub fail_store: bool,
}

impl MemoryArticles {
    pub fn all(&self) -> Vec<Article> {
        self.rows.lock().unwrap().clone()
    }

    pub fn links(&self) -> Vec<String> {
        let mut links: Vec<String> = self.all().into_iter().map(|a| a.link).collect();
        links.sort();
        links
    }

    /// Insert an article as if it had been fetched at `fetched_at`
    pub fn insert_at(&self, link: &str, summary: &str, fetched_at: DateTime<Utc>) -> Article {
        let mut rows = self.rows.lock().unwrap();
        let article = Article {
            id: rows.len() as i64 + 1,
            source_id: 1,
            title: format!("Title of {}", link),
            link: link.to_string(),
            summary: summary.to_string(),
            categories: vec!["Rust".to_string()],
            published_at: fetched_at,
            posted_at: None,
            created_at: fetched_at,
        };
        rows.push(article.clone());
        article
    }
}

#[async_trait::async_trait]
impl ArticleStore for MemoryArticles {
    async fn store(&self, article: &NewArticle) -> Result<bool> {
        if self.fail_store {
            return Err(Error::Other("disk full".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|a| a.link == article.link) {
            return Ok(false);
        }
        let id = rows.len() as i64 + 1;
        rows.push(Article {
            id,
            source_id: article.source_id,
            title: article.title.clone(),
            link: article.link.clone(),
            summary: article.summary.clone(),
            categories: article.categories.clone(),
            published_at: article.published_at,
            posted_at: None,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn list_unposted(&self, since: DateTime<Utc>, limit: u32) -> Result<Vec<Article>> {
        let mut rows: Vec<Article> = self
            .all()
            .into_iter()
            .filter(|a| a.posted_at.is_none() && a.created_at >= since)
            .collect();
        rows.sort_by_key(|a| (a.published_at, a.id));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn mark_posted(&self, article: &Article) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|a| a.id == article.id) {
            row.posted_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySources {
    pub sources: Vec<Source>,
    pub fail_list: bool,
}

#[async_trait::async_trait]
impl SourceStore for MemorySources {
    async fn list_sources(&self) -> Result<Vec<Source>> {
        if self.fail_list {
            return Err(Error::Other("database is gone".to_string()));
        }
        Ok(self.sources.clone())
    }

    async fn source_by_id(&self, id: i64) -> Result<Source> {
        self.sources
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(Error::SourceNotFound(id))
    }
}

pub enum FeedBehavior {
    Items(Vec<Item>),
    Fail,
    Hang,
}

pub struct FakeFeed {
    id: i64,
    name: String,
    behavior: FeedBehavior,
}

#[async_trait::async_trait]
impl FeedSource for FakeFeed {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, shutdown: &Shutdown) -> Result<Vec<Item>> {
        match &self.behavior {
            FeedBehavior::Items(items) => Ok(items.clone()),
            FeedBehavior::Fail => Err(Error::FeedParse("connection reset".to_string())),
            FeedBehavior::Hang => {
                shutdown
                    .run_until(std::future::pending::<Result<Vec<Item>>>())
                    .await
            }
        }
    }
}

#[derive(Default)]
pub struct FakeConnector {
    feeds: Mutex<HashMap<i64, FeedBehavior>>,
}

impl FakeConnector {
    pub fn with(self, source_id: i64, behavior: FeedBehavior) -> Self {
        self.feeds.lock().unwrap().insert(source_id, behavior);
        self
    }
}

impl SourceConnector for FakeConnector {
    fn connect(&self, source: &Source) -> Result<Arc<dyn FeedSource>> {
        let behavior = match self.feeds.lock().unwrap().get(&source.id) {
            Some(FeedBehavior::Items(items)) => FeedBehavior::Items(items.clone()),
            Some(FeedBehavior::Fail) => FeedBehavior::Fail,
            Some(FeedBehavior::Hang) => FeedBehavior::Hang,
            None => FeedBehavior::Items(Vec::new()),
        };
        Ok(Arc::new(FakeFeed {
            id: source.id,
            name: source.name.clone(),
            behavior,
        }))
    }
}

#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::Telegram(
                "Forbidden: bot is not a member of the channel".to_string(),
            ));
        }
        Ok(())
    }
}

/// Records its inputs and answers with a fixed summary or an error
#[derive(Default)]
pub struct FakeProvider {
    pub inputs: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait::async_trait]
impl AiProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        self.inputs.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::AiProvider("model not loaded".to_string()));
        }
        Ok("A short summary.".to_string())
    }
}

/// Serves page text and counts requests
#[derive(Default)]
pub struct FakePages {
    pub text: String,
    pub fail: bool,
    pub calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ContentProvider for FakePages {
    async fn fetch_text(&self, link: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::ContentExtraction(format!("{} returned HTTP 404", link)));
        }
        Ok(self.text.clone())
    }
}

pub const SHORT: Duration = Duration::from_secs(5);
