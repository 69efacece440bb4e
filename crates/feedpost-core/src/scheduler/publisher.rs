use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::message::{compose_message, UNKNOWN_SOURCE};
use crate::ai::Summarizer;
use crate::content::{normalize_text, ContentProvider};
use crate::feed::Article;
use crate::reporter::Reporter;
use crate::shutdown::Shutdown;
use crate::storage::{ArticleStore, SourceStore};
use crate::telegram::MessageSender;
use crate::{Error, Result};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_LOOKBACK: Duration = Duration::from_secs(20 * 60);

/// Result of one publish attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Nothing qualified for posting
    Idle,
    Posted { article_id: i64, summarized: bool },
}

/// Periodically posts the oldest unposted article to the channel
pub struct PublishLoop {
    articles: Arc<dyn ArticleStore>,
    sources: Arc<dyn SourceStore>,
    pages: Arc<dyn ContentProvider>,
    summarizer: Summarizer,
    sender: Arc<dyn MessageSender>,
    interval: Duration,
    lookback: Duration,
    reporter: Reporter,
}

impl PublishLoop {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        sources: Arc<dyn SourceStore>,
        pages: Arc<dyn ContentProvider>,
        summarizer: Summarizer,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        Self {
            articles,
            sources,
            pages,
            summarizer,
            sender,
            interval: DEFAULT_INTERVAL,
            lookback: DEFAULT_LOOKBACK,
            reporter: Reporter::disabled(),
        }
    }

    /// Set the publish interval and the maximum age of a selectable article
    pub fn with_schedule(mut self, interval: Duration, lookback: Duration) -> Self {
        self.interval = interval;
        self.lookback = lookback;
        self
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Publish immediately, then once per interval.
    ///
    /// Returns `Error::Cancelled` on shutdown; a failed send or store call
    /// stops the loop with that error.
    pub async fn start(&self, mut shutdown: Shutdown) -> Result<()> {
        info!(
            "Notifier started: interval={}s, lookback={}s, summarizer={}",
            self.interval.as_secs(),
            self.lookback.as_secs(),
            self.summarizer.provider_name()
        );

        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    info!("Notifier received shutdown signal");
                    return Err(Error::Cancelled);
                }
                _ = ticker.tick() => {}
            }

            self.select_and_send(&shutdown).await?;
        }
    }

    /// Post at most one article
    pub async fn select_and_send(&self, shutdown: &Shutdown) -> Result<PublishOutcome> {
        let lookback = chrono::Duration::from_std(self.lookback)
            .map_err(|e| Error::Config(format!("lookback window out of range: {}", e)))?;
        let since = Utc::now() - lookback;

        let mut selected = shutdown.run_until(self.articles.list_unposted(since, 1)).await?;
        let Some(article) = selected.pop() else {
            debug!("No unposted articles since {}", since.format("%Y-%m-%d %H:%M:%S"));
            return Ok(PublishOutcome::Idle);
        };
        info!("Selected article {}: {}", article.id, article.title);

        let summary = match self.summarize(&article, shutdown).await {
            Ok(summary) => summary,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!("Failed to summarize article {}: {}", article.id, e);
                self.reporter
                    .notify(&format!(
                        "Failed to summarize \"{}\" ({}): {}",
                        article.title, article.link, e
                    ))
                    .await;
                String::new()
            }
        };

        let lookup = self.sources.source_by_id(article.source_id);
        let source_name = match shutdown.run_until(lookup).await {
            Ok(source) => source.name,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!("Source lookup for article {} failed: {}", article.id, e);
                UNKNOWN_SOURCE.to_string()
            }
        };

        let message = compose_message(&article, &summary, &source_name);
        shutdown.run_until(self.sender.send(&message)).await?;

        // Once the message is out the article must be recorded as posted
        self.articles.mark_posted(&article).await?;
        info!("Posted article {}: {}", article.id, article.title);

        Ok(PublishOutcome::Posted {
            article_id: article.id,
            summarized: !summary.is_empty(),
        })
    }

    /// Stored body if present, otherwise the readable text of the page
    async fn summarize(&self, article: &Article, shutdown: &Shutdown) -> Result<String> {
        let text = if article.summary.trim().is_empty() {
            debug!("Article {} has no body, fetching {}", article.id, article.link);
            shutdown.run_until(self.pages.fetch_text(&article.link)).await?
        } else {
            article.summary.clone()
        };

        let text = normalize_text(&text);
        if text.trim().is_empty() {
            debug!("Article {} has no text to summarize", article.id);
            return Ok(String::new());
        }

        shutdown.run_until(self.summarizer.summarize(&text)).await
    }
}
