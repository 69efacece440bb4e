use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::feed::{FeedSource, KeywordFilter, NewArticle, SourceConnector};
use crate::reporter::Reporter;
use crate::shutdown::Shutdown;
use crate::storage::{ArticleStore, SourceStore};
use crate::{Error, Result};

/// Totals for one fetch cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchStats {
    pub sources: usize,
    pub failed: usize,
    pub inserted: u32,
    pub filtered: u32,
}

#[derive(Debug, Default)]
struct SourceOutcome {
    fetched: usize,
    inserted: u32,
    filtered: u32,
    skipped: u32,
}

/// Periodically pulls every configured source and stores new items
pub struct FetchLoop {
    articles: Arc<dyn ArticleStore>,
    sources: Arc<dyn SourceStore>,
    connector: Arc<dyn SourceConnector>,
    filter: Arc<KeywordFilter>,
    interval: Duration,
    reporter: Reporter,
}

impl FetchLoop {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        sources: Arc<dyn SourceStore>,
        connector: Arc<dyn SourceConnector>,
        filter: KeywordFilter,
        interval: Duration,
        reporter: Reporter,
    ) -> Self {
        Self {
            articles,
            sources,
            connector,
            filter: Arc::new(filter),
            interval,
            reporter,
        }
    }

    /// Fetch immediately, then once per interval.
    ///
    /// Returns `Error::Cancelled` on shutdown. Any other error means the
    /// source list could not be loaded and the loop has stopped.
    pub async fn start(&self, mut shutdown: Shutdown) -> Result<()> {
        info!(
            "Fetcher started: interval={}s, filter keywords={}",
            self.interval.as_secs(),
            if self.filter.is_empty() { "none" } else { "set" }
        );

        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    info!("Fetcher received shutdown signal");
                    return Err(Error::Cancelled);
                }
                _ = ticker.tick() => {}
            }

            self.run_cycle(&shutdown).await?;
        }
    }

    /// Fetch every source once, concurrently, and wait for all of them
    pub async fn run_cycle(&self, shutdown: &Shutdown) -> Result<FetchStats> {
        let started = Instant::now();
        let sources = shutdown.run_until(self.sources.list_sources()).await?;
        debug!("Fetch cycle: {} sources", sources.len());

        let mut stats = FetchStats {
            sources: sources.len(),
            ..Default::default()
        };
        let mut tasks = JoinSet::new();

        for source in &sources {
            let feed = match self.connector.connect(source) {
                Ok(feed) => feed,
                Err(e) => {
                    report_failure(&self.reporter, &source.name, source.id, &e).await;
                    stats.failed += 1;
                    continue;
                }
            };

            let articles = Arc::clone(&self.articles);
            let filter = Arc::clone(&self.filter);
            let reporter = self.reporter.clone();
            let shutdown = shutdown.clone();

            tasks.spawn(async move {
                let result = ingest(feed.as_ref(), articles.as_ref(), &filter, &shutdown).await;
                if let Err(e) = &result {
                    if !e.is_cancelled() {
                        report_failure(&reporter, feed.name(), feed.id(), e).await;
                    }
                }
                result
            });
        }

        // Returning early drops the JoinSet, which aborts the remaining tasks
        let mut listener = shutdown.clone();
        loop {
            let joined = tokio::select! {
                biased;
                _ = listener.triggered() => return Err(Error::Cancelled),
                joined = tasks.join_next() => joined,
            };

            match joined {
                None => break,
                Some(Ok(Ok(outcome))) => {
                    stats.inserted += outcome.inserted;
                    stats.filtered += outcome.filtered;
                }
                Some(Ok(Err(e))) if e.is_cancelled() => return Err(Error::Cancelled),
                Some(Ok(Err(_))) => stats.failed += 1,
                Some(Err(e)) => {
                    error!("Fetch task panicked: {}", e);
                    stats.failed += 1;
                }
            }
        }

        info!(
            "Fetch cycle complete in {:.1}s: {} sources, {} failed, {} new, {} filtered",
            started.elapsed().as_secs_f64(),
            stats.sources,
            stats.failed,
            stats.inserted,
            stats.filtered
        );
        Ok(stats)
    }
}

/// Fetch one source, filter its items and store the survivors.
/// A store error stops this source only.
async fn ingest(
    feed: &dyn FeedSource,
    articles: &dyn ArticleStore,
    filter: &KeywordFilter,
    shutdown: &Shutdown,
) -> Result<SourceOutcome> {
    let items = feed.fetch(shutdown).await?;
    let now = Utc::now();
    let mut outcome = SourceOutcome {
        fetched: items.len(),
        ..Default::default()
    };

    for item in items {
        if item.link.trim().is_empty() {
            debug!("Skipping '{}' from {}: no link", item.title, feed.name());
            outcome.skipped += 1;
            continue;
        }

        if let Some(keyword) = filter.matching_keyword(&item) {
            debug!("Skipping '{}' from {}: matched '{}'", item.title, feed.name(), keyword);
            outcome.filtered += 1;
            continue;
        }

        let article = NewArticle::from_item(feed.id(), item, now);
        if shutdown.run_until(articles.store(&article)).await? {
            outcome.inserted += 1;
        }
    }

    debug!(
        "Source {} ({}): {} fetched, {} new, {} filtered, {} skipped",
        feed.name(),
        feed.id(),
        outcome.fetched,
        outcome.inserted,
        outcome.filtered,
        outcome.skipped
    );
    Ok(outcome)
}

async fn report_failure(reporter: &Reporter, name: &str, id: i64, err: &Error) {
    error!("Failed to fetch source {} ({}): {}", name, id, err);
    reporter
        .notify(&format!("Failed to fetch source {} ({}): {}", name, id, err))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::*;
    use crate::storage::{ArticleRepository, Database};
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn fetch_loop(
        articles: Arc<MemoryArticles>,
        sources: MemorySources,
        connector: FakeConnector,
        keywords: &[&str],
        reporter: Reporter,
    ) -> FetchLoop {
        FetchLoop::new(
            articles,
            Arc::new(sources),
            Arc::new(connector),
            KeywordFilter::new(keywords),
            Duration::from_secs(600),
            reporter,
        )
    }

    #[tokio::test]
    async fn test_failing_source_does_not_affect_siblings() {
        let articles = Arc::new(MemoryArticles::default());
        let sender = Arc::new(RecordingSender::default());
        let sources = MemorySources {
            sources: vec![source(1, "Broken"), source(2, "Tech News")],
            ..Default::default()
        };
        let connector = FakeConnector::default().with(1, FeedBehavior::Fail).with(
            2,
            FeedBehavior::Items(vec![
                item("One", "https://e.com/1"),
                item("Two", "https://e.com/2"),
            ]),
        );

        let reporter = Reporter::new(sender.clone());
        let fetcher = fetch_loop(articles.clone(), sources, connector, &[], reporter);
        let stats = fetcher.run_cycle(&Shutdown::never()).await.unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.inserted, 2);
        assert_eq!(articles.links(), vec!["https://e.com/1", "https://e.com/2"]);

        let reports = sender.sent();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("Broken"));
    }

    #[tokio::test]
    async fn test_keyword_filter_is_applied() {
        let articles = Arc::new(MemoryArticles::default());
        let mut sponsored = item("Great deals", "https://e.com/deals");
        sponsored.categories = vec!["Sponsored".to_string()];
        let mut tagged = item("Release notes", "https://e.com/notes");
        tagged.categories = vec!["sponsored".to_string()];

        let connector = FakeConnector::default().with(
            1,
            FeedBehavior::Items(vec![
                item("Why CRYPTO is back", "https://e.com/crypto"),
                sponsored,
                tagged,
                item("Rust 2024 edition", "https://e.com/rust"),
            ]),
        );
        let sources = MemorySources {
            sources: vec![source(1, "Blog")],
            ..Default::default()
        };

        let fetcher = fetch_loop(
            articles.clone(),
            sources,
            connector,
            &["crypto", "Sponsored"],
            Reporter::disabled(),
        );
        let stats = fetcher.run_cycle(&Shutdown::never()).await.unwrap();

        assert_eq!(stats.filtered, 2);
        assert_eq!(articles.links(), vec!["https://e.com/notes", "https://e.com/rust"]);
    }

    #[tokio::test]
    async fn test_dates_are_stamped_and_linkless_items_skipped() {
        let articles = Arc::new(MemoryArticles::default());
        let dated_at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let mut dated = item("Dated", "https://e.com/dated");
        dated.date = Some(dated_at);

        let connector = FakeConnector::default().with(
            1,
            FeedBehavior::Items(vec![
                dated,
                item("Undated", "https://e.com/undated"),
                item("No link", "  "),
            ]),
        );
        let sources = MemorySources {
            sources: vec![source(1, "Blog")],
            ..Default::default()
        };

        let before = Utc::now();
        let fetcher = fetch_loop(articles.clone(), sources, connector, &[], Reporter::disabled());
        fetcher.run_cycle(&Shutdown::never()).await.unwrap();

        let stored = articles.all();
        assert_eq!(stored.len(), 2);
        let dated = stored.iter().find(|a| a.link == "https://e.com/dated").unwrap();
        assert_eq!(dated.published_at, dated_at);
        let undated = stored.iter().find(|a| a.link == "https://e.com/undated").unwrap();
        assert!(undated.published_at >= before - ChronoDuration::seconds(1));
    }

    #[tokio::test]
    async fn test_backdated_item_stays_selectable_for_the_lookback_window() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = Arc::new(ArticleRepository::new(&db));
        let fetch_interval = ChronoDuration::minutes(10);
        let lookback = fetch_interval * 2;

        let fetched_at = Utc::now();
        let mut backdated = item("Surfaced late", "https://e.com/late");
        backdated.date = Some(fetched_at - ChronoDuration::minutes(8));
        let connector = FakeConnector::default().with(1, FeedBehavior::Items(vec![backdated]));
        let sources = MemorySources {
            sources: vec![source(1, "Blog")],
            ..Default::default()
        };

        let fetcher = FetchLoop::new(
            repo.clone(),
            Arc::new(sources),
            Arc::new(connector),
            KeywordFilter::default(),
            Duration::from_secs(600),
            Reporter::disabled(),
        );
        fetcher.run_cycle(&Shutdown::never()).await.unwrap();

        let at_one_and_a_half = fetched_at + fetch_interval * 3 / 2;
        let selected = repo.list_unposted(at_one_and_a_half - lookback, 1).await.unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].link, "https://e.com/late");

        let at_three = fetched_at + fetch_interval * 3 + ChronoDuration::seconds(5);
        assert!(repo.list_unposted(at_three - lookback, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refetch_stores_nothing_new() {
        let articles = Arc::new(MemoryArticles::default());
        let connector = FakeConnector::default()
            .with(1, FeedBehavior::Items(vec![item("One", "https://e.com/1")]));
        let sources = MemorySources {
            sources: vec![source(1, "Blog")],
            ..Default::default()
        };

        let fetcher = fetch_loop(articles.clone(), sources, connector, &[], Reporter::disabled());
        assert_eq!(fetcher.run_cycle(&Shutdown::never()).await.unwrap().inserted, 1);
        assert_eq!(fetcher.run_cycle(&Shutdown::never()).await.unwrap().inserted, 0);
        assert_eq!(articles.all().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let articles = Arc::new(MemoryArticles {
            fail_store: true,
            ..Default::default()
        });
        let sender = Arc::new(RecordingSender::default());
        let connector = FakeConnector::default()
            .with(1, FeedBehavior::Items(vec![item("One", "https://e.com/1")]));
        let sources = MemorySources {
            sources: vec![source(1, "Blog")],
            ..Default::default()
        };

        let fetcher = fetch_loop(articles, sources, connector, &[], Reporter::new(sender.clone()));
        let stats = fetcher.run_cycle(&Shutdown::never()).await.unwrap();

        assert_eq!(stats.failed, 1);
        assert!(sender.sent()[0].contains("disk full"));
    }

    #[tokio::test]
    async fn test_source_listing_failure_stops_loop() {
        let sources = MemorySources {
            fail_list: true,
            ..Default::default()
        };
        let fetcher = fetch_loop(
            Arc::new(MemoryArticles::default()),
            sources,
            FakeConnector::default(),
            &[],
            Reporter::disabled(),
        );

        let err = fetcher.start(Shutdown::never()).await.unwrap_err();
        assert!(!err.is_cancelled());
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_hung_fetch() {
        let sources = MemorySources {
            sources: vec![source(1, "Slow"), source(2, "Fast")],
            ..Default::default()
        };
        let connector = FakeConnector::default()
            .with(1, FeedBehavior::Hang)
            .with(2, FeedBehavior::Items(vec![item("One", "https://e.com/1")]));
        let fetcher = fetch_loop(
            Arc::new(MemoryArticles::default()),
            sources,
            connector,
            &[],
            Reporter::disabled(),
        );

        let (tx, shutdown) = crate::shutdown::channel();
        let task = tokio::spawn(async move { fetcher.start(shutdown).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(SHORT, task)
            .await
            .expect("fetch loop did not stop after shutdown")
            .unwrap();
        assert!(result.unwrap_err().is_cancelled());
    }
}
