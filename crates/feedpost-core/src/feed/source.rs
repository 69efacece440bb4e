use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;

use super::models::{Item, Source};
use super::parser::parse_feed;
use crate::shutdown::Shutdown;
use crate::{Error, Result};

const MAX_FEED_BYTES: usize = 5 * 1024 * 1024;
const USER_AGENT: &str = concat!("feedpost/", env!("CARGO_PKG_VERSION"), " (+RSS reader)");

/// A fetchable feed bound to one persisted source
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    fn id(&self) -> i64;

    fn name(&self) -> &str;

    /// Fetch every item of the feed, or fail as a whole
    async fn fetch(&self, shutdown: &Shutdown) -> Result<Vec<Item>>;
}

/// Turns persisted sources into fetchable feeds
pub trait SourceConnector: Send + Sync {
    fn connect(&self, source: &Source) -> Result<Arc<dyn FeedSource>>;
}

/// Builds [`RssSource`]s that share one request timeout.
///
/// Sources are kept between cycles and rebuilt only when their row changes.
pub struct RssConnector {
    timeout: Duration,
    cache: Mutex<HashMap<i64, Arc<RssSource>>>,
}

impl RssConnector {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl SourceConnector for RssConnector {
    fn connect(&self, source: &Source) -> Result<Arc<dyn FeedSource>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.get(&source.id).filter(|c| c.matches(source)) {
            return Ok(cached.clone());
        }

        let rss = Arc::new(RssSource::from_source(source, self.timeout)?);
        if source.insecure {
            tracing::warn!("TLS certificate validation disabled for feed '{}'", source.name);
        }
        cache.insert(source.id, rss.clone());
        Ok(rss)
    }
}

/// RSS/Atom feed fetched over HTTP
pub struct RssSource {
    id: i64,
    name: String,
    url: String,
    insecure: bool,
    client: Client,
}

impl RssSource {
    pub fn from_source(source: &Source, timeout: Duration) -> Result<Self> {
        Ok(Self {
            id: source.id,
            name: source.name.clone(),
            url: source.feed_url.clone(),
            insecure: source.insecure,
            client: build_client(timeout, source.insecure)?,
        })
    }

    /// Whether this was built from an identical source row
    fn matches(&self, source: &Source) -> bool {
        self.id == source.id
            && self.name == source.name
            && self.url == source.feed_url
            && self.insecure == source.insecure
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn load(&self) -> Result<Vec<Item>> {
        let content = fetch_feed_bytes(&self.client, &self.url).await?;
        parse_feed(&content, &self.name)
    }
}

#[async_trait::async_trait]
impl FeedSource for RssSource {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, shutdown: &Shutdown) -> Result<Vec<Item>> {
        tracing::debug!("Fetching feed '{}' from {}", self.name, self.url);
        shutdown.run_until(self.load()).await
    }
}

/// Fetch and parse a feed once, used to validate a URL before it is stored
pub async fn probe_feed(url: &str, insecure: bool, timeout: Duration) -> Result<usize> {
    url::Url::parse(url)?;
    if insecure {
        tracing::warn!("TLS certificate validation disabled for {}", url);
    }
    let client = build_client(timeout, insecure)?;
    let content = fetch_feed_bytes(&client, url).await?;
    Ok(parse_feed(&content, "")?.len())
}

/// Build HTTP client, optionally accepting invalid certificates
fn build_client(timeout: Duration, insecure: bool) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(concat!(
            "application/rss+xml,application/atom+xml,",
            "application/xml;q=0.9,text/xml;q=0.8,*/*;q=0.5",
        )),
    );

    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .redirect(reqwest::redirect::Policy::limited(10))
        .danger_accept_invalid_certs(insecure)
        .build()
        .map_err(Error::Http)
}

async fn fetch_feed_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::FeedParse(format!("HTTP {} for URL: {}", status, url)));
    }

    if let Some(length) = response.content_length() {
        ensure_content_size(length as usize, url)?;
    }

    let bytes = response.bytes().await?;
    ensure_content_size(bytes.len(), url)?;

    Ok(bytes.to_vec())
}

fn ensure_content_size(size: usize, url: &str) -> Result<()> {
    if size > MAX_FEED_BYTES {
        return Err(Error::FeedParse(format!(
            "Feed too large ({} bytes) for URL: {}",
            size, url
        )));
    }
    Ok(())
}
