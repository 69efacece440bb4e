use std::io::Cursor;
use std::sync::OnceLock;
use std::time::Duration;

use readability::extractor;
use regex::Regex;
use reqwest::Client;
use url::Url;

use crate::{Error, Result};

const USER_AGENT: &str = concat!("feedpost/", env!("CARGO_PKG_VERSION"));

/// Source of full article text for items that arrived without a body
#[async_trait::async_trait]
pub trait ContentProvider: Send + Sync {
    async fn fetch_text(&self, link: &str) -> Result<String>;
}

/// Downloads an article page and extracts its main readable content
#[derive(Clone)]
pub struct PageExtractor {
    client: Client,
}

impl PageExtractor {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl ContentProvider for PageExtractor {
    async fn fetch_text(&self, link: &str) -> Result<String> {
        let url = Url::parse(link)?;
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ContentExtraction(format!("{} returned HTTP {}", link, status)));
        }

        let html = response.text().await?;
        extract_readable(&html, &url)
    }
}

/// Run readability over raw HTML, returning the article text
pub fn extract_readable(html: &str, url: &Url) -> Result<String> {
    let mut cursor = Cursor::new(html.as_bytes());
    let product = extractor::extract(&mut cursor, url)
        .map_err(|e| Error::ContentExtraction(format!("{:?}", e)))?;

    Ok(product.text)
}

/// Collapse runs of three or more newlines into a single newline
pub fn normalize_text(text: &str) -> String {
    static BLANK_RUNS: OnceLock<Regex> = OnceLock::new();
    let re = BLANK_RUNS.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"));
    re.replace_all(text, "\n").into_owned()
}
