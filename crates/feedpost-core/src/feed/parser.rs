use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;

use super::models::Item;
use crate::{Error, Result};

/// Text wrap width used when flattening HTML bodies
const TEXT_WIDTH: usize = 120;

/// Parse RSS/Atom content into items attributed to `source_name`.
///
/// Either every entry is mapped or the whole document is rejected.
pub fn parse_feed(content: &[u8], source_name: &str) -> Result<Vec<Item>> {
    let feed = parser::parse(content)
        .map_err(|e| Error::FeedParse(e.to_string()))?;

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| entry_to_item(entry, source_name))
        .collect())
}

fn entry_to_item(entry: Entry, source_name: &str) -> Item {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .unwrap_or_default();

    let link = entry
        .links
        .first()
        .map(|l| l.href.trim().to_string())
        .unwrap_or_default();

    let categories = entry
        .categories
        .iter()
        .map(|c| c.term.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let date = entry
        .published
        .or(entry.updated)
        .map(|dt| DateTime::<Utc>::from(dt));

    Item {
        title,
        categories,
        link,
        date,
        summary: entry_text(&entry),
        source_name: source_name.to_string(),
    }
}

/// Full content if present, otherwise the excerpt, otherwise empty
fn entry_text(entry: &Entry) -> String {
    let content = entry
        .content
        .as_ref()
        .and_then(|c| c.body.as_deref())
        .map(str::trim)
        .filter(|body| !body.is_empty());

    let excerpt = entry
        .summary
        .as_ref()
        .map(|s| s.content.trim())
        .filter(|s| !s.is_empty());

    match content.or(excerpt) {
        Some(html) => html_to_text(html).trim().to_string(),
        None => String::new(),
    }
}

/// Convert HTML content to plain text
fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), TEXT_WIDTH)
        .unwrap_or_else(|_| html.to_string())
}
