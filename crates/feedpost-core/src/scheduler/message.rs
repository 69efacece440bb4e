use crate::feed::Article;
use crate::telegram::{escape_markdown, escape_markdown_truncated, message_len};

/// Categories beyond this many are left off the hashtag line
const MAX_CATEGORY_TAGS: usize = 3;

/// Telegram's cap on message text, in UTF-16 code units
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Titles are cut here so an absurd one cannot crowd out the link
const MAX_TITLE_LEN: usize = 512;

const BLOCK_SEPARATOR: &str = "\n\n";

/// Source name used when the owning source cannot be looked up
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Turn a label into a single hashtag token, or `None` if it is blank
fn hashtag(label: &str) -> Option<String> {
    let token = label.split_whitespace().collect::<Vec<_>>().join("_");
    if token.is_empty() {
        return None;
    }
    Some(format!("\\#{}", escape_markdown(&token)))
}

/// MarkdownV2 hashtag line: the source name, then the first three non-empty categories
pub fn hashtags(source_name: &str, categories: &[String]) -> String {
    hashtag(source_name)
        .into_iter()
        .chain(
            categories
                .iter()
                .filter_map(|c| hashtag(c))
                .take(MAX_CATEGORY_TAGS),
        )
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format an article for the channel. `summary` may be empty.
///
/// The summary is cut so the whole message stays within [`MAX_MESSAGE_LEN`].
pub fn compose_message(article: &Article, summary: &str, source_name: &str) -> String {
    let title = escape_markdown_truncated(article.title.trim(), MAX_TITLE_LEN);
    let mut message = format!("*{}*", title);

    let mut tail = String::from(BLOCK_SEPARATOR);
    tail.push_str(&escape_markdown(&article.link));
    let tags = hashtags(source_name, &article.categories);
    if !tags.is_empty() {
        tail.push('\n');
        tail.push_str(&tags);
    }

    let summary = summary.trim();
    if !summary.is_empty() {
        let used = message_len(&message) + message_len(BLOCK_SEPARATOR) + message_len(&tail);
        let summary = escape_markdown_truncated(summary, MAX_MESSAGE_LEN.saturating_sub(used));
        if !summary.is_empty() {
            message.push_str(BLOCK_SEPARATOR);
            message.push_str(&summary);
        }
    }

    message.push_str(&tail);
    message
}
