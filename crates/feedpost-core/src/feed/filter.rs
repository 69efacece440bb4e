use std::collections::HashSet;

use super::models::Item;

/// Keyword blocklist applied to fetched items before they are stored.
///
/// An item is skipped when any keyword is a case-insensitive substring of its
/// title, or exactly equals (case-sensitively) one of its categories.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<String>,
    lowered: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        let lowered = keywords.iter().map(|k| k.to_lowercase()).collect();

        Self { keywords, lowered }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Returns the first keyword that excludes `item`, if any
    pub fn matching_keyword(&self, item: &Item) -> Option<&str> {
        if self.keywords.is_empty() {
            return None;
        }

        let title = item.title.to_lowercase();
        let categories: HashSet<&str> = item.categories.iter().map(String::as_str).collect();

        self.keywords
            .iter()
            .zip(&self.lowered)
            .find(|(keyword, lowered)| {
                title.contains(lowered.as_str()) || categories.contains(keyword.as_str())
            })
            .map(|(keyword, _)| keyword.as_str())
    }

    pub fn should_skip(&self, item: &Item) -> bool {
        self.matching_keyword(item).is_some()
    }
}
