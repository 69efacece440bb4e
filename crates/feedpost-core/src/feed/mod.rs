mod filter;
mod models;
mod parser;
mod source;

pub use filter::KeywordFilter;
pub use models::{Article, Item, NewArticle, NewSource, Source};
pub use parser::parse_feed;
pub use source::{probe_feed, FeedSource, RssConnector, RssSource, SourceConnector};
