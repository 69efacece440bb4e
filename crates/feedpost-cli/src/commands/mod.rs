pub mod fetch;
pub mod health;
pub mod publish;
pub mod run;
pub mod source;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use feedpost_core::{
    ai::Summarizer,
    content::PageExtractor,
    feed::{KeywordFilter, RssConnector},
    reporter::Reporter,
    scheduler::{FetchLoop, PublishLoop},
    storage::{ArticleRepository, Database, SourceRepository},
    telegram::{ChannelSender, ChatSender, TelegramBot},
    AppConfig,
};

/// Reporter for the admin chat, or a disabled one when none is configured
pub fn build_reporter(config: &AppConfig) -> Reporter {
    let Some(chat_id) = config.admin_chat() else {
        info!("No admin chat configured, error reports disabled");
        return Reporter::disabled();
    };

    match TelegramBot::from_config(&config.telegram) {
        Ok(bot) => Reporter::new(Arc::new(ChatSender::new(bot, chat_id))),
        Err(e) => {
            warn!("Error reports disabled: {}", e);
            Reporter::disabled()
        }
    }
}

pub fn build_fetch_loop(config: &AppConfig, db: &Database, reporter: Reporter) -> FetchLoop {
    FetchLoop::new(
        Arc::new(ArticleRepository::new(db)),
        Arc::new(SourceRepository::new(db)),
        Arc::new(RssConnector::new(config.sync.request_timeout())),
        KeywordFilter::new(&config.sync.filter_keywords),
        config.sync.fetch_interval(),
        reporter,
    )
}

pub fn build_publish_loop(
    config: &AppConfig,
    db: &Database,
    reporter: Reporter,
) -> Result<PublishLoop> {
    config.validate_for_publishing()?;

    let bot = TelegramBot::from_config(&config.telegram)?;
    let summarizer = Summarizer::new(config)?;
    let pages = PageExtractor::new(config.sync.page_timeout())?;

    Ok(PublishLoop::new(
        Arc::new(ArticleRepository::new(db)),
        Arc::new(SourceRepository::new(db)),
        Arc::new(pages),
        summarizer,
        Arc::new(ChannelSender::new(bot, config.telegram.channel_id)),
    )
    .with_schedule(config.sync.publish_interval(), config.sync.lookback())
    .with_reporter(reporter))
}
