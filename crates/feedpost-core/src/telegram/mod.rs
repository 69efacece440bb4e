mod client;
pub mod markup;

pub use client::{ParseMode, TelegramBot};
pub use markup::{escape_markdown, escape_markdown_truncated, message_len};

use crate::Result;

/// Outbound message destination
#[async_trait::async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Publishes MarkdownV2 messages to the destination channel
pub struct ChannelSender {
    bot: TelegramBot,
    channel_id: i64,
}

impl ChannelSender {
    pub fn new(bot: TelegramBot, channel_id: i64) -> Self {
        Self { bot, channel_id }
    }
}

#[async_trait::async_trait]
impl MessageSender for ChannelSender {
    async fn send(&self, text: &str) -> Result<()> {
        self.bot
            .send_message(self.channel_id, text, Some(ParseMode::MarkdownV2))
            .await
    }
}

/// Sends plain-text messages to a single chat, used for operator reports
pub struct ChatSender {
    bot: TelegramBot,
    chat_id: i64,
}

impl ChatSender {
    pub fn new(bot: TelegramBot, chat_id: i64) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait::async_trait]
impl MessageSender for ChatSender {
    async fn send(&self, text: &str) -> Result<()> {
        self.bot.send_message(self.chat_id, text, None).await
    }
}
