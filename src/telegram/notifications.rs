use async_trait::async_trait;
use secrecy::ExposeSecret;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, Recipient};

use crate::core::config::{ChatTarget, TelegramConfig};
use crate::core::error::AppResult;
use crate::core::utils::escape_html;

/// Best-effort outbound text channel for significant recorder events.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> AppResult<()>;
}

/// Used when no notification credentials are configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _text: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Sends notifications to a Telegram chat or channel through the Bot API.
pub struct TelegramNotifier {
    bot: Bot,
    recipient: Recipient,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Self {
        let recipient = match config.chat {
            ChatTarget::Id(id) => Recipient::Id(ChatId(id)),
            ChatTarget::Username(ref name) => Recipient::ChannelUsername(name.clone()),
        };
        Self {
            bot: Bot::new(config.token.expose_secret()),
            recipient,
        }
    }
}

/// Formats a status line as the HTML message body.
pub fn format_notification(text: &str) -> String {
    format!("🤖livegrab\n<code>{}</code>", escape_html(text))
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> AppResult<()> {
        self.bot
            .send_message(self.recipient.clone(), format_notification(text))
            .parse_mode(ParseMode::Html)
            .await?;
        log::debug!("Telegram notification sent");
        Ok(())
    }
}
