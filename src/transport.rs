//! Messaging transport: the four calls the bot needs, and a Telegram implementation.
use async_trait::async_trait;
use reqwest::Url;
use std::fmt;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, InputFile, MessageId, Update, UpdateKind};
use teloxide::{ApiError, RequestError};
use tracing::debug;

use crate::config::Config;
use crate::error::TransportError;
use crate::model::{InboundUpdate, SentMessage};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Updates with id >= `offset`. Acknowledgement happens on the next call.
    async fn get_updates(&self, offset: i64, limit: u8) -> Result<Vec<InboundUpdate>, TransportError>;

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<SentMessage, TransportError>;

    async fn send_media(
        &self,
        chat_id: i64,
        media_url: &str,
        caption: &str,
    ) -> Result<SentMessage, TransportError>;

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError>;
}

/// Telegram Bot API over teloxide. Media sends go through a second client
/// with the longer upload timeout.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    media_bot: Bot,
}

impl fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramTransport").finish_non_exhaustive()
    }
}

impl TelegramTransport {
    pub fn new(token: &str, timeout: Duration, media_timeout: Duration) -> Result<Self, TransportError> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(timeout)
            .build()?;
        let media_client = teloxide::net::default_reqwest_settings()
            .timeout(media_timeout)
            .build()?;
        Ok(Self {
            bot: Bot::with_client(token, client),
            media_bot: Bot::with_client(token, media_client),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, TransportError> {
        Self::new(&cfg.telegram.bot_token, cfg.request_timeout(), cfg.media_timeout())
    }
}

fn map_request_error(err: RequestError) -> TransportError {
    let text = err.to_string();
    match &err {
        RequestError::Api(ApiError::TerminatedByOtherGetUpdates) => TransportError::Conflict(text),
        RequestError::Network(e) if e.is_timeout() => TransportError::Timeout(text),
        RequestError::Network(_) => TransportError::Network(text),
        RequestError::InvalidJson { .. } => TransportError::InvalidResponse(text),
        _ => TransportError::Api(text),
    }
}

fn flatten_update(update: Update) -> InboundUpdate {
    let id = i64::from(update.id);
    match update.kind {
        UpdateKind::Message(msg) => InboundUpdate {
            id,
            chat_id: Some(msg.chat.id.0),
            sender_id: msg.from().map(|u| u.id.0 as i64),
            text: msg.text().map(str::to_owned),
        },
        _ => InboundUpdate {
            id,
            chat_id: None,
            sender_id: None,
            text: None,
        },
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn get_updates(&self, offset: i64, limit: u8) -> Result<Vec<InboundUpdate>, TransportError> {
        let offset = i32::try_from(offset)
            .map_err(|_| TransportError::InvalidResponse(format!("offset {offset} out of range")))?;
        let updates = self
            .bot
            .get_updates()
            .offset(offset)
            .limit(limit)
            .timeout(0)
            .allowed_updates(vec![AllowedUpdate::Message])
            .await
            .map_err(map_request_error)?;
        debug!(offset, count = updates.len(), "fetched updates");
        Ok(updates.into_iter().map(flatten_update).collect())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<SentMessage, TransportError> {
        let msg = self
            .bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(map_request_error)?;
        Ok(SentMessage { message_id: msg.id.0 })
    }

    async fn send_media(
        &self,
        chat_id: i64,
        media_url: &str,
        caption: &str,
    ) -> Result<SentMessage, TransportError> {
        let url = Url::parse(media_url)
            .map_err(|e| TransportError::InvalidResponse(format!("media url {media_url}: {e}")))?;
        let msg = self
            .media_bot
            .send_video(ChatId(chat_id), InputFile::url(url))
            .caption(caption)
            .supports_streaming(true)
            .await
            .map_err(map_request_error)?;
        Ok(SentMessage { message_id: msg.id.0 })
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(map_request_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_distinguished() {
        let err = map_request_error(RequestError::Api(ApiError::TerminatedByOtherGetUpdates));
        assert!(matches!(err, TransportError::Conflict(_)));

        let err = map_request_error(RequestError::Api(ApiError::MessageToDeleteNotFound));
        assert!(matches!(err, TransportError::Api(_)));
    }

    #[test]
    fn transport_builds_without_network() {
        let transport =
            TelegramTransport::new("123:abc", Duration::from_secs(30), Duration::from_secs(60)).unwrap();
        assert_eq!(format!("{transport:?}"), "TelegramTransport { .. }");
    }
}
