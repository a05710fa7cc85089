use tracing::{info, warn};

use crate::error::TransportError;
use crate::model::MatchResult;
use crate::transport::Transport;

/// How a video reached the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivered {
    Media,
    /// No media URL was found; the caption links the detail page.
    Text,
    /// A media URL was found but the media send failed.
    TextFallback,
}

/// Send `video` as media when possible, otherwise as text carrying `caption`.
pub async fn deliver(
    transport: &dyn Transport,
    chat_id: i64,
    video: &MatchResult,
    caption: &str,
) -> Result<Delivered, TransportError> {
    let Some(media_url) = video.media_url.as_deref() else {
        transport.send_message(chat_id, caption).await?;
        info!(chat_id, "sent link (no media url)");
        return Ok(Delivered::Text);
    };
    match transport.send_media(chat_id, media_url, caption).await {
        Ok(_) => {
            info!(chat_id, %media_url, "sent media");
            Ok(Delivered::Media)
        }
        Err(err) => {
            warn!(?err, chat_id, %media_url, "media send failed; falling back to link");
            transport.send_message(chat_id, caption).await?;
            Ok(Delivered::TextFallback)
        }
    }
}
