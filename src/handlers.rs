//! Interactive command handling: rate gate, then one reply per command.
use anyhow::Result;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::clock::{civil_date, Clock};
use crate::commands::{self, Command};
use crate::delivery::deliver;
use crate::lookup::VideoLookup;
use crate::messages::Messages;
use crate::model::InboundUpdate;
use crate::ratelimit::RateLimiter;
use crate::state::SubscriberRegistry;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not a command, or a command nobody handles.
    Ignored,
    RateLimited,
    Replied(Command),
    /// The command failed and the requester got the generic error reply.
    Failed(Command),
}

pub struct CommandDispatcher {
    transport: Arc<dyn Transport>,
    lookup: VideoLookup,
    limiter: RateLimiter,
    subscribers: SubscriberRegistry,
    messages: Messages,
    clock: Arc<dyn Clock>,
    tz: Tz,
}

impl CommandDispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        lookup: VideoLookup,
        limiter: RateLimiter,
        subscribers: SubscriberRegistry,
        messages: Messages,
        clock: Arc<dyn Clock>,
        tz: Tz,
    ) -> Self {
        Self {
            transport,
            lookup,
            limiter,
            subscribers,
            messages,
            clock,
            tz,
        }
    }

    /// Dispatch one update. Updates without a chat or sender are ignored.
    ///
    /// Command failures are answered with the error reply and reported as
    /// [`Outcome::Failed`]; `Err` means even that could not be done.
    #[instrument(skip_all, fields(update_id = update.id))]
    pub async fn handle(&mut self, update: &InboundUpdate) -> Result<Outcome> {
        let (Some(chat_id), Some(sender_id)) = (update.chat_id, update.sender_id) else {
            debug!("update without chat or sender");
            return Ok(Outcome::Ignored);
        };
        let Some(parsed) = commands::parse(update.text.as_deref()) else {
            return Ok(Outcome::Ignored);
        };
        let Some(command) = parsed.command() else {
            debug!(name = %parsed.name, "unrecognized command");
            return Ok(Outcome::Ignored);
        };

        let now = self.clock.now();
        let admitted = match self.limiter.is_allowed(sender_id, now) {
            Ok(admitted) => admitted,
            Err(err) => {
                warn!(?err, sender_id, "rate limiter unavailable");
                self.transport
                    .send_message(chat_id, &self.messages.error())
                    .await?;
                return Ok(Outcome::Failed(command));
            }
        };
        if !admitted {
            let wait = self.limiter.reset_in(sender_id, now);
            info!(sender_id, wait_secs = wait.as_secs(), "rate limited");
            self.transport
                .send_message(chat_id, &self.messages.rate_limited(wait))
                .await?;
            return Ok(Outcome::RateLimited);
        }

        info!(chat_id, command = command.as_str(), "handling command");
        let res = match command {
            Command::Start => self.start(chat_id).await,
            Command::Help => self
                .transport
                .send_message(chat_id, self.messages.help())
                .await
                .map(|_| ())
                .map_err(Into::into),
            Command::Today => self.today(chat_id).await,
        };
        match res {
            Ok(()) => Ok(Outcome::Replied(command)),
            Err(err) => {
                warn!(?err, chat_id, command = command.as_str(), "command failed");
                self.transport
                    .send_message(chat_id, &self.messages.error())
                    .await?;
                Ok(Outcome::Failed(command))
            }
        }
    }

    async fn start(&self, chat_id: i64) -> Result<()> {
        self.subscribers.add(chat_id)?;
        self.transport
            .send_message(chat_id, self.messages.welcome())
            .await?;
        self.today(chat_id).await
    }

    async fn today(&self, chat_id: i64) -> Result<()> {
        let loading = match self
            .transport
            .send_message(chat_id, self.messages.loading())
            .await
        {
            Ok(sent) => Some(sent.message_id),
            Err(err) => {
                warn!(?err, chat_id, "failed to send loading message");
                None
            }
        };

        let date = civil_date(self.clock.now(), self.tz);
        let found = self.lookup.for_date(date).await;

        if let Some(message_id) = loading {
            if let Err(err) = self.transport.delete_message(chat_id, message_id).await {
                debug!(?err, chat_id, message_id, "failed to delete loading message");
            }
        }

        let video = found?;
        let how = deliver(
            self.transport.as_ref(),
            chat_id,
            &video,
            &self.messages.caption(&video),
        )
        .await?;
        info!(chat_id, title = %video.title, ?how, "sent today's video");
        Ok(())
    }
}
