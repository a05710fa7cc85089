//! Scheduled daily broadcast: window gate, ledger gate, lookup, fan-out.
use anyhow::Result;
use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::clock::{civil_date, date_key, Clock};
use crate::config;
use crate::delivery::deliver;
use crate::lookup::VideoLookup;
use crate::messages::Messages;
use crate::state::{BroadcastLedger, SubscriberRegistry};
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastOutcome {
    OutsideWindow,
    AlreadySent { date_key: String },
    Delivered { succeeded: usize, failed: usize },
}

/// Whether local time falls in `[send_hour - before, send_hour + after]`.
pub fn within_send_window(now_local: DateTime<Tz>, settings: &config::Broadcast) -> bool {
    let minute_of_day = i64::from(now_local.hour() * 60 + now_local.minute());
    let target = i64::from(settings.send_hour * 60);
    let start = target - i64::from(settings.window_minutes_before);
    let end = target + i64::from(settings.window_minutes_after);
    (start..=end).contains(&minute_of_day)
}

/// Static recipient first unless it already subscribed, then subscribers.
pub fn recipients(static_chat: Option<i64>, subscribers: &[i64]) -> Vec<i64> {
    let mut out = Vec::with_capacity(subscribers.len() + 1);
    if let Some(id) = static_chat {
        if !subscribers.contains(&id) {
            out.push(id);
        }
    }
    out.extend_from_slice(subscribers);
    out
}

pub struct Broadcaster {
    transport: Arc<dyn Transport>,
    lookup: VideoLookup,
    subscribers: SubscriberRegistry,
    ledger: BroadcastLedger,
    messages: Messages,
    clock: Arc<dyn Clock>,
    tz: Tz,
    static_chat: Option<i64>,
    settings: config::Broadcast,
}

impl Broadcaster {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport: Arc<dyn Transport>,
        lookup: VideoLookup,
        subscribers: SubscriberRegistry,
        ledger: BroadcastLedger,
        messages: Messages,
        clock: Arc<dyn Clock>,
        tz: Tz,
        static_chat: Option<i64>,
        settings: config::Broadcast,
    ) -> Self {
        Self {
            transport,
            lookup,
            subscribers,
            ledger,
            messages,
            clock,
            tz,
            static_chat,
            settings,
        }
    }

    /// `force` skips the send window only; the ledger is always honored.
    #[instrument(skip(self))]
    pub async fn run(&self, force: bool) -> Result<BroadcastOutcome> {
        let now = self.clock.now();
        let local = now.with_timezone(&self.tz);
        if !force && !within_send_window(local, &self.settings) {
            info!(local = %local.format("%H:%M"), "outside send window");
            return Ok(BroadcastOutcome::OutsideWindow);
        }

        let today = date_key(civil_date(now, self.tz));
        if self.ledger.already_sent(&today)? {
            info!(date_key = %today, "already broadcast today");
            return Ok(BroadcastOutcome::AlreadySent { date_key: today });
        }

        let video = self.lookup.for_date(local.date_naive()).await?;
        let caption = self.messages.daily_broadcast(&video);
        let targets = recipients(self.static_chat, &self.subscribers.list()?);
        info!(title = %video.title, recipients = targets.len(), "broadcasting");

        let transport = self.transport.as_ref();
        let (video_ref, caption) = (&video, caption.as_str());
        let results: Vec<bool> = stream::iter(targets)
            .map(move |chat_id| async move {
                match deliver(transport, chat_id, video_ref, caption).await {
                    Ok(_) => true,
                    Err(err) => {
                        warn!(?err, chat_id, "broadcast delivery failed");
                        false
                    }
                }
            })
            .buffer_unordered(self.settings.parallelism.max(1))
            .collect()
            .await;

        let succeeded = results.iter().filter(|ok| **ok).count();
        let failed = results.len() - succeeded;
        if succeeded > 0 {
            self.ledger.put(&today)?;
        } else {
            warn!(date_key = %today, failed, "no recipient received the broadcast");
        }
        info!(succeeded, failed, "broadcast finished");
        Ok(BroadcastOutcome::Delivered { succeeded, failed })
    }
}
