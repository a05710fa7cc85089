//! One poll cycle: fetch past the cursor, dispatch in id order, commit.
use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::handlers::{CommandDispatcher, Outcome};
use crate::model::InboundUpdate;
use crate::state::UpdateCursor;
use crate::transport::Transport;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Offset passed to the transport.
    pub offset: i64,
    pub fetched: usize,
    pub dispatched: usize,
    pub failed: usize,
    /// Cursor value after the commit.
    pub cursor: i64,
}

/// Sort by id and drop anything at or below `last`.
pub fn unseen(mut batch: Vec<InboundUpdate>, last: i64) -> Vec<InboundUpdate> {
    batch.retain(|u| u.id > last);
    batch.sort_by_key(|u| u.id);
    batch.dedup_by_key(|u| u.id);
    batch
}

/// Run a single cycle. The cursor only moves once every update of the batch
/// has been handed to the dispatcher; a crash before that re-delivers the batch.
#[instrument(skip_all)]
pub async fn run_cycle(
    transport: &dyn Transport,
    cursor: &UpdateCursor,
    dispatcher: &mut CommandDispatcher,
    limit: u8,
) -> Result<PollReport> {
    let last = cursor.load()?;
    let offset = UpdateCursor::next_offset(last);
    let batch = transport.get_updates(offset, limit).await?;
    let mut report = PollReport {
        offset,
        fetched: batch.len(),
        ..PollReport::default()
    };

    if batch.is_empty() {
        report.cursor = cursor.commit(last)?;
        info!(offset, cursor = report.cursor, "no pending updates");
        return Ok(report);
    }

    let mut max_seen = last;
    for update in unseen(batch, last) {
        max_seen = max_seen.max(update.id);
        if update.chat_id.is_none() || update.sender_id.is_none() {
            continue;
        }
        match dispatcher.handle(&update).await {
            Ok(Outcome::Ignored) => {}
            Ok(Outcome::Failed(command)) => {
                report.dispatched += 1;
                report.failed += 1;
                warn!(update_id = update.id, command = command.as_str(), "command answered with error");
            }
            Ok(_) => report.dispatched += 1,
            Err(err) => {
                report.failed += 1;
                warn!(?err, update_id = update.id, "dispatch failed");
            }
        }
    }

    report.cursor = cursor.commit(max_seen)?;
    info!(
        offset,
        fetched = report.fetched,
        dispatched = report.dispatched,
        failed = report.failed,
        cursor = report.cursor,
        "poll cycle complete"
    );
    Ok(report)
}
