use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use super::model::{BroadcastDoc, CachedResult, CursorDoc, SubscribersDoc};
use super::{read_doc, read_doc_strict, write_doc, BROADCAST_FILE, CACHE_FILE, CURSOR_FILE, SUBSCRIBERS_FILE};
use crate::model::MatchResult;

/// High-water mark of fully processed inbound update ids.
#[derive(Debug, Clone)]
pub struct UpdateCursor {
    path: PathBuf,
}

impl UpdateCursor {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(CURSOR_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last processed id, `0` before the first run.
    pub fn load(&self) -> Result<i64> {
        Ok(read_doc::<CursorDoc>(&self.path)?
            .map(|doc| doc.last_processed_update_id.max(0))
            .unwrap_or(0))
    }

    /// Offset for the next fetch: everything after `last`.
    pub fn next_offset(last: i64) -> i64 {
        last + 1
    }

    /// Persist `max(stored, max_seen)` and return it. Never moves backwards.
    #[instrument(skip(self))]
    pub fn commit(&self, max_seen: i64) -> Result<i64> {
        let stored = self.load()?;
        let next = stored.max(max_seen);
        write_doc(
            &self.path,
            &CursorDoc {
                last_processed_update_id: next,
            },
        )?;
        debug!(stored, next, "cursor committed");
        Ok(next)
    }
}

/// Single-slot cache of today's lookup.
#[derive(Debug, Clone)]
pub struct ResultCache {
    path: PathBuf,
}

impl ResultCache {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(CACHE_FILE),
        }
    }

    /// Cached result for `date_key`; stale and empty slots both miss.
    pub fn get(&self, date_key: &str) -> Result<Option<MatchResult>> {
        Ok(read_doc::<CachedResult>(&self.path)?
            .filter(|cached| cached.date_key == date_key)
            .map(|cached| cached.result))
    }

    /// Overwrite the slot.
    pub fn put(&self, date_key: &str, result: &MatchResult) -> Result<()> {
        write_doc(
            &self.path,
            &CachedResult {
                date_key: date_key.to_string(),
                result: result.clone(),
            },
        )
    }
}

/// Date of the last broadcast that reached at least one recipient.
#[derive(Debug, Clone)]
pub struct BroadcastLedger {
    path: PathBuf,
}

impl BroadcastLedger {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(BROADCAST_FILE),
        }
    }

    pub fn get(&self) -> Result<Option<String>> {
        Ok(read_doc_strict::<BroadcastDoc>(&self.path)?.map(|doc| doc.date_key))
    }

    pub fn put(&self, date_key: &str) -> Result<()> {
        write_doc(
            &self.path,
            &BroadcastDoc {
                date_key: date_key.to_string(),
            },
        )?;
        info!(date_key, "recorded broadcast");
        Ok(())
    }

    pub fn already_sent(&self, date_key: &str) -> Result<bool> {
        Ok(self.get()?.as_deref() == Some(date_key))
    }
}

/// Chats that opted in with `/start`. Read strictly: a damaged document is
/// reported, never replaced.
#[derive(Debug, Clone)]
pub struct SubscriberRegistry {
    path: PathBuf,
}

impl SubscriberRegistry {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(SUBSCRIBERS_FILE),
        }
    }

    /// Subscribed chat ids, duplicates removed.
    pub fn list(&self) -> Result<Vec<i64>> {
        let mut ids = read_doc_strict::<SubscribersDoc>(&self.path)?
            .map(|doc| doc.chat_ids)
            .unwrap_or_default();
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(*id));
        Ok(ids)
    }

    pub fn contains(&self, chat_id: i64) -> Result<bool> {
        Ok(self.list()?.contains(&chat_id))
    }

    /// Returns whether `chat_id` was newly added.
    #[instrument(skip(self))]
    pub fn add(&self, chat_id: i64) -> Result<bool> {
        let mut chat_ids = self.list()?;
        if chat_ids.contains(&chat_id) {
            return Ok(false);
        }
        chat_ids.push(chat_id);
        write_doc(&self.path, &SubscribersDoc { chat_ids })?;
        info!(chat_id, "new subscriber");
        Ok(true)
    }
}
