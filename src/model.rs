use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved calendar reference, e.g. `Berachos 15`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub series_name: String,
    pub item_number: u32,
}

impl Reference {
    pub fn new(series_name: impl Into<String>, item_number: u32) -> Self {
        Self {
            series_name: series_name.into(),
            item_number,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.series_name, self.item_number)
    }
}

/// The catalog entry selected for a reference.
///
/// `media_url` is `None` when the detail page was fetched but held no
/// extractable media link; callers then link to `detail_url` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub title: String,
    pub detail_url: String,
    pub media_url: Option<String>,
    pub series_name: String,
    pub item_number: u32,
}

/// Inbound update as seen by the poll cycle, already flattened from the
/// transport's wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundUpdate {
    pub id: i64,
    pub chat_id: Option<i64>,
    pub sender_id: Option<i64>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: i32,
}
