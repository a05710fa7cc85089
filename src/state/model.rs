//! Persisted JSON documents, one fact per file.
//!
//! Field names are camelCase on disk; keep these structs plain data and put
//! behaviour in `repo`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::MatchResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorDoc {
    pub last_processed_update_id: i64,
}

/// The single cached lookup, valid only while `date_key` is today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResult {
    pub date_key: String,
    #[serde(flatten)]
    pub result: MatchResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribersDoc {
    pub chat_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastDoc {
    pub date_key: String,
}

/// Requester id -> admission timestamps (unix seconds).
pub type RateLimitDoc = BTreeMap<String, Vec<f64>>;
