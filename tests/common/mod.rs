#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use daf_history_bot::calendar::{CalendarItem, CalendarSource, NameTable, ReferenceResolver};
use daf_history_bot::catalog::{CatalogMatcher, PageFetcher};
use daf_history_bot::error::TransportError;
use daf_history_bot::lookup::VideoLookup;
use daf_history_bot::model::{InboundUpdate, SentMessage};
use daf_history_bot::state::ResultCache;
use daf_history_bot::transport::Transport;

pub const SERIES_URL: &str = "https://alldaf.org/series/3940";
pub const DETAIL_URL: &str = "https://alldaf.org/p/12347";
pub const MEDIA_URL: &str = "https://cdn.jwplayer.com/videos/abc123XYZ.mp4";

pub const LISTING_HTML: &str = r#"
<html><body>
  <nav><a href="/series/3940">Jewish History</a></nav>
  <ul>
    <li><a href="/p/12345">Berachos 2 - Beginnings of the Oral Law</a></li>
    <li><a href="/p/12346">Berachos 3 - Babylonia</a></li>
    <li><a href="/p/12347">Berachos 15 - Medieval Era</a></li>
    <li><a href="/p/12399">Berachos 150 - Out of range</a></li>
  </ul>
</body></html>
"#;

pub const DETAIL_HTML: &str = r#"
<html><body>
  <div id="player"></div>
  <script>
    jwplayer("player").setup({
      file: "https://content.jwplatform.com/videos/abc123XYZ.mp4",
      image: "https://cdn.jwplayer.com/thumbs/abc123XYZ.jpg"
    });
  </script>
</body></html>
"#;

/// Wed 2026-03-11 06:30 in Jerusalem.
pub fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 11, 4, 30, 0).unwrap()
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 11).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetUpdates { offset: i64, limit: u8 },
    Text { chat_id: i64, text: String },
    Media { chat_id: i64, url: String, caption: String },
    Delete { chat_id: i64, message_id: i32 },
}

/// Records every call; failures are configured per chat or per text.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    batches: Arc<Mutex<VecDeque<Vec<InboundUpdate>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
    failing_chats: Arc<Mutex<HashSet<i64>>>,
    failing_text: Arc<Mutex<Option<String>>>,
    media_fails: Arc<Mutex<bool>>,
    updates_fail: Arc<Mutex<bool>>,
    next_message_id: Arc<AtomicI32>,
}

impl RecordingTransport {
    pub fn with_batches(batches: Vec<Vec<InboundUpdate>>) -> Self {
        Self {
            batches: Arc::new(Mutex::new(VecDeque::from(batches))),
            ..Default::default()
        }
    }

    pub async fn fail_chat(&self, chat_id: i64) {
        self.failing_chats.lock().await.insert(chat_id);
    }

    /// Text sends containing `needle` fail.
    pub async fn fail_text_containing(&self, needle: &str) {
        *self.failing_text.lock().await = Some(needle.to_string());
    }

    pub async fn fail_updates(&self) {
        *self.updates_fail.lock().await = true;
    }

    pub async fn fail_media(&self) {
        *self.media_fails.lock().await = true;
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    /// Text and media sends, in order, as `(chat_id, body)`.
    pub async fn sends(&self) -> Vec<(i64, String)> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                Call::Text { chat_id, text } => Some((chat_id, text)),
                Call::Media { chat_id, url, .. } => Some((chat_id, url)),
                _ => None,
            })
            .collect()
    }

    async fn check(&self, chat_id: i64) -> Result<SentMessage, TransportError> {
        if self.failing_chats.lock().await.contains(&chat_id) {
            return Err(TransportError::Rejected {
                status: 403,
                body: "bot was blocked by the user".into(),
            });
        }
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SentMessage { message_id })
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn get_updates(&self, offset: i64, limit: u8) -> Result<Vec<InboundUpdate>, TransportError> {
        self.calls.lock().await.push(Call::GetUpdates { offset, limit });
        if *self.updates_fail.lock().await {
            return Err(TransportError::Conflict("terminated by other getUpdates request".into()));
        }
        Ok(self.batches.lock().await.pop_front().unwrap_or_default())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<SentMessage, TransportError> {
        self.calls.lock().await.push(Call::Text {
            chat_id,
            text: text.to_string(),
        });
        if let Some(needle) = self.failing_text.lock().await.as_deref() {
            if text.contains(needle) {
                return Err(TransportError::Timeout("send timed out".into()));
            }
        }
        self.check(chat_id).await
    }

    async fn send_media(
        &self,
        chat_id: i64,
        media_url: &str,
        caption: &str,
    ) -> Result<SentMessage, TransportError> {
        self.calls.lock().await.push(Call::Media {
            chat_id,
            url: media_url.to_string(),
            caption: caption.to_string(),
        });
        if *self.media_fails.lock().await {
            return Err(TransportError::Timeout("upload timed out".into()));
        }
        self.check(chat_id).await
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError> {
        self.calls.lock().await.push(Call::Delete { chat_id, message_id });
        Ok(())
    }
}

/// Same items for every date; counts queries.
#[derive(Clone)]
pub struct StaticCalendar {
    items: Vec<CalendarItem>,
    pub queries: Arc<AtomicUsize>,
}

impl StaticCalendar {
    pub fn new(items: &[(&str, &str)]) -> Self {
        Self {
            items: items
                .iter()
                .map(|(category, title)| CalendarItem {
                    category: category.to_string(),
                    title: title.to_string(),
                })
                .collect(),
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn daf(title: &str) -> Self {
        Self::new(&[("parashat", "Parashat Vayakhel"), ("dafyomi", title)])
    }
}

#[async_trait]
impl CalendarSource for StaticCalendar {
    async fn items_for(&self, _date: NaiveDate) -> Result<Vec<CalendarItem>, TransportError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.clone())
    }
}

/// URL -> HTML; anything else is a 404.
#[derive(Clone, Default)]
pub struct StaticPages {
    pages: HashMap<String, String>,
    pub fetched: Arc<Mutex<Vec<String>>>,
}

impl StaticPages {
    pub fn site() -> Self {
        Self::default()
            .with(SERIES_URL, LISTING_HTML)
            .with(DETAIL_URL, DETAIL_HTML)
    }

    pub fn with(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for StaticPages {
    async fn fetch(&self, url: &str) -> Result<String, TransportError> {
        self.fetched.lock().await.push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::Rejected {
                status: 404,
                body: format!("no page at {url}"),
            })
    }
}

pub fn lookup(
    calendar: StaticCalendar,
    pages: StaticPages,
    state_dir: Option<&Path>,
) -> VideoLookup {
    let resolver = ReferenceResolver::new(Box::new(calendar), "dafyomi", NameTable::default());
    let matcher = CatalogMatcher::new(
        Box::new(pages),
        reqwest::Url::parse("https://alldaf.org").unwrap(),
        SERIES_URL,
        "/p/",
        vec!["daf".to_string()],
    );
    VideoLookup::new(resolver, matcher, state_dir.map(ResultCache::new))
}

pub fn update(id: i64, chat_id: i64, text: &str) -> InboundUpdate {
    InboundUpdate {
        id,
        chat_id: Some(chat_id),
        sender_id: Some(chat_id),
        text: Some(text.to_string()),
    }
}
