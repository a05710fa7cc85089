//! Resolves a civil date into the day's [`Reference`] via the calendar service.
use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::{LookupError, TransportError};
use crate::model::Reference;

/// Calendar transliterations that differ from the catalog's.
const STANDARD_NAMES: &[(&str, &str)] = &[
    ("Berakhot", "Berachos"),
    ("Shabbat", "Shabbos"),
    ("Sukkah", "Succah"),
    ("Taanit", "Taanis"),
    ("Megillah", "Megilah"),
    ("Chagigah", "Chagiga"),
    ("Yevamot", "Yevamos"),
    ("Ketubot", "Kesuvos"),
    ("Gittin", "Gitin"),
    ("Kiddushin", "Kidushin"),
    ("Bava Kamma", "Bava Kama"),
    ("Bava Batra", "Bava Basra"),
    ("Makkot", "Makos"),
    ("Shevuot", "Shevuos"),
    ("Horayot", "Horayos"),
    ("Menachot", "Menachos"),
    ("Chullin", "Chulin"),
    ("Bekhorot", "Bechoros"),
    ("Arakhin", "Erchin"),
    ("Keritot", "Kerisus"),
    ("Niddah", "Nidah"),
];

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(.+)\s+(\d+)\s*$").expect("valid title pattern"));

/// Immutable calendar-name -> catalog-name table. Unmapped names pass through.
#[derive(Debug, Clone)]
pub struct NameTable {
    entries: HashMap<String, String>,
}

impl Default for NameTable {
    fn default() -> Self {
        Self {
            entries: STANDARD_NAMES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

impl NameTable {
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut table = Self::default();
        for (from, to) in overrides {
            table.entries.insert(from.clone(), to.clone());
        }
        table
    }

    pub fn translate<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries.get(name).map(String::as_str).unwrap_or(name)
    }
}

/// Split `"<name> <integer>"` into its parts. The name is everything before
/// the trailing run of digits.
pub fn parse_title(title: &str) -> Result<(String, u32), LookupError> {
    let caps = TITLE_RE
        .captures(title)
        .ok_or_else(|| LookupError::ResolutionParse(title.to_string()))?;
    let name = caps[1].trim().to_string();
    let number = caps[2]
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| LookupError::ResolutionParse(title.to_string()))?;
    Ok((name, number))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CalendarItem {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct CalendarResponse {
    #[serde(default)]
    items: Vec<CalendarItem>,
}

/// The external date -> items lookup.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn items_for(&self, date: NaiveDate) -> Result<Vec<CalendarItem>, TransportError>;
}

/// Hebcal-style JSON calendar over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCalendar {
    http: Client,
    base_url: String,
}

impl HttpCalendar {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .user_agent("daf-history-bot/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, TransportError> {
        Self::new(cfg.calendar.base_url.clone(), cfg.request_timeout())
    }
}

#[async_trait]
impl CalendarSource for HttpCalendar {
    async fn items_for(&self, date: NaiveDate) -> Result<Vec<CalendarItem>, TransportError> {
        let day = date.format("%Y-%m-%d").to_string();
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("v", "1"),
                ("cfg", "json"),
                ("F", "on"),
                ("start", day.as_str()),
                ("end", day.as_str()),
            ])
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(TransportError::Rejected { status, body });
        }
        let payload: CalendarResponse = res.json().await?;
        debug!(date = %day, items = payload.items.len(), "calendar response");
        Ok(payload.items)
    }
}

/// Turns a civil date into the day's reference in catalog vocabulary.
pub struct ReferenceResolver {
    source: Box<dyn CalendarSource>,
    category: String,
    names: NameTable,
}

impl ReferenceResolver {
    pub fn new(source: Box<dyn CalendarSource>, category: impl Into<String>, names: NameTable) -> Self {
        Self {
            source,
            category: category.into(),
            names,
        }
    }

    /// One calendar query, no retries.
    #[instrument(skip(self))]
    pub async fn resolve(&self, date: NaiveDate) -> Result<Reference, LookupError> {
        let items = self.source.items_for(date).await?;
        let item = items
            .iter()
            .find(|item| item.category == self.category)
            .ok_or_else(|| LookupError::ResolutionNotFound {
                date,
                category: self.category.clone(),
            })?;
        let (name, number) = parse_title(&item.title)?;
        let reference = Reference::new(self.names.translate(&name), number);
        info!(%date, calendar_title = %item.title, %reference, "resolved reference");
        Ok(reference)
    }
}
