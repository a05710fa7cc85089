use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::error::{LookupError, TransportError};
use crate::model::{MatchResult, Reference};

pub mod model;

pub use model::CatalogLink;

const MEDIA_CDN_BASE: &str = "https://cdn.jwplayer.com/videos/";

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

static MEDIA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https://(?:cdn\.jwplayer\.com|content\.jwplatform\.com)/videos/([A-Za-z0-9]+)\.mp4")
        .expect("valid media pattern")
});

/// Plain GET of an HTML page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, TransportError>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFetcher").finish_non_exhaustive()
    }
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; DafYomiBot/1.0)")
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, TransportError> {
        let res = self
            .http
            .get(url)
            .header("Accept", "text/html")
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(TransportError::Rejected { status, body });
        }
        Ok(res.text().await?)
    }
}

/// Anchors whose href starts with `prefix`, in document order, with their
/// whitespace-collapsed text.
pub fn extract_links(html: &str, prefix: &str) -> Vec<CatalogLink> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            if !href.starts_with(prefix) {
                return None;
            }
            let text = a.text().collect::<String>();
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            Some(CatalogLink::new(href, text))
        })
        .collect()
}

/// Layouts a link text may use for `<name> <number>`. The number is always
/// word-boundary delimited so `2` never matches inside `22`.
fn item_patterns(series: &str, item: u32, keywords: &[String]) -> Vec<Regex> {
    let name = series
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let mut patterns = vec![
        format!(r"(?i)\b{name}\s+{item}\b"),
        format!(r"(?i)\b{name}\s*[:\-\u{{2013}}\u{{2014}}]\s*{item}\b"),
    ];
    for keyword in keywords {
        let keyword = regex::escape(keyword.trim());
        patterns.push(format!(r"(?i)\b{name}\s+{keyword}\.?\s+{item}\b"));
    }
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(err) => {
                error!(?err, pattern = %p, "skipping catalog pattern that failed to compile");
                None
            }
        })
        .collect()
}

/// First link, in listing order, naming `reference`.
pub fn select_candidate<'a>(
    links: &'a [CatalogLink],
    reference: &Reference,
    keywords: &[String],
) -> Option<&'a CatalogLink> {
    let name_lower = reference.series_name.to_lowercase();
    let patterns = item_patterns(&reference.series_name, reference.item_number, keywords);
    let mut matching = links.iter().filter(|link| {
        link.text.to_lowercase().contains(&name_lower)
            && patterns.iter().any(|p| p.is_match(&link.text))
    });
    let selected = matching.next()?;
    if let Some(other) = matching.next() {
        warn!(
            %reference,
            selected = %selected.href,
            also_matching = %other.href,
            "several catalog entries match; keeping the first in listing order"
        );
    }
    Some(selected)
}

/// Canonical media URL rebuilt from the identifier embedded in a detail page.
pub fn extract_media_url(html: &str) -> Option<String> {
    MEDIA_RE
        .captures(html)
        .map(|caps| format!("{}{}.mp4", MEDIA_CDN_BASE, &caps[1]))
}

/// Finds a reference's entry on the catalog listing and its media link.
pub struct CatalogMatcher {
    fetcher: Box<dyn PageFetcher>,
    base_url: Url,
    series_url: String,
    link_prefix: String,
    keywords: Vec<String>,
}

impl CatalogMatcher {
    pub fn new(
        fetcher: Box<dyn PageFetcher>,
        base_url: Url,
        series_url: impl Into<String>,
        link_prefix: impl Into<String>,
        keywords: Vec<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url,
            series_url: series_url.into(),
            link_prefix: link_prefix.into(),
            keywords,
        }
    }

    pub fn from_config(cfg: &Config, fetcher: Box<dyn PageFetcher>) -> Result<Self, TransportError> {
        let base_url = Url::parse(&cfg.catalog.base_url)
            .map_err(|e| TransportError::InvalidResponse(format!("catalog base url: {e}")))?;
        Ok(Self::new(
            fetcher,
            base_url,
            cfg.series_url(),
            cfg.catalog.link_prefix.clone(),
            cfg.catalog.page_keywords.clone(),
        ))
    }

    /// Two fetches: the listing, then the selected entry's detail page.
    #[instrument(skip_all, fields(reference = %reference))]
    pub async fn find(&self, reference: &Reference) -> Result<MatchResult, LookupError> {
        let listing = self.fetcher.fetch(&self.series_url).await?;
        let links = extract_links(&listing, &self.link_prefix);
        debug!(links = links.len(), "extracted listing links");

        let selected = select_candidate(&links, reference, &self.keywords).ok_or_else(|| {
            LookupError::VideoNotFound {
                series: reference.series_name.clone(),
                item: reference.item_number,
            }
        })?;
        let detail_url = self
            .base_url
            .join(&selected.href)
            .map_err(|e| TransportError::InvalidResponse(format!("bad href {}: {e}", selected.href)))?
            .to_string();
        info!(title = %selected.text, %detail_url, "found catalog entry");

        let detail = self.fetcher.fetch(&detail_url).await?;
        let media_url = extract_media_url(&detail);
        match &media_url {
            Some(url) => info!(media_url = %url, "found media url"),
            None => warn!(%detail_url, "no direct media url on detail page"),
        }

        Ok(MatchResult {
            title: selected.text.clone(),
            detail_url,
            media_url,
            series_name: reference.series_name.clone(),
            item_number: reference.item_number,
        })
    }
}
