use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::calendar::{HttpCalendar, NameTable, ReferenceResolver};
use crate::catalog::{CatalogMatcher, HttpFetcher};
use crate::clock::date_key;
use crate::config::Config;
use crate::error::{LookupError, TransportError};
use crate::model::MatchResult;
use crate::state::ResultCache;

/// Today's video: cache first, then calendar + catalog.
pub struct VideoLookup {
    resolver: ReferenceResolver,
    matcher: CatalogMatcher,
    cache: Option<ResultCache>,
}

impl VideoLookup {
    pub fn new(resolver: ReferenceResolver, matcher: CatalogMatcher, cache: Option<ResultCache>) -> Self {
        Self {
            resolver,
            matcher,
            cache,
        }
    }

    pub fn from_config(cfg: &Config, use_cache: bool) -> Result<Self, TransportError> {
        let resolver = ReferenceResolver::new(
            Box::new(HttpCalendar::from_config(cfg)?),
            cfg.calendar.category.clone(),
            NameTable::with_overrides(&cfg.calendar.name_overrides),
        );
        let matcher =
            CatalogMatcher::from_config(cfg, Box::new(HttpFetcher::new(cfg.request_timeout())?))?;
        let cache = use_cache.then(|| ResultCache::new(&cfg.state_dir()));
        Ok(Self::new(resolver, matcher, cache))
    }

    #[instrument(skip(self))]
    pub async fn for_date(&self, date: NaiveDate) -> Result<MatchResult, LookupError> {
        let key = date_key(date);
        if let Some(cache) = &self.cache {
            match cache.get(&key) {
                Ok(Some(hit)) => {
                    info!(date_key = %key, title = %hit.title, "cache hit");
                    return Ok(hit);
                }
                Ok(None) => {}
                Err(err) => return Err(LookupError::Cache(format!("{err:#}"))),
            }
        }

        let reference = self.resolver.resolve(date).await?;
        let result = self.matcher.find(&reference).await?;

        if let Some(cache) = &self.cache {
            // A failed write only costs a refetch next time.
            if let Err(err) = cache.put(&key, &result) {
                warn!(?err, date_key = %key, "failed to cache lookup result");
            }
        }
        Ok(result)
    }
}
