//! Sliding-window admission control per requester, persisted across runs.
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::state::{read_doc, write_doc, RateLimitDoc, RATE_LIMIT_FILE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub max_requests: usize,
    pub window: Duration,
    /// Registry size that triggers eviction of fully expired requesters.
    pub max_entries: usize,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
            max_entries: 10_000,
        }
    }
}

impl RatePolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_requests: cfg.rate_limit.max_requests,
            window: Duration::from_secs(cfg.rate_limit.window_seconds),
            max_entries: cfg.rate_limit.max_entries,
        }
    }
}

fn unix_secs(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

pub struct RateLimiter {
    path: PathBuf,
    policy: RatePolicy,
    windows: RateLimitDoc,
}

impl RateLimiter {
    pub fn load(state_dir: &Path, policy: RatePolicy) -> Result<Self> {
        let path = state_dir.join(RATE_LIMIT_FILE);
        let windows = read_doc::<RateLimitDoc>(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            policy,
            windows,
        })
    }

    fn cutoff(&self, now: DateTime<Utc>) -> f64 {
        unix_secs(now) - self.policy.window.as_secs_f64()
    }

    /// Timestamps still inside the window ending at `now`, oldest first.
    fn live(&self, requester: i64, now: DateTime<Utc>) -> Vec<f64> {
        let cutoff = self.cutoff(now);
        let mut live: Vec<f64> = self
            .windows
            .get(&requester.to_string())
            .map(|ts| ts.iter().copied().filter(|t| *t > cutoff).collect())
            .unwrap_or_default();
        live.sort_by(|a, b| a.total_cmp(b));
        live
    }

    /// Admit and record a request at `now`, or refuse without touching state.
    pub fn is_allowed(&mut self, requester: i64, now: DateTime<Utc>) -> Result<bool> {
        let mut live = self.live(requester, now);
        if live.len() >= self.policy.max_requests {
            debug!(requester, "rate limited");
            return Ok(false);
        }
        live.push(unix_secs(now));
        self.windows.insert(requester.to_string(), live);
        if self.windows.len() >= self.policy.max_entries {
            self.evict_expired(now);
        }
        write_doc(&self.path, &self.windows)?;
        Ok(true)
    }

    pub fn remaining(&self, requester: i64, now: DateTime<Utc>) -> usize {
        self.policy
            .max_requests
            .saturating_sub(self.live(requester, now).len())
    }

    /// Time until the next admission is possible; zero when one is possible now.
    pub fn reset_in(&self, requester: i64, now: DateTime<Utc>) -> Duration {
        let live = self.live(requester, now);
        if live.len() < self.policy.max_requests {
            return Duration::ZERO;
        }
        let idx = live.len() - self.policy.max_requests;
        let frees_at = live[idx] + self.policy.window.as_secs_f64();
        Duration::from_secs_f64((frees_at - unix_secs(now)).max(0.0))
    }

    /// Forget one requester, or everyone.
    pub fn reset(&mut self, requester: Option<i64>) -> Result<()> {
        match requester {
            Some(id) => {
                self.windows.remove(&id.to_string());
            }
            None => self.windows.clear(),
        }
        write_doc(&self.path, &self.windows)
    }

    fn evict_expired(&mut self, now: DateTime<Utc>) {
        let cutoff = self.cutoff(now);
        let before = self.windows.len();
        self.windows.retain(|_, ts| ts.iter().any(|t| *t > cutoff));
        info!(before, after = self.windows.len(), "evicted expired rate windows");
    }
}
