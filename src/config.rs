//! Configuration loader and validator for the daily history bot.
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub telegram: Telegram,
    pub calendar: Calendar,
    pub catalog: Catalog,
    pub rate_limit: RateLimit,
    pub broadcast: Broadcast,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub state_dir: String,
    /// IANA zone name that defines "today".
    pub timezone: String,
    pub request_timeout_secs: u64,
    pub media_timeout_secs: u64,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Telegram {
    pub bot_token: String,
    /// Static broadcast recipient, in addition to subscribers.
    #[serde(default)]
    pub chat_id: Option<i64>,
    pub poll_limit: u8,
}

/// Calendar lookup service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Calendar {
    pub base_url: String,
    pub category: String,
    /// Extra calendar-name -> catalog-name entries, applied over the built-in table.
    #[serde(default)]
    pub name_overrides: BTreeMap<String, String>,
}

/// Catalog site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    pub base_url: String,
    pub series_path: String,
    pub link_prefix: String,
    pub page_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: usize,
    pub window_seconds: u64,
    pub max_entries: usize,
}

/// Scheduled broadcast settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Broadcast {
    pub send_hour: u32,
    pub window_minutes_before: u32,
    pub window_minutes_after: u32,
    /// Maximum concurrent sends during fan-out.
    pub parallelism: usize,
}

impl Config {
    /// Ensure required directories exist (creates `app.state_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.app.state_dir)
    }

    pub fn state_dir(&self) -> PathBuf {
        PathBuf::from(&self.app.state_dir)
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.app
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid("app.timezone must be an IANA zone name"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.app.request_timeout_secs)
    }

    pub fn media_timeout(&self) -> Duration {
        Duration::from_secs(self.app.media_timeout_secs)
    }

    /// Absolute URL of the catalog listing page.
    pub fn series_url(&self) -> String {
        format!(
            "{}{}",
            self.catalog.base_url.trim_end_matches('/'),
            self.catalog.series_path
        )
    }

    /// Apply `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID` from the environment.
    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            if !token.trim().is_empty() {
                self.telegram.bot_token = token;
            }
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
            if let Ok(id) = chat_id.trim().parse::<i64>() {
                self.telegram.chat_id = Some(id);
            }
        }
    }
}

/// Load configuration from a YAML file, apply environment overrides and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env();
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.state_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.state_dir must be non-empty"));
    }
    cfg.timezone()?;
    if cfg.app.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("app.request_timeout_secs must be > 0"));
    }
    if cfg.app.media_timeout_secs < cfg.app.request_timeout_secs {
        return Err(ConfigError::Invalid(
            "app.media_timeout_secs must be >= app.request_timeout_secs",
        ));
    }

    if cfg.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::Invalid("telegram.bot_token must be non-empty"));
    }
    if cfg.telegram.poll_limit == 0 || cfg.telegram.poll_limit > 100 {
        return Err(ConfigError::Invalid("telegram.poll_limit must be within 1..=100"));
    }

    if reqwest::Url::parse(&cfg.calendar.base_url).is_err() {
        return Err(ConfigError::Invalid("calendar.base_url must be an absolute URL"));
    }
    if cfg.calendar.category.trim().is_empty() {
        return Err(ConfigError::Invalid("calendar.category must be non-empty"));
    }

    if reqwest::Url::parse(&cfg.catalog.base_url).is_err() {
        return Err(ConfigError::Invalid("catalog.base_url must be an absolute URL"));
    }
    if !cfg.catalog.series_path.starts_with('/') {
        return Err(ConfigError::Invalid("catalog.series_path must start with '/'"));
    }
    if cfg.catalog.link_prefix.trim().is_empty() {
        return Err(ConfigError::Invalid("catalog.link_prefix must be non-empty"));
    }
    if cfg.catalog.page_keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(ConfigError::Invalid("catalog.page_keywords must not contain blanks"));
    }

    if cfg.rate_limit.max_requests == 0 {
        return Err(ConfigError::Invalid("rate_limit.max_requests must be > 0"));
    }
    if cfg.rate_limit.window_seconds == 0 {
        return Err(ConfigError::Invalid("rate_limit.window_seconds must be > 0"));
    }
    if cfg.rate_limit.max_entries == 0 {
        return Err(ConfigError::Invalid("rate_limit.max_entries must be > 0"));
    }

    if cfg.broadcast.send_hour > 23 {
        return Err(ConfigError::Invalid("broadcast.send_hour must be within 0..=23"));
    }
    if cfg.broadcast.parallelism == 0 {
        return Err(ConfigError::Invalid("broadcast.parallelism must be > 0"));
    }

    Ok(())
}

/// Sample configuration with production defaults.
pub fn example() -> &'static str {
    r#"app:
  state_dir: "./.state"
  timezone: "Asia/Jerusalem"
  request_timeout_secs: 30
  media_timeout_secs: 60

telegram:
  bot_token: "YOUR_TELEGRAM_BOT_TOKEN"
  chat_id: 123456789
  poll_limit: 100

calendar:
  base_url: "https://www.hebcal.com/hebcal"
  category: "dafyomi"
  name_overrides: {}

catalog:
  base_url: "https://alldaf.org"
  series_path: "/series/3940"
  link_prefix: "/p/"
  page_keywords:
    - "daf"

rate_limit:
  max_requests: 5
  window_seconds: 60
  max_entries: 10000

broadcast:
  send_hour: 6
  window_minutes_before: 60
  window_minutes_after: 120
  parallelism: 4
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Config {
        serde_yaml::from_str(example()).unwrap()
    }

    #[test]
    fn parse_example_ok() {
        let cfg = sample();
        validate(&cfg).unwrap();
        assert_eq!(cfg.timezone().unwrap(), chrono_tz::Asia::Jerusalem);
        assert_eq!(cfg.series_url(), "https://alldaf.org/series/3940");
    }

    #[test]
    fn invalid_bot_token() {
        let mut cfg = sample();
        cfg.telegram.bot_token = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("telegram.bot_token")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_timezone() {
        let mut cfg = sample();
        cfg.app.timezone = "Mars/Olympus".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("app.timezone")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn media_timeout_not_shorter_than_text() {
        let mut cfg = sample();
        cfg.app.media_timeout_secs = 5;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_limits() {
        let mut cfg = sample();
        cfg.rate_limit.max_requests = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg = sample();
        cfg.telegram.poll_limit = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg = sample();
        cfg.broadcast.parallelism = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg = sample();
        cfg.catalog.series_path = "series/3940".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn chat_id_is_optional() {
        let yaml = example().replace("  chat_id: 123456789\n", "");
        let cfg: Config = serde_yaml::from_str(&yaml).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.telegram.chat_id, None);
    }

    #[test]
    fn ensure_dirs_creates_state_dir() {
        let td = tempdir().unwrap();
        let state_path = td.path().join("state");
        let mut cfg = sample();
        cfg.app.state_dir = state_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(state_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.rate_limit.max_requests, 5);
        assert_eq!(cfg.catalog.page_keywords, vec!["daf".to_string()]);
    }
}
