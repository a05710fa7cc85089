//! Reply templates. Plain text so titles never trip a markup parser.
use std::time::Duration;

use crate::model::MatchResult;

const WELCOME: &str = "Welcome to Daf Yomi History Bot!

I send you daily Jewish History videos from Dr. Henry Abramson's series on AllDaf.org, matching the Daf Yomi schedule.

Commands:
/today - Get today's video now
/help - Show this message

You'll automatically receive the daily video every morning at 6:00 AM Israel time.

Enjoy your learning!";

const HELP: &str = "Daf Yomi History Bot - Help

Available Commands:

/today - Get today's Daf Yomi history video
/help - Show this help message

About:
This bot sends Jewish History videos from AllDaf.org's series by Dr. Henry Abramson. Each video corresponds to the daily Daf Yomi page.

Schedule:
Daily videos are sent automatically at 6:00 AM Israel time.";

const RATE_LIMITED: &str =
    "You're sending too many requests. Please wait a moment before trying again.";

const LOADING: &str = "Finding today's Daf Yomi history video...";

/// Immutable message set, built once from configuration.
#[derive(Debug, Clone)]
pub struct Messages {
    series_url: String,
}

impl Messages {
    pub fn new(series_url: impl Into<String>) -> Self {
        Self {
            series_url: series_url.into(),
        }
    }

    pub fn welcome(&self) -> &'static str {
        WELCOME
    }

    pub fn help(&self) -> &'static str {
        HELP
    }

    pub fn loading(&self) -> &'static str {
        LOADING
    }

    pub fn error(&self) -> String {
        format!(
            "Sorry, I couldn't find today's video. Please try again later.\n\n\
             You can also visit AllDaf.org directly:\n{}",
            self.series_url
        )
    }

    pub fn rate_limited(&self, wait: Duration) -> String {
        let secs = wait.as_secs_f64().ceil() as u64;
        if secs == 0 {
            return RATE_LIMITED.to_string();
        }
        format!("You're sending too many requests. Please wait {secs} seconds before trying again.")
    }

    /// Caption for the interactive reply; also the text fallback.
    pub fn caption(&self, video: &MatchResult) -> String {
        format!(
            "Today's Daf Yomi History\n\n{} {}\n{}\n\nView on AllDaf.org: {}",
            video.series_name, video.item_number, video.title, video.detail_url
        )
    }

    pub fn daily_broadcast(&self, video: &MatchResult) -> String {
        format!(
            "Good morning! Here's today's Daf Yomi History video:\n\n{} {}\n{}\n\nView on AllDaf.org: {}",
            video.series_name, video.item_number, video.title, video.detail_url
        )
    }
}
