//! Error taxonomy shared by the lookup and delivery paths.
use chrono::NaiveDate;
use thiserror::Error;

/// Failure of any outbound call: calendar, catalog pages or messaging API.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Another consumer is polling with an overlapping offset.
    #[error("conflicting update consumer: {0}")]
    Conflict(String),
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    /// The messaging API answered with an error description.
    #[error("api error: {0}")]
    Api(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_decode() {
            TransportError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Rejected {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Failure to produce a match for a date.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no calendar entry in category {category:?} for {date}")]
    ResolutionNotFound { date: NaiveDate, category: String },
    #[error("calendar title {0:?} is not of the form \"<name> <number>\"")]
    ResolutionParse(String),
    #[error("no catalog entry for {series} {item}")]
    VideoNotFound { series: String, item: u32 },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("result cache: {0}")]
    Cache(String),
}
