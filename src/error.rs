use std::time::Duration;

use thiserror::Error;

use crate::models::Instrument;

/// Errors surfaced by response loading, configuration and storage.
///
/// Calculators never return these: data-quality problems inside a response
/// degrade to zero scores instead.
#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("failed to fetch {instrument} responses: {source}")]
    Fetch {
        instrument: Instrument,
        #[source]
        source: Box<IndicatorError>,
    },

    #[error("fetching {instrument} responses timed out after {elapsed:?}")]
    Timeout {
        instrument: Instrument,
        elapsed: Duration,
    },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid question mappings: {0}")]
    InvalidMappings(String),

    #[error("invalid itinerary: {0}")]
    InvalidItinerary(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid csv: {0}")]
    Csv(#[from] csv::Error),
}

impl IndicatorError {
    /// Instrument whose fetch failed, if this error came from loading responses.
    pub fn instrument(&self) -> Option<Instrument> {
        match self {
            IndicatorError::Fetch { instrument, .. } | IndicatorError::Timeout { instrument, .. } => {
                Some(*instrument)
            }
            _ => None,
        }
    }
}

pub type Result<T, E = IndicatorError> = std::result::Result<T, E>;
