use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Instrument, ResponseRecord, ResponseSet};

/// Read-only access to the response collections of an itinerary.
#[async_trait]
pub trait ResponseSource: Send + Sync {
    async fn fetch_responses(
        &self,
        instrument: Instrument,
        itinerary_id: i64,
    ) -> Result<Vec<ResponseRecord>>;
}

/// Serves an already-loaded response set regardless of itinerary, e.g. one
/// exported to a JSON file.
#[async_trait]
impl ResponseSource for ResponseSet {
    async fn fetch_responses(
        &self,
        instrument: Instrument,
        _itinerary_id: i64,
    ) -> Result<Vec<ResponseRecord>> {
        Ok(self.collection(instrument).to_vec())
    }
}

impl ResponseSet {
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
