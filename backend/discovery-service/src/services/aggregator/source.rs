use super::bundle::{LiveField, SourcePayload};
use crate::models::{CityRecord, Coordinates};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// What a source needs to know about the city being fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CityQuery {
    pub city_id: String,
    pub city_name: String,
    pub country: String,
    pub coordinates: Coordinates,
}

impl From<&CityRecord> for CityQuery {
    fn from(city: &CityRecord) -> Self {
        Self {
            city_id: city.id.clone(),
            city_name: city.name.clone(),
            country: city.country.clone(),
            coordinates: city.coordinates,
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Invalid payload: {0}")]
    Decode(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Payload for {actual:?} returned by a {expected:?} source")]
    FieldMismatch {
        expected: LiveField,
        actual: LiveField,
    },

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => SourceError::Status(status.as_u16()),
            None => SourceError::Request(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Decode(err.to_string())
    }
}

/// External data provider for one bundle field.
///
/// The aggregator treats every source the same way: one fetch per page visit,
/// populate on success, ignore on failure. Retries are not the source's job.
#[async_trait]
pub trait LiveSource: Send + Sync {
    fn name(&self) -> &str;
    fn field(&self) -> LiveField;
    async fn fetch(&self, query: &CityQuery) -> Result<SourcePayload, SourceError>;
}
