//! Insights client: the single point of entry for all Qloo API calls.
//!
//! Connection settings are injected through `InsightsConfig`; nothing here reads
//! the environment. Every call is single-attempt and bounded by the configured
//! timeout. Callers decide whether a failure degrades to empty data.

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::InsightsConfig;

pub mod entities;
pub mod tags;

#[derive(Debug, Error)]
pub enum InsightsError {
    #[error("failed to build insights HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned status {status}")]
    Unavailable { endpoint: String, status: u16 },

    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },
}

/// Entity kinds understood by the insights API. Audits only query places.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Artist,
    Brand,
    Book,
    Destination,
    Movie,
    Person,
    Place,
    Podcast,
    TvShow,
    VideoGame,
}

impl EntityType {
    pub fn urn(self) -> &'static str {
        match self {
            EntityType::Artist => "urn:entity:artist",
            EntityType::Brand => "urn:entity:brand",
            EntityType::Book => "urn:entity:book",
            EntityType::Destination => "urn:entity:destination",
            EntityType::Movie => "urn:entity:movie",
            EntityType::Person => "urn:entity:person",
            EntityType::Place => "urn:entity:place",
            EntityType::Podcast => "urn:entity:podcast",
            EntityType::TvShow => "urn:entity:tv_show",
            EntityType::VideoGame => "urn:entity:video_game",
        }
    }
}

#[derive(Clone)]
pub struct InsightsClient {
    client: Client,
    config: InsightsConfig,
}

impl InsightsClient {
    pub fn new(config: InsightsConfig) -> Result<Self, InsightsError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// GETs `path` with the given query string and returns the decoded JSON body.
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, InsightsError> {
        let endpoint = self.endpoint(path);

        let response = self
            .client
            .get(&endpoint)
            .header("accept", "application/json")
            .header("X-Api-Key", &self.config.api_key)
            .query(query)
            .send()
            .await
            .map_err(|source| InsightsError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Insights API {endpoint} returned {status}: {body}");
            return Err(InsightsError::Unavailable {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| InsightsError::Http {
            endpoint: endpoint.clone(),
            source,
        })?;
        debug!("Insights API {endpoint} returned {} bytes", body.len());

        serde_json::from_str(&body).map_err(|e| InsightsError::MalformedResponse {
            endpoint,
            reason: format!("body is not valid JSON: {e}"),
        })
    }
}

/// Looks up a JSON array at `pointer`, reporting a malformed response when absent.
fn required_array<'a>(
    body: &'a Value,
    pointer: &str,
    endpoint: &str,
) -> Result<&'a Vec<Value>, InsightsError> {
    body.pointer(pointer)
        .and_then(Value::as_array)
        .ok_or_else(|| InsightsError::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: format!("missing array at {pointer}"),
        })
}

#[cfg(test)]
pub(crate) fn test_client(base_url: &str, max_tag_pages: u32) -> InsightsClient {
    InsightsClient::new(InsightsConfig {
        base_url: base_url.to_string(),
        api_key: "test-key".to_string(),
        timeout: std::time::Duration::from_secs(5),
        max_tag_pages,
    })
    .unwrap()
}
