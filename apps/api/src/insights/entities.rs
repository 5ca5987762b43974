//! Entity Affinity Fetcher: comparable businesses near a location, flattened into
//! `InsightRecord`s.
//!
//! Raw entities are normalized field by field. Missing fields take neutral
//! defaults; a field present with the wrong JSON type makes that one entity
//! unusable and it is skipped without failing the batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::insights::{required_array, EntityType, InsightsClient, InsightsError};

const INSIGHTS_PATH: &str = "/v2/insights";
const SIGNAL_TAG: &str = "urn:tag:sustainability_initiative";
pub const MAX_SIMILAR_ENTITIES: usize = 10;
pub const UNKNOWN_ENTITY_NAME: &str = "Unknown";
/// Weight given to a tag listed without one.
const DEFAULT_TAG_WEIGHT: f64 = 1.0;

/// One comparable business. Produced per request and discarded after scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    pub name: String,
    pub keywords: Vec<String>,
    /// Tag name → weight. Ordered so prompts render deterministically.
    pub tags: BTreeMap<String, f64>,
    /// -1.0 – 1.0
    pub affinity: f64,
    /// 0.0 – 1.0
    pub popularity: f64,
}

impl InsightsClient {
    /// Fetches up to `MAX_SIMILAR_ENTITIES` entities of `entity_type` near `location`,
    /// signalled against the sustainability-initiative tag.
    pub async fn fetch_similar_entities(
        &self,
        location: &str,
        entity_type: EntityType,
    ) -> Result<Vec<InsightRecord>, InsightsError> {
        let endpoint = self.endpoint(INSIGHTS_PATH);
        let query = [
            ("filter.type", entity_type.urn().to_string()),
            ("filter.location.query", location.to_string()),
            ("signal.interests.tags", SIGNAL_TAG.to_string()),
            ("take", MAX_SIMILAR_ENTITIES.to_string()),
        ];

        let body = self.get_json(INSIGHTS_PATH, &query).await?;
        let raw_entities = required_array(&body, "/results/entities", &endpoint)?;

        let mut records = Vec::with_capacity(raw_entities.len().min(MAX_SIMILAR_ENTITIES));
        for (index, raw) in raw_entities.iter().take(MAX_SIMILAR_ENTITIES).enumerate() {
            match normalize_entity(raw) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    let err = InsightsError::MalformedResponse {
                        endpoint: endpoint.clone(),
                        reason: format!("entity #{index}: {reason}"),
                    };
                    warn!("Skipping entity: {err}");
                }
            }
        }

        info!(
            "Fetched {} comparable {} entities near {location:?} ({} returned)",
            records.len(),
            entity_type.urn(),
            raw_entities.len()
        );
        Ok(records)
    }
}

/// Flattens one raw insights entity.
pub fn normalize_entity(raw: &Value) -> Result<InsightRecord, String> {
    let entity = raw
        .as_object()
        .ok_or_else(|| "entity is not a JSON object".to_string())?;

    let name = match entity.get("name") {
        None | Some(Value::Null) => UNKNOWN_ENTITY_NAME.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => UNKNOWN_ENTITY_NAME.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => return Err(format!("name has unexpected type: {other}")),
    };

    let keywords = normalize_keywords(entity)?;
    let tags = normalize_tags(entity.get("tags"))?;

    let affinity_field = entity
        .get("query")
        .and_then(|q| q.get("affinity"))
        .or_else(|| entity.get("affinity"));
    let affinity = optional_number(affinity_field, "affinity")?.clamp(-1.0, 1.0);
    let popularity = optional_number(entity.get("popularity"), "popularity")?.clamp(0.0, 1.0);

    Ok(InsightRecord {
        name,
        keywords,
        tags,
        affinity,
        popularity,
    })
}

fn normalize_keywords(entity: &Map<String, Value>) -> Result<Vec<String>, String> {
    let field = entity
        .get("properties")
        .and_then(|p| p.get("keywords"))
        .or_else(|| entity.get("keywords"));

    match field {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim()),
                Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::trim),
                _ => None,
            })
            .filter(|kw| !kw.is_empty())
            .map(str::to_string)
            .collect()),
        Some(other) => Err(format!("keywords has unexpected type: {other}")),
    }
}

/// Accepts either `{"name": weight}` or `[{"name": .., "weight": ..}]` / `["name"]`.
fn normalize_tags(field: Option<&Value>) -> Result<BTreeMap<String, f64>, String> {
    let mut tags = BTreeMap::new();

    match field {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            for (name, weight) in map {
                let weight = weight
                    .as_f64()
                    .ok_or_else(|| format!("tag {name:?} has non-numeric weight"))?;
                tags.insert(name.clone(), weight.max(0.0));
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::String(name) => {
                        tags.insert(name.clone(), DEFAULT_TAG_WEIGHT);
                    }
                    Value::Object(obj) => {
                        let Some(name) = obj.get("name").and_then(Value::as_str) else {
                            continue;
                        };
                        let weight = match obj.get("weight") {
                            None | Some(Value::Null) => DEFAULT_TAG_WEIGHT,
                            Some(w) => w
                                .as_f64()
                                .ok_or_else(|| format!("tag {name:?} has non-numeric weight"))?,
                        };
                        tags.insert(name.to_string(), weight.max(0.0));
                    }
                    _ => {}
                }
            }
        }
        Some(other) => return Err(format!("tags has unexpected type: {other}")),
    }

    Ok(tags)
}

fn optional_number(field: Option<&Value>, label: &str) -> Result<f64, String> {
    match field {
        None | Some(Value::Null) => Ok(0.0),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| format!("{label} has unexpected type: {value}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::test_client;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_normalize_full_qloo_shape() {
        let raw = json!({
            "name": "Green Bean Café",
            "popularity": 0.82,
            "query": {"affinity": 0.4},
            "properties": {"keywords": [{"name": "oat milk", "count": 12}, {"name": "vegan"}]},
            "tags": [
                {"name": "vegan", "weight": 3.0},
                {"name": "composting"}
            ]
        });

        let record = normalize_entity(&raw).unwrap();
        assert_eq!(record.name, "Green Bean Café");
        assert_eq!(record.keywords, vec!["oat milk", "vegan"]);
        assert_eq!(record.tags.get("vegan"), Some(&3.0));
        assert_eq!(record.tags.get("composting"), Some(&1.0));
        assert!((record.affinity - 0.4).abs() < f64::EPSILON);
        assert!((record.popularity - 0.82).abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalize_flat_shape_with_tag_map() {
        let raw = json!({
            "name": "Solar Bakery",
            "keywords": ["solar"],
            "tags": {"solar": 10},
            "affinity": 0.2,
            "popularity": 0.1
        });

        let record = normalize_entity(&raw).unwrap();
        assert_eq!(record.keywords, vec!["solar"]);
        assert_eq!(record.tags.get("solar"), Some(&10.0));
        assert!((record.affinity - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let record = normalize_entity(&json!({})).unwrap();
        assert_eq!(record.name, UNKNOWN_ENTITY_NAME);
        assert!(record.keywords.is_empty());
        assert!(record.tags.is_empty());
        assert_eq!(record.affinity, 0.0);
        assert_eq!(record.popularity, 0.0);
    }

    #[test]
    fn test_out_of_range_signals_are_clamped() {
        let record = normalize_entity(&json!({"affinity": -3.5, "popularity": 7})).unwrap();
        assert_eq!(record.affinity, -1.0);
        assert_eq!(record.popularity, 1.0);
    }

    #[test]
    fn test_wrong_types_are_rejected() {
        assert!(normalize_entity(&json!("just a string")).is_err());
        assert!(normalize_entity(&json!({"name": 17})).is_err());
        assert!(normalize_entity(&json!({"affinity": "high"})).is_err());
        assert!(normalize_entity(&json!({"tags": {"solar": "lots"}})).is_err());
        assert!(normalize_entity(&json!({"keywords": "solar"})).is_err());
    }

    #[test]
    fn test_negative_tag_weights_floor_at_zero() {
        let record = normalize_entity(&json!({"tags": {"plastic": -2.0}})).unwrap();
        assert_eq!(record.tags.get("plastic"), Some(&0.0));
    }

    #[tokio::test]
    async fn test_fetch_skips_malformed_entity_and_keeps_the_rest() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "success": true,
            "results": {"entities": [
                {"name": "Good One", "popularity": 0.5, "query": {"affinity": 0.1}},
                {"name": 12345},
                {"popularity": 0.3}
            ]}
        });
        let mock = server
            .mock("GET", INSIGHTS_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("filter.type".into(), "urn:entity:place".into()),
                Matcher::UrlEncoded("filter.location.query".into(), "Brussels".into()),
                Matcher::UrlEncoded("signal.interests.tags".into(), SIGNAL_TAG.into()),
                Matcher::UrlEncoded("take".into(), "10".into()),
            ]))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = test_client(&server.url(), 1);
        let records = client
            .fetch_similar_entities("Brussels", EntityType::Place)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Good One");
        assert_eq!(records[1].name, UNKNOWN_ENTITY_NAME);
    }

    #[tokio::test]
    async fn test_fetch_caps_at_ten_entities() {
        let mut server = mockito::Server::new_async().await;
        let entities: Vec<Value> = (0..15).map(|i| json!({"name": format!("e{i}")})).collect();
        let _mock = server
            .mock("GET", INSIGHTS_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"results": {"entities": entities}}).to_string())
            .create_async()
            .await;

        let client = test_client(&server.url(), 1);
        let records = client
            .fetch_similar_entities("Ghent", EntityType::Place)
            .await
            .unwrap();
        assert_eq!(records.len(), MAX_SIMILAR_ENTITIES);
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", INSIGHTS_PATH)
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = test_client(&server.url(), 1);
        let err = client
            .fetch_similar_entities("Brussels", EntityType::Place)
            .await
            .unwrap_err();
        assert!(matches!(err, InsightsError::Unavailable { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_fetch_missing_entities_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", INSIGHTS_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"results": {"tags": []}}).to_string())
            .create_async()
            .await;

        let client = test_client(&server.url(), 1);
        let err = client
            .fetch_similar_entities("Brussels", EntityType::Place)
            .await
            .unwrap_err();
        assert!(matches!(err, InsightsError::MalformedResponse { .. }));
    }
}
