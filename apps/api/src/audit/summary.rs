//! The `Summary` artifact, its response schema, the strict decode step, and the
//! fixed summaries used when an audit cannot be written by the model.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::audit::errors::AuditError;
use crate::audit::scoring::DEFAULT_SCORE;
use crate::llm_client::strip_json_fences;

pub const STRENGTH_COUNT: usize = 3;
pub const IMPROVEMENT_COUNT: usize = 2;

pub const INSUFFICIENT_STRENGTHS: &str = "Insufficient data to determine strengths.";
pub const INSUFFICIENT_IMPROVEMENTS: &str =
    "Insufficient data to determine improvements. Try again with a different location or business type.";
const INSUFFICIENT_TIP: &str = "We could not find comparable businesses near this location. \
    Try again with a more specific location or a different business type.";

const UNAVAILABLE_STRENGTHS: &str = "Strengths could not be determined for this audit.";
const UNAVAILABLE_IMPROVEMENTS: &str = "Improvements could not be determined for this audit.";
pub const FALLBACK_TIP: &str = "We could not generate your audit right now. \
    Please try again in a few minutes, or contact support if the problem persists.";

/// Final audit artifact. Created once per audit request and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub business_name: String,
    pub sustainability_score: f64,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub tip: String,
}

impl Summary {
    /// Returned when no comparable businesses were found.
    pub fn insufficient_data(business_name: &str) -> Self {
        Self {
            business_name: business_name.to_string(),
            sustainability_score: f64::from(DEFAULT_SCORE),
            strengths: vec![INSUFFICIENT_STRENGTHS.to_string()],
            improvements: vec![INSUFFICIENT_IMPROVEMENTS.to_string()],
            tip: INSUFFICIENT_TIP.to_string(),
        }
    }

    /// Returned when the audit failed outright.
    pub fn fallback(business_name: &str) -> Self {
        Self {
            business_name: business_name.to_string(),
            sustainability_score: f64::from(DEFAULT_SCORE),
            strengths: vec![UNAVAILABLE_STRENGTHS.to_string()],
            improvements: vec![UNAVAILABLE_IMPROVEMENTS.to_string()],
            tip: FALLBACK_TIP.to_string(),
        }
    }
}

/// Response schema handed to the model so its output is constrained to `Summary`.
pub fn summary_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "business_name": {"type": "STRING"},
            "sustainability_score": {"type": "NUMBER"},
            "strengths": {
                "type": "ARRAY",
                "items": {"type": "STRING"},
                "minItems": STRENGTH_COUNT,
                "maxItems": STRENGTH_COUNT
            },
            "improvements": {
                "type": "ARRAY",
                "items": {"type": "STRING"},
                "minItems": IMPROVEMENT_COUNT,
                "maxItems": IMPROVEMENT_COUNT
            },
            "tip": {"type": "STRING"}
        },
        "required": ["business_name", "sustainability_score", "strengths", "improvements", "tip"],
        "propertyOrdering": ["business_name", "sustainability_score", "strengths", "improvements", "tip"]
    })
}

/// Decodes raw model output into a validated `Summary`.
///
/// Extra list entries are truncated; too few entries, blank entries, or a
/// blank tip are rejected. The score is pinned to `computed_score`, and a
/// blank business name falls back to `business_type`.
pub fn decode_summary(
    raw: &str,
    business_type: &str,
    computed_score: u32,
) -> Result<Summary, AuditError> {
    let mut summary: Summary =
        serde_json::from_str(strip_json_fences(raw)).map_err(AuditError::Decode)?;

    summary.strengths = exact_entries(summary.strengths, STRENGTH_COUNT, "strengths")?;
    summary.improvements = exact_entries(summary.improvements, IMPROVEMENT_COUNT, "improvements")?;

    summary.tip = summary.tip.trim().to_string();
    if summary.tip.is_empty() {
        return Err(AuditError::InvalidSummary("tip is blank".to_string()));
    }

    summary.business_name = summary.business_name.trim().to_string();
    if summary.business_name.is_empty() {
        summary.business_name = business_type.to_string();
    }

    let computed = f64::from(computed_score);
    if (summary.sustainability_score - computed).abs() > f64::EPSILON {
        debug!(
            "Model reported score {}, replacing with computed score {computed}",
            summary.sustainability_score
        );
    }
    summary.sustainability_score = computed;

    Ok(summary)
}

fn exact_entries(entries: Vec<String>, expected: usize, field: &str) -> Result<Vec<String>, AuditError> {
    let entries: Vec<String> = entries.into_iter().map(|e| e.trim().to_string()).collect();

    if entries.iter().any(String::is_empty) {
        return Err(AuditError::InvalidSummary(format!("{field} contains a blank entry")));
    }
    if entries.len() < expected {
        return Err(AuditError::InvalidSummary(format!(
            "{field} has {} entries, expected {expected}",
            entries.len()
        )));
    }
    if entries.len() > expected {
        warn!(
            "Model returned {} {field}; keeping the first {expected}",
            entries.len()
        );
    }

    Ok(entries.into_iter().take(expected).collect())
}
