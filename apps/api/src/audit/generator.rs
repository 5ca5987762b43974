//! Summary Generator: orchestrates the audit pipeline.
//!
//! Flow: fetch tags → fetch comparable places → compute score →
//!       (no places: insufficient-data summary) → build prompt → LLM → decode.
//!
//! Insights failures degrade to empty data; anything else becomes the fallback
//! summary. Callers always receive a well-formed `Summary`.

use tracing::{error, info, warn};

use crate::audit::errors::AuditError;
use crate::audit::prompt_builder::build_prompt;
use crate::audit::prompts::AUDIT_SYSTEM;
use crate::audit::scoring::compute_score;
use crate::audit::summary::{decode_summary, summary_response_schema, Summary};
use crate::insights::{EntityType, InsightsClient};
use crate::llm_client::LanguageModel;

/// Runs the audit and never fails. Errors are logged and replaced by
/// `Summary::fallback`.
pub async fn generate_summary(
    insights: &InsightsClient,
    llm: &dyn LanguageModel,
    business_type: &str,
    location: &str,
    products: &[String],
) -> Summary {
    match try_generate_summary(insights, llm, business_type, location, products).await {
        Ok(summary) => summary,
        Err(e) => {
            if e.should_alert() {
                error!("Audit for {business_type:?} in {location:?} failed: {e}");
            } else {
                warn!("Audit for {business_type:?} in {location:?} degraded to fallback: {e}");
            }
            Summary::fallback(business_type)
        }
    }
}

/// Runs the audit, surfacing model and rendering failures to the caller.
///
/// Steps:
/// 1. fetch_sustainability_tags() → Vec<String> (empty on failure)
/// 2. fetch_similar_entities(location, Place) → Vec<InsightRecord> (empty on failure)
/// 3. compute_score() → u32
/// 4. no records → Summary::insufficient_data
/// 5. build_prompt() → LLM with the Summary response schema → decode_summary()
pub async fn try_generate_summary(
    insights: &InsightsClient,
    llm: &dyn LanguageModel,
    business_type: &str,
    location: &str,
    products: &[String],
) -> Result<Summary, AuditError> {
    // Step 1: Taxonomy
    let tags = insights
        .fetch_sustainability_tags()
        .await
        .unwrap_or_else(|e| {
            warn!("Sustainability tags unavailable, scoring without taxonomy: {e}");
            Vec::new()
        });

    // Step 2: Comparable businesses
    let records = insights
        .fetch_similar_entities(location, EntityType::Place)
        .await
        .unwrap_or_else(|e| {
            warn!("Comparable businesses unavailable for {location:?}: {e}");
            Vec::new()
        });

    // Step 3: Score
    let score = compute_score(&records, &tags);
    info!(
        "Sustainability score {score}/100 for {business_type:?} in {location:?} ({} records, {} tags)",
        records.len(),
        tags.len()
    );

    // Step 4: Nothing to compare against
    if records.is_empty() {
        info!("No comparable businesses near {location:?}; returning insufficient-data summary");
        return Ok(Summary::insufficient_data(business_type));
    }

    // Step 5: Prompt → model → decode
    let prompt = build_prompt(business_type, location, products, score, &tags, &records)
        .map_err(AuditError::Prompt)?;
    let raw = llm
        .generate_json(&prompt, AUDIT_SYSTEM, &summary_response_schema())
        .await?;

    decode_summary(&raw, business_type, score)
}
