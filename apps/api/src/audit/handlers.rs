//! Axum route handlers for the Audit API.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::audit::generator::generate_summary;
use crate::audit::store::{AuditRecord, SortBy, SortOrder};
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateAuditRequest {
    pub business_type: String,
    pub location: String,
    pub products: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListAuditParams {
    #[serde(default)]
    pub order_by: SortBy,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Serialize)]
pub struct ListAuditsResponse {
    pub audits: Vec<AuditRecord>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /audit/list
///
/// Runs the audit pipeline and stores the result. Always answers 201 for a
/// valid request; upstream failures show up as a default summary.
pub async fn handle_create_audit(
    State(state): State<AppState>,
    payload: Result<Json<CreateAuditRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuditRecord>), AppError> {
    let Json(request) = payload?;
    let business_type = request.business_type.trim();
    let location = request.location.trim();

    if business_type.is_empty() {
        return Err(AppError::Validation("business_type cannot be empty".to_string()));
    }
    if location.is_empty() {
        return Err(AppError::Validation("location cannot be empty".to_string()));
    }

    let products: Vec<String> = request
        .products
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    let summary = generate_summary(
        &state.insights,
        state.llm.as_ref(),
        business_type,
        location,
        &products,
    )
    .await;

    let record = AuditRecord::new(summary);
    state.audits.append(record.clone()).await;
    info!(
        "Stored audit {} ({:?}, score {})",
        record.id, record.summary.business_name, record.summary.sustainability_score
    );

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /audit/list?order_by=created|business_name|sustainability_score&order=asc|desc
pub async fn handle_list_audits(
    State(state): State<AppState>,
    Query(params): Query<ListAuditParams>,
) -> Json<ListAuditsResponse> {
    let audits = state.audits.list(params.order_by, params.order).await;
    Json(ListAuditsResponse { audits })
}

/// GET /audit/:id
pub async fn handle_get_audit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AuditRecord>, AppError> {
    state
        .audits
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Audit {id} not found")))
}
