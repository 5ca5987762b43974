use std::sync::Arc;

use crate::audit::store::AuditStore;
use crate::insights::InsightsClient;
use crate::llm_client::LanguageModel;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub insights: InsightsClient,
    /// Pluggable language model. Default: the Gemini `LlmClient`.
    pub llm: Arc<dyn LanguageModel>,
    pub audits: AuditStore,
}
