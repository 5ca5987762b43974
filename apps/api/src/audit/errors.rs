use thiserror::Error;

use crate::llm_client::LlmError;

/// Failures that stop an audit from producing a model-written summary.
/// Insights failures never appear here: the pipeline degrades them to empty data.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("language model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("model output is not valid summary JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("model output violates the summary schema: {0}")]
    InvalidSummary(String),

    #[error("failed to render audit prompt: {0}")]
    Prompt(#[source] serde_json::Error),
}

impl AuditError {
    /// Transport, API and rendering failures need attention; a model that answered
    /// off-schema is an expected degradation.
    pub fn should_alert(&self) -> bool {
        matches!(self, AuditError::Model(_) | AuditError::Prompt(_))
    }
}
