// Sustainability audit engine.
// Implements: score calculation, prompt rendering, summary generation, audit storage.
// All LLM calls go through llm_client, all Qloo calls through insights.

pub mod errors;
pub mod generator;
pub mod handlers;
pub mod prompt_builder;
pub mod prompts;
pub mod scoring;
pub mod store;
pub mod summary;
