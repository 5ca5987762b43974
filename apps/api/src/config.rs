use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_QLOO_API_URL: &str = "https://hackathon.api.qloo.com";
const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub qloo_api_key: String,
    pub qloo_api_url: String,
    pub gemini_api_key: String,
    pub gemini_api_url: String,
    pub insights_timeout_secs: u64,
    pub max_tag_pages: u32,
    pub port: u16,
    pub rust_log: String,
}

/// Connection settings for the insights (Qloo) API, handed to `InsightsClient`.
#[derive(Debug, Clone)]
pub struct InsightsConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    /// Upper bound on tag pages fetched per audit.
    pub max_tag_pages: u32,
}

/// Connection settings for the language model (Gemini) API.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            qloo_api_key: require_env("QLOO_API_KEY")?,
            qloo_api_url: optional_env("QLOO_API_URL", DEFAULT_QLOO_API_URL),
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_api_url: optional_env("GEMINI_API_URL", DEFAULT_GEMINI_API_URL),
            insights_timeout_secs: optional_env("INSIGHTS_TIMEOUT_SECS", "20")
                .parse::<u64>()
                .context("INSIGHTS_TIMEOUT_SECS must be a whole number of seconds")?,
            max_tag_pages: optional_env("MAX_TAG_PAGES", "20")
                .parse::<u32>()
                .context("MAX_TAG_PAGES must be a positive integer")?,
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }

    pub fn insights(&self) -> InsightsConfig {
        InsightsConfig {
            base_url: self.qloo_api_url.clone(),
            api_key: self.qloo_api_key.clone(),
            timeout: Duration::from_secs(self.insights_timeout_secs),
            max_tag_pages: self.max_tag_pages.max(1),
        }
    }

    pub fn llm(&self) -> LlmConfig {
        LlmConfig {
            base_url: self.gemini_api_url.clone(),
            api_key: self.gemini_api_key.clone(),
            timeout: Duration::from_secs(120),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
