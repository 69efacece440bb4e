use std::sync::Arc;
use std::time::Duration;

use super::providers::{AiProvider, OllamaProvider, OpenAiProvider};
use crate::config::AppConfig;
use crate::{Error, Result};

/// AI Summarizer that wraps the configured provider and bounds each call
/// with the configured timeout
#[derive(Clone)]
pub struct Summarizer {
    provider: Arc<dyn AiProvider>,
    timeout: Duration,
}

impl Summarizer {
    /// Create a new summarizer based on configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        let ai = &config.ai;
        let base_url = ai.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty());

        let provider: Arc<dyn AiProvider> = match ai.provider.as_str() {
            "openai" => {
                let api_key = ai
                    .api_key
                    .as_deref()
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| Error::Config("OpenAI API key not configured".to_string()))?;
                Arc::new(OpenAiProvider::new(base_url, api_key, &ai.prompt, &ai.model))
            }
            "ollama" => {
                let base_url = base_url
                    .ok_or_else(|| Error::Config("Ollama base_url not configured".to_string()))?;
                Arc::new(OllamaProvider::new(base_url, &ai.prompt, &ai.model))
            }
            other => {
                return Err(Error::Config(format!("Unknown AI provider: {}", other)));
            }
        };

        tracing::info!("Using {} summarizer with model {}", provider.name(), ai.model);
        Ok(Self::with_provider(provider, ai.timeout()))
    }

    /// Wrap an already-built provider
    pub fn with_provider(provider: Arc<dyn AiProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate a summary for article content
    pub async fn summarize(&self, content: &str) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.provider.summarize(content)).await {
            Ok(result) => result.map(|summary| summary.trim().to_string()),
            Err(_) => Err(Error::AiProvider(format!(
                "{} summarization timed out after {}s",
                self.provider.name(),
                self.timeout.as_secs()
            ))),
        }
    }
}
