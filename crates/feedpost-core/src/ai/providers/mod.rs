mod ollama;
mod openai;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::Result;

/// Trait for AI summarization backends
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Condense `text` into a natural-language summary
    async fn summarize(&self, text: &str) -> Result<String>;
}
