use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};

use super::AiProvider;
use crate::{Error, Result};

/// OpenAI API provider, or any server speaking the same chat-completions API
/// (LM Studio, llama.cpp, Ollama's /v1 endpoint) when `base_url` is set
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    prompt: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(base_url: Option<&str>, api_key: &str, prompt: &str, model: &str) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = base_url.map(str::trim).filter(|b| !b.is_empty()) {
            config = config.with_api_base(base.trim_end_matches('/'));
        }

        Self {
            client: Client::with_config(config),
            prompt: prompt.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(self.prompt.as_str())
                        .build()
                        .map_err(|e| Error::AiProvider(e.to_string()))?,
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(text)
                        .build()
                        .map_err(|e| Error::AiProvider(e.to_string()))?,
                ),
            ])
            .build()
            .map_err(|e| Error::AiProvider(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| Error::AiProvider(format!("chat completion: {}", e)))?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            Error::AiProvider(format!("empty response from model '{}'", self.model))
        })?;

        Ok(choice.message.content.unwrap_or_default())
    }
}
