use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::AiProvider;
use crate::{Error, Result};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

/// One line of the streamed `/api/generate` response
#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Local Ollama server, streaming generation
pub struct OllamaProvider {
    client: Client,
    endpoint: String,
    prompt: String,
    model: String,
}

impl OllamaProvider {
    /// `base_url` may be a full URL or a bare `host:port`
    pub fn new(base_url: &str, prompt: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/api/generate", normalize_base_url(base_url)),
            prompt: prompt.to_string(),
            model: model.to_string(),
        }
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Accumulates newline-delimited JSON chunks into the final text
#[derive(Default)]
struct StreamCollector {
    pending: Vec<u8>,
    output: String,
    done: bool,
}

impl StreamCollector {
    fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.consume_line(&line)?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<String> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.consume_line(&line)?;
        }
        if !self.done {
            return Err(Error::AiProvider(
                "Ollama stream ended before completion".to_string(),
            ));
        }
        Ok(self.output)
    }

    fn consume_line(&mut self, line: &[u8]) -> Result<()> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() || self.done {
            return Ok(());
        }

        let chunk: GenerateChunk = serde_json::from_str(line)
            .map_err(|e| Error::AiProvider(format!("Failed to parse Ollama chunk: {}", e)))?;

        if let Some(error) = chunk.error {
            return Err(Error::AiProvider(format!("Ollama error: {}", error)));
        }

        tracing::trace!("Ollama chunk received ({} chars)", chunk.response.len());
        self.output.push_str(&chunk.response);
        self.done = chunk.done;
        Ok(())
    }
}

#[async_trait::async_trait]
impl AiProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: format!("{}\n{}", self.prompt, text),
            stream: true,
        };

        let mut response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::AiProvider(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::AiProvider(format!(
                "Ollama returned HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        let mut collector = StreamCollector::default();
        while let Some(bytes) = response
            .chunk()
            .await
            .map_err(|e| Error::AiProvider(format!("Ollama stream failed: {}", e)))?
        {
            collector.push(&bytes)?;
        }

        collector.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(normalize_base_url("localhost:11434"), "http://localhost:11434");
        assert_eq!(normalize_base_url("http://gpu-box:11434/"), "http://gpu-box:11434");
        assert_eq!(
            normalize_base_url("https://ollama.example.com"),
            "https://ollama.example.com"
        );
    }

    #[test]
    fn test_collector_joins_chunks_split_across_reads() {
        let mut collector = StreamCollector::default();
        collector.push(b"{\"response\":\"Hel\",\"done\":false}\n{\"resp").unwrap();
        collector.push(b"onse\":\"lo \",\"done\":false}\n").unwrap();
        collector.push(b"{\"response\":\"world\",\"done\":true}").unwrap();

        assert_eq!(collector.finish().unwrap(), "Hello world");
    }

    #[test]
    fn test_collector_ignores_lines_after_done() {
        let mut collector = StreamCollector::default();
        collector
            .push(b"{\"response\":\"done.\",\"done\":true}\n{\"response\":\"extra\"}\n")
            .unwrap();
        assert_eq!(collector.finish().unwrap(), "done.");
    }

    #[test]
    fn test_collector_surfaces_stream_errors() {
        let mut collector = StreamCollector::default();
        let result = collector.push(b"{\"error\":\"model 'llama9' not found\"}\n");
        assert!(matches!(result, Err(Error::AiProvider(msg)) if msg.contains("llama9")));
    }

    #[test]
    fn test_collector_rejects_truncated_stream() {
        let mut collector = StreamCollector::default();
        collector.push(b"{\"response\":\"Half a sum\",\"done\":false}\n").unwrap();

        let result = collector.finish();
        assert!(matches!(result, Err(Error::AiProvider(msg)) if msg.contains("before completion")));
    }

    #[tokio::test]
    async fn test_summarize_streams_over_http() {
        let base = crate::test_http::serve_once(
            "HTTP/1.1 200 OK",
            "application/x-ndjson",
            "{\"response\":\"Short \",\"done\":false}\n{\"response\":\"take.\",\"done\":true}\n",
        )
        .await;
        let provider = OllamaProvider::new(&base, "Summarize:", "llama3");

        assert_eq!(provider.summarize("text").await.unwrap(), "Short take.");
    }

    #[tokio::test]
    async fn test_summarize_reports_http_failure() {
        let base = crate::test_http::serve_once(
            "HTTP/1.1 500 Internal Server Error",
            "application/json",
            r#"{"error":"out of memory"}"#,
        )
        .await;
        let provider = OllamaProvider::new(&base, "Summarize:", "llama3");

        let err = provider.summarize("text").await.unwrap_err();
        assert!(matches!(&err, Error::AiProvider(msg) if msg.contains("HTTP 500")));
        assert!(err.to_string().contains("out of memory"));
    }

    #[tokio::test]
    async fn test_summarize_reports_error_after_ok_status() {
        let base = crate::test_http::serve_once(
            "HTTP/1.1 200 OK",
            "application/x-ndjson",
            "{\"error\":\"model 'llama9' not found\"}\n",
        )
        .await;
        let provider = OllamaProvider::new(&base, "Summarize:", "llama9");

        let err = provider.summarize("text").await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(msg) if msg.contains("not found")));
    }
}
