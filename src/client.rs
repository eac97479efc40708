use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::config::OllamaConfig;
use crate::decoder;
use crate::error::{transport_reason, RelayError, Result};
use crate::image::{self, HttpImageFetcher, ImageFetcher};

/// Async client for an Ollama server.
///
/// Text prompts go through `/api/chat`. Prompts with an image go through
/// streaming `/api/generate`; the streamed body is buffered and rebuilt into
/// one answer by [`decoder::decode_stream`].
///
/// # Example
/// ```no_run
/// use ollama_relay::{OllamaClient, OllamaConfig};
///
/// # async fn example() -> ollama_relay::Result<()> {
/// let client = OllamaClient::new(OllamaConfig::with_model("llava"));
/// let answer = client
///     .chat_with_image("What is in this picture?", None, Some("https://example.com/cat.jpg"))
///     .await?;
/// println!("{answer}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    config: OllamaConfig,
    fetcher: Arc<dyn ImageFetcher>,
}

impl OllamaClient {
    /// Create a client with its own connection pool.
    pub fn new(config: OllamaConfig) -> Self {
        Self::with_http_client(Client::new(), config)
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(http: Client, config: OllamaConfig) -> Self {
        let fetcher = Arc::new(HttpImageFetcher::new(http.clone(), config.fetch_timeout));
        Self {
            http,
            config,
            fetcher,
        }
    }

    /// Replace the image downloader.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Name of the model every request is sent to.
    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    // ── Health ──────────────────────────────────────────────────────

    /// Check whether Ollama is reachable via `/api/tags`.
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.config.endpoint);
        let resp = self
            .http
            .get(&url)
            .timeout(self.config.health_timeout)
            .send()
            .await
            .map_err(|e| self.connection_error(e, self.config.health_timeout))?;
        Ok(resp.status().is_success())
    }

    // ── Chat ────────────────────────────────────────────────────────

    /// Send a text-only prompt and return the model's reply.
    pub async fn chat(&self, prompt: &str) -> Result<String> {
        info!(prompt_len = prompt.len(), "Sending text prompt to Ollama");
        let started = Instant::now();

        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
            "options": { "temperature": self.config.temperature },
        });

        let url = format!("{}/api/chat", self.config.endpoint);
        let resp = self
            .http
            .post(&url)
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.connection_error(e, self.config.timeout))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            error!(status, body = %text, "Ollama chat failed");
            return Err(RelayError::UpstreamStatus { status, body: text });
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;

        let content = json
            .pointer("/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RelayError::InvalidResponse("Response missing message.content".into()))?
            .to_string();

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            answer_len = content.len(),
            "Ollama chat completed"
        );
        Ok(content)
    }

    /// Send a prompt with one image and return the rebuilt streamed answer.
    ///
    /// `image` (base64, data URI header allowed) takes priority over
    /// `image_url`; the URL is only downloaded when `image` is blank.
    ///
    /// # Errors
    ///
    /// - [`RelayError::MissingImage`] if neither image input is usable
    /// - [`RelayError::Fetch`] if the image URL cannot be downloaded
    /// - [`RelayError::Connection`] / [`RelayError::UpstreamStatus`] if the
    ///   Ollama call fails
    ///
    /// A malformed stream is not an error: the decoder's sentinel text is
    /// returned instead.
    pub async fn chat_with_image(
        &self,
        prompt: &str,
        image: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<String> {
        let image_b64 = image::resolve(self.fetcher.as_ref(), image, image_url).await?;
        info!(
            prompt_len = prompt.len(),
            image_len = image_b64.len(),
            "Sending image prompt to Ollama"
        );
        let started = Instant::now();

        let body = self.generate_body(prompt, &image_b64);
        let url = format!("{}/api/generate", self.config.endpoint);
        let resp = self
            .http
            .post(&url)
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.connection_error(e, self.config.timeout))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            error!(status, body = %text, "Ollama generate failed");
            return Err(RelayError::UpstreamStatus { status, body: text });
        }

        let stream_body = resp
            .text()
            .await
            .map_err(|e| self.connection_error(e, self.config.timeout))?;
        let answer = decoder::decode_stream(&stream_body);

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            stream_len = stream_body.len(),
            answer_len = answer.len(),
            "Ollama image prompt completed"
        );
        Ok(answer)
    }

    fn generate_body(&self, prompt: &str, image_b64: &str) -> Value {
        json!({
            "model": self.config.model,
            "prompt": prompt,
            "images": [image_b64],
            "temperature": self.config.temperature,
            "stream": true,
            "options": { "temperature": self.config.temperature },
        })
    }

    fn connection_error(&self, e: reqwest::Error, timeout: Duration) -> RelayError {
        let reason = transport_reason(&e, timeout);
        error!(endpoint = %self.config.endpoint, error = %reason, "Ollama request failed");
        RelayError::Connection {
            endpoint: self.config.endpoint.clone(),
            reason,
        }
    }
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_exposes_model_name() {
        let client = OllamaClient::new(OllamaConfig::with_model("llava:13b"));
        assert_eq!(client.model_name(), "llava:13b");
        assert_eq!(client.endpoint(), "http://localhost:11434");
    }

    #[test]
    fn test_generate_body_shape() {
        let client = OllamaClient::new(OllamaConfig::with_model("qwen2.5vl:3b").temperature(0.3));
        let body = client.generate_body("Describe the scene", "AAAA");

        assert_eq!(body["model"], "qwen2.5vl:3b");
        assert_eq!(body["prompt"], "Describe the scene");
        assert_eq!(body["stream"], true);
        assert_eq!(body["temperature"], 0.3);
        assert_eq!(body["options"]["temperature"], 0.3);

        let images = body["images"].as_array().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0], "AAAA");
    }

    struct CountingFetcher(std::sync::atomic::AtomicUsize);

    #[async_trait::async_trait]
    impl ImageFetcher for CountingFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(b"img".to_vec())
        }
    }

    #[tokio::test]
    async fn test_custom_fetcher_is_used_for_urls() {
        let fetcher = Arc::new(CountingFetcher(Default::default()));
        let client = OllamaClient::new(OllamaConfig::default().endpoint("http://127.0.0.1:9"))
            .with_fetcher(fetcher.clone());

        let err = client
            .chat_with_image("what is this?", None, Some("http://images.local/a.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Connection { .. }));
        assert_eq!(fetcher.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_image_fails_before_network() {
        let client = OllamaClient::new(OllamaConfig::default().endpoint("http://127.0.0.1:9"));
        let err = client
            .chat_with_image("what is this?", Some(""), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::MissingImage));
    }
}
