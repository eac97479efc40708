use base64::Engine;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::time::Instant;
use tracing::{error, info};

use crate::config::WhisperConfig;
use crate::error::{transport_reason, RelayError, Result};
use crate::image::normalize;
use crate::types::{default_language, TranscribeRequest, TranscribeResponse};

const UPLOAD_FILE_NAME: &str = "audio.wav";

/// Client for a whisper.cpp `server` instance.
#[derive(Debug, Clone)]
pub struct WhisperClient {
    http: Client,
    config: WhisperConfig,
}

impl WhisperClient {
    pub fn new(config: WhisperConfig) -> Self {
        Self::with_http_client(Client::new(), config)
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(http: Client, config: WhisperConfig) -> Self {
        Self { http, config }
    }

    pub fn inference_url(&self) -> String {
        self.config.inference_url()
    }

    /// Transcribe base64 audio. Failures are reported in the response.
    pub async fn recognize(&self, request: &TranscribeRequest) -> TranscribeResponse {
        info!(
            audio_len = request.audio_base64.len(),
            language = %request.language,
            "Transcribing base64 audio"
        );
        let started = Instant::now();

        let outcome: Result<Option<String>> = async {
            let audio = decode_audio(&request.audio_base64)?;
            self.transcribe(
                audio,
                &request.language,
                &request.response_format,
                request.translate,
            )
            .await
        }
        .await;

        finish(outcome, &request.language, started)
    }

    /// Transcribe an uploaded audio file. Blank `language` means `zh`.
    pub async fn recognize_file(&self, audio: Vec<u8>, language: Option<&str>) -> TranscribeResponse {
        let language = language
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(default_language);
        info!(size = audio.len(), language = %language, "Transcribing uploaded audio");
        let started = Instant::now();

        let outcome = self.transcribe(audio, &language, "json", false).await;
        finish(outcome, &language, started)
    }

    /// POST audio to the inference route and return the recognized text.
    ///
    /// A JSON object body yields its `text` field, or `None` when the field is
    /// absent. Any other body is returned as-is.
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        language: &str,
        response_format: &str,
        translate: bool,
    ) -> Result<Option<String>> {
        let mut form = Form::new().part(
            "file",
            Part::bytes(audio).file_name(UPLOAD_FILE_NAME.to_string()),
        );
        if !language.trim().is_empty() {
            form = form.text("language", language.to_string());
        }
        if !response_format.trim().is_empty() {
            form = form.text("response_format", response_format.to_string());
        }
        if translate {
            form = form.text("translate", "true");
        }

        let url = self.config.inference_url();
        info!(url = %url, "Calling whisper server");
        let resp = self
            .http
            .post(&url)
            .timeout(self.config.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RelayError::Connection {
                endpoint: self.config.url.clone(),
                reason: transport_reason(&e, self.config.timeout),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::UpstreamStatus { status, body });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;
        Ok(extract_text(body))
    }
}

fn decode_audio(audio_base64: &str) -> Result<Vec<u8>> {
    let payload = normalize(audio_base64.trim());
    if payload.is_empty() {
        return Err(RelayError::InvalidAudio("audio data is empty".to_string()));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| RelayError::InvalidAudio(e.to_string()))
}

fn extract_text(body: String) -> Option<String> {
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(json)) => json
            .get("text")
            .and_then(|v| v.as_str())
            .map(|text| text.trim().to_string()),
        _ => Some(body),
    }
}

fn finish(outcome: Result<Option<String>>, language: &str, started: Instant) -> TranscribeResponse {
    let processing_time = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(text) => {
            info!(processing_time, "Transcription succeeded");
            TranscribeResponse {
                text,
                language: Some(language.to_string()),
                processing_time,
                success: true,
                error_message: None,
            }
        }
        Err(e) => {
            error!(error = %e, "Transcription failed");
            TranscribeResponse {
                processing_time,
                success: false,
                error_message: Some(format!("Transcription failed: {}", e)),
                ..Default::default()
            }
        }
    }
}
