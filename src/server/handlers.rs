use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::envelope::{ApiError, ApiResponse, ApiResult};
use super::AppState;
use crate::error::RelayError;
use crate::types::{
    ChatRequest, ChatResponse, ChatWithImageRequest, TranscribeRequest, TranscribeResponse,
};

// ── Ollama ──────────────────────────────────────────────────────────

pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatResponse> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    require_prompt(&request.prompt)?;
    info!("Received text chat request");

    let started = Instant::now();
    let response = state.ollama.chat(&request.prompt).await?;

    Ok(ApiResponse::ok(ChatResponse {
        response,
        model_name: state.ollama.model_name().to_string(),
        response_time: started.elapsed().as_millis() as u64,
    }))
}

pub async fn chat_with_image(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatWithImageRequest>, JsonRejection>,
) -> ApiResult<ChatResponse> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    require_prompt(&request.prompt)?;
    info!(
        has_image = request.image.is_some(),
        has_image_url = request.image_url.is_some(),
        "Received image chat request"
    );

    let started = Instant::now();
    let response = state
        .ollama
        .chat_with_image(
            &request.prompt,
            request.image.as_deref(),
            request.image_url.as_deref(),
        )
        .await?;

    Ok(ApiResponse::ok(ChatResponse {
        response,
        model_name: state.ollama.model_name().to_string(),
        response_time: started.elapsed().as_millis() as u64,
    }))
}

pub async fn ollama_health(State(state): State<Arc<AppState>>) -> ApiResponse<String> {
    let reachable = state.ollama.health().await.unwrap_or(false);
    ApiResponse::ok(format!(
        "Relay is running (model: {}, upstream reachable: {})",
        state.ollama.model_name(),
        reachable
    ))
}

// ── Whisper ─────────────────────────────────────────────────────────

pub async fn recognize(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TranscribeRequest>, JsonRejection>,
) -> ApiResult<TranscribeResponse> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if request.audio_base64.trim().is_empty() {
        return Err(ApiError::bad_request("audioBase64 must not be blank"));
    }
    info!(
        audio_len = request.audio_base64.len(),
        language = %request.language,
        "Received transcription request"
    );

    Ok(into_envelope(state.whisper.recognize(&request).await))
}

pub async fn recognize_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<TranscribeResponse> {
    let mut audio: Option<Vec<u8>> = None;
    let mut language: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("unnamed").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                info!(file_name = %file_name, size = bytes.len(), "Received audio upload");
                audio = Some(bytes.to_vec());
            }
            Some("language") => {
                language = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(e.body_text()))?,
                );
            }
            _ => {}
        }
    }

    let audio = audio
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ApiError::bad_request("file part is required"))?;

    Ok(into_envelope(
        state.whisper.recognize_file(audio, language.as_deref()).await,
    ))
}

pub async fn whisper_health(State(state): State<Arc<AppState>>) -> ApiResponse<String> {
    ApiResponse::ok(format!(
        "Transcription relay is running (upstream: {})",
        state.whisper.inference_url()
    ))
}

fn require_prompt(prompt: &str) -> Result<(), RelayError> {
    if prompt.trim().is_empty() {
        return Err(RelayError::InvalidRequest("prompt must not be blank".to_string()));
    }
    Ok(())
}

fn into_envelope(response: TranscribeResponse) -> ApiResponse<TranscribeResponse> {
    if response.success {
        ApiResponse::ok(response)
    } else {
        let msg = response
            .error_message
            .clone()
            .unwrap_or_else(|| "Transcription failed".to_string());
        ApiResponse::error_with(StatusCode::INTERNAL_SERVER_ERROR, msg, response)
    }
}
