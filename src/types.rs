use serde::{Deserialize, Serialize};

/// Plain text chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: String,
}

/// Prompt plus one image, either inline or by URL.
///
/// When both `image` and `image_url` are set, `image` is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatWithImageRequest {
    #[serde(default)]
    pub prompt: String,
    /// Base64 image, optionally prefixed with a data URI header
    #[serde(default)]
    pub image: Option<String>,
    /// URL to download the image from
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Answer returned by both chat routes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub model_name: String,
    /// Wall-clock time spent on the upstream call, in milliseconds
    pub response_time: u64,
}

/// Transcription request carrying base64 audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeRequest {
    #[serde(default)]
    pub audio_base64: String,
    /// Language code (`zh`, `en`, `auto`, ...)
    #[serde(default = "default_language")]
    pub language: String,
    /// `json`, `text` or `verbose_json`
    #[serde(default = "default_response_format")]
    pub response_format: String,
    /// Ask whisper to translate into English
    #[serde(default)]
    pub translate: bool,
}

impl TranscribeRequest {
    pub fn new(audio_base64: impl Into<String>) -> Self {
        Self {
            audio_base64: audio_base64.into(),
            language: default_language(),
            response_format: default_response_format(),
            translate: false,
        }
    }
}

/// Outcome of a transcription; failures are reported in-band.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Milliseconds spent, including the failed attempt on error
    pub processing_time: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

pub(crate) fn default_language() -> String {
    "zh".to_string()
}

pub(crate) fn default_response_format() -> String {
    "json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_with_image_request_camel_case() {
        let req: ChatWithImageRequest = serde_json::from_str(
            r#"{"prompt": "describe", "imageUrl": "http://example.com/a.png"}"#,
        )
        .unwrap();
        assert_eq!(req.prompt, "describe");
        assert!(req.image.is_none());
        assert_eq!(req.image_url.as_deref(), Some("http://example.com/a.png"));
    }

    #[test]
    fn test_transcribe_request_defaults() {
        let req: TranscribeRequest =
            serde_json::from_str(r#"{"audioBase64": "UklGRg=="}"#).unwrap();
        assert_eq!(req.language, "zh");
        assert_eq!(req.response_format, "json");
        assert!(!req.translate);
    }

    #[test]
    fn test_chat_response_serialization() {
        let resp = ChatResponse {
            response: "a cat".to_string(),
            model_name: "llava".to_string(),
            response_time: 42,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"modelName\":\"llava\""));
        assert!(json.contains("\"responseTime\":42"));
    }

    #[test]
    fn test_failed_transcription_omits_text() {
        let resp = TranscribeResponse {
            success: false,
            error_message: Some("boom".to_string()),
            processing_time: 3,
            ..Default::default()
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("\"text\""));
        assert!(json.contains("\"errorMessage\":\"boom\""));
    }
}
