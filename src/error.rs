use std::time::Duration;
use thiserror::Error;

/// Errors returned by relay operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Neither inline image data nor an image URL was usable.
    #[error("No image source provided")]
    MissingImage,

    /// Fetching the image behind a URL failed, timed out, or returned no bytes.
    #[error("Failed to fetch image from {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The upstream service could not be reached.
    #[error("Cannot connect to {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    /// The upstream service answered with a non-success status.
    #[error("Upstream returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// The upstream body was missing expected fields.
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    /// A caller-supplied field failed validation.
    #[error("{0}")]
    InvalidRequest(String),

    /// Audio payload could not be decoded.
    #[error("Invalid audio data: {0}")]
    InvalidAudio(String),
}

impl RelayError {
    /// True when the failure happened talking to Ollama or whisper.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            RelayError::Connection { .. }
                | RelayError::UpstreamStatus { .. }
                | RelayError::InvalidResponse(_)
        )
    }

    /// True when the caller sent something unusable.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RelayError::MissingImage | RelayError::InvalidRequest(_) | RelayError::InvalidAudio(_)
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Describe a transport failure. Timeouts name the limit that fired; other
/// failures append every underlying source to the message.
pub(crate) fn transport_reason(err: &reqwest::Error, timeout: Duration) -> String {
    if err.is_timeout() {
        return format!("timed out after {:?}", timeout);
    }
    let mut reason = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    reason
}
