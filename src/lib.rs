//! # ollama-relay
//!
//! REST relay in front of an Ollama server (text and image prompts) and a
//! whisper.cpp server (speech transcription).
//!
//! ## Features
//!
//! - **Image prompts** with inline base64 (data URI headers stripped) or an
//!   image URL that the relay downloads itself. Inline data always wins.
//! - **Streaming decode**: image prompts use streaming `/api/generate`; the
//!   newline-delimited JSON body is rebuilt into one answer, skipping
//!   malformed lines instead of failing
//! - **Text chat** through `/api/chat`
//! - **Transcription** via multipart upload to whisper.cpp
//! - **axum server** with a uniform `{code, msg, data}` envelope
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ollama_relay::{OllamaClient, OllamaConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OllamaClient::new(OllamaConfig::with_model("llava"));
//!
//!     let answer = client
//!         .chat_with_image(
//!             "What is in this picture?",
//!             Some("data:image/png;base64,iVBORw0KGgo..."),
//!             None,
//!         )
//!         .await?;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Stream Decoding
//!
//! ```rust
//! use ollama_relay::decode_stream;
//!
//! let body = "{\"response\":\"Hello\",\"done\":false}\n{\"response\":\" world\",\"done\":true}";
//! assert_eq!(decode_stream(body), "Hello world");
//!
//! // Lines that cannot be read are skipped
//! let body = "garbage\n{\"response\":\"ok\",\"done\":true}";
//! assert_eq!(decode_stream(body), "ok");
//! ```

pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod image;
pub mod server;
pub mod types;
pub mod whisper;

// Re-export main types at crate root
pub use client::OllamaClient;
pub use config::{OllamaConfig, RelayConfig, RelayConfigBuilder, ServerConfig, WhisperConfig};
pub use decoder::{decode_stream, fragments};
pub use error::{RelayError, Result};
pub use image::{HttpImageFetcher, ImageFetcher};
pub use server::{router, AppState};
pub use types::{
    ChatRequest, ChatResponse, ChatWithImageRequest, TranscribeRequest, TranscribeResponse,
};
pub use whisper::WhisperClient;
