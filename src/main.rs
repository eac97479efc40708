use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ollama_relay::{router, AppState, OllamaConfig, RelayConfig, WhisperConfig};

/// REST relay for Ollama multimodal chat and whisper.cpp transcription.
#[derive(Parser, Debug)]
#[command(name = "ollama-relay", version, about)]
struct Args {
    /// Address to bind
    #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "RELAY_PORT", default_value_t = 8080)]
    port: u16,

    /// Ollama API endpoint
    #[arg(long, env = "OLLAMA_ENDPOINT", default_value = "http://localhost:11434")]
    ollama_endpoint: String,

    /// Model used for all prompts
    #[arg(long, env = "OLLAMA_MODEL", default_value = "qwen2.5vl:3b")]
    model: String,

    /// Sampling temperature
    #[arg(long, env = "OLLAMA_TEMPERATURE", default_value_t = 0.7)]
    temperature: f64,

    /// Inference timeout in seconds
    #[arg(long, env = "OLLAMA_TIMEOUT_SECS", default_value_t = 120)]
    ollama_timeout: u64,

    /// Image download timeout in seconds
    #[arg(long, env = "IMAGE_FETCH_TIMEOUT_SECS", default_value_t = 30)]
    fetch_timeout: u64,

    /// whisper.cpp server base URL
    #[arg(long, env = "WHISPER_URL", default_value = "http://localhost:8083")]
    whisper_url: String,

    /// whisper.cpp inference route
    #[arg(long, env = "WHISPER_INFERENCE_PATH", default_value = "/inference")]
    whisper_inference_path: String,

    /// Transcription timeout in seconds
    #[arg(long, env = "WHISPER_TIMEOUT_SECS", default_value_t = 60)]
    whisper_timeout: u64,
}

impl Args {
    fn into_config(self) -> RelayConfig {
        RelayConfig::builder()
            .with_server(self.host, self.port)
            .with_ollama(
                OllamaConfig::with_model(self.model)
                    .endpoint(self.ollama_endpoint)
                    .temperature(self.temperature)
                    .timeout(Duration::from_secs(self.ollama_timeout))
                    .fetch_timeout(Duration::from_secs(self.fetch_timeout)),
            )
            .with_whisper(
                WhisperConfig::default()
                    .url(self.whisper_url)
                    .inference_path(self.whisper_inference_path)
                    .timeout(Duration::from_secs(self.whisper_timeout)),
            )
            .build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();
    info!(
        ollama = %config.ollama.endpoint,
        model = %config.ollama.model,
        whisper = %config.whisper.inference_url(),
        "Starting ollama-relay"
    );

    let state = Arc::new(AppState::from_config(&config));
    let app = router(state);

    let bind_address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
