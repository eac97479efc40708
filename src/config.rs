use std::time::Duration;

/// Connection settings for the Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Ollama API endpoint (e.g., "http://localhost:11434")
    pub endpoint: String,
    /// Model used for every request (e.g., "qwen2.5vl:3b", "llava")
    pub model: String,
    /// Sampling temperature sent with each request
    pub temperature: f64,
    /// Timeout for inference calls (default: 120s)
    pub timeout: Duration,
    /// Timeout for downloading images referenced by URL (default: 30s)
    pub fetch_timeout: Duration,
    /// Timeout for the `/api/tags` reachability check (default: 5s)
    pub health_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "qwen2.5vl:3b".to_string(),
            temperature: 0.7,
            timeout: Duration::from_secs(120),
            fetch_timeout: Duration::from_secs(30),
            health_timeout: Duration::from_secs(5),
        }
    }
}

impl OllamaConfig {
    /// Create a new config with the given model name.
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the Ollama endpoint. Trailing slashes are dropped.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the inference timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the image download timeout.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }
}

/// Settings for the whisper.cpp transcription server.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Base URL of the whisper server
    pub url: String,
    /// Path of the inference route
    pub inference_path: String,
    /// Request timeout (default: 60s)
    pub timeout: Duration,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8083".to_string(),
            inference_path: "/inference".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl WhisperConfig {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn inference_path(mut self, path: impl Into<String>) -> Self {
        self.inference_path = path.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the inference route.
    pub fn inference_url(&self) -> String {
        format!("{}{}", self.url, self.inference_path)
    }
}

/// Address the REST server binds to.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Top-level relay configuration.
///
/// Use [`RelayConfig::builder()`] for ergonomic construction, or
/// [`RelayConfig::default()`] for local defaults.
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub ollama: OllamaConfig,
    pub whisper: WhisperConfig,
}

impl RelayConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::default()
    }
}

/// Builder for [`RelayConfig`].
#[derive(Default)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.server = ServerConfig {
            host: host.into(),
            port,
        };
        self
    }

    pub fn with_ollama(mut self, ollama: OllamaConfig) -> Self {
        self.config.ollama = ollama;
        self
    }

    pub fn with_whisper(mut self, whisper: WhisperConfig) -> Self {
        self.config.whisper = whisper;
        self
    }

    /// Build the final [`RelayConfig`].
    pub fn build(self) -> RelayConfig {
        self.config
    }
}
