//! Image source resolution for multimodal requests.
//!
//! A request may carry an image inline (base64, optionally framed as a data
//! URI) or as a URL to download. Inline data always wins; the URL is only
//! fetched when no inline data was supplied.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{transport_reason, RelayError, Result};

/// Downloads the raw bytes behind an image URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the resource at `url`. Implementations must reject empty bodies.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`ImageFetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    http: Client,
    timeout: Duration,
}

impl HttpImageFetcher {
    pub fn new(http: Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let fetch_error = |reason: String| RelayError::Fetch {
            url: url.to_string(),
            reason,
        };

        let resp = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| fetch_error(transport_reason(&e, self.timeout)))?;

        if !resp.status().is_success() {
            return Err(fetch_error(format!("HTTP {}", resp.status().as_u16())));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| fetch_error(transport_reason(&e, self.timeout)))?;
        if bytes.is_empty() {
            return Err(fetch_error("empty body".to_string()));
        }

        debug!(url, size = bytes.len(), "Fetched image");
        Ok(bytes.to_vec())
    }
}

/// Pick the image source and turn it into a bare base64 payload.
///
/// Non-blank `inline_data` is normalized and returned without touching the
/// fetcher. Otherwise a non-blank `image_url` is downloaded and encoded.
///
/// # Errors
///
/// - [`RelayError::MissingImage`] if both inputs are absent or blank
/// - [`RelayError::Fetch`] if the download fails or returns no bytes
pub async fn resolve<F>(
    fetcher: &F,
    inline_data: Option<&str>,
    image_url: Option<&str>,
) -> Result<String>
where
    F: ImageFetcher + ?Sized,
{
    if let Some(data) = non_blank(inline_data) {
        return Ok(normalize(data).to_string());
    }

    if let Some(url) = non_blank(image_url) {
        info!(url, "Downloading image from URL");
        let bytes = fetcher.fetch(url).await?;
        if bytes.is_empty() {
            return Err(RelayError::Fetch {
                url: url.to_string(),
                reason: "empty body".to_string(),
            });
        }
        return Ok(base64::engine::general_purpose::STANDARD.encode(&bytes));
    }

    Err(RelayError::MissingImage)
}

/// Strip a `<prefix>,` header such as `data:image/png;base64,`.
///
/// Only the first comma is significant; anything after it is kept verbatim.
pub fn normalize(data: &str) -> &str {
    match data.split_once(',') {
        Some((_, payload)) => payload,
        None => data,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fetcher that counts calls and returns canned bytes.
    struct StubFetcher {
        body: Vec<u8>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn returning(body: &[u8]) -> Self {
            Self {
                body: body.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageFetcher for StubFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl ImageFetcher for FailingFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(RelayError::Fetch {
                url: url.to_string(),
                reason: "timed out after 30s".to_string(),
            })
        }
    }

    // ── normalize ──

    #[test]
    fn normalize_strips_data_uri_header() {
        assert_eq!(normalize("data:image/png;base64,AAAA"), "AAAA");
    }

    #[test]
    fn normalize_keeps_plain_payload() {
        assert_eq!(normalize("AAAA"), "AAAA");
    }

    #[test]
    fn normalize_splits_on_first_comma_only() {
        assert_eq!(normalize("a,b,c"), "b,c");
    }

    #[test]
    fn normalize_trailing_comma_yields_empty() {
        assert_eq!(normalize("data:image/png;base64,"), "");
    }

    // ── resolve ──

    #[tokio::test]
    async fn inline_data_wins_over_url() {
        let fetcher = StubFetcher::returning(b"remote");
        let image = resolve(
            &fetcher,
            Some("data:image/jpeg;base64,/9j/4AAQ"),
            Some("http://example.com/cat.jpg"),
        )
        .await
        .unwrap();

        assert_eq!(image, "/9j/4AAQ");
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn inline_data_is_trimmed() {
        let fetcher = StubFetcher::returning(b"");
        let image = resolve(&fetcher, Some("  iVBORw0KGgo=\n"), None)
            .await
            .unwrap();
        assert_eq!(image, "iVBORw0KGgo=");
    }

    #[tokio::test]
    async fn blank_inline_falls_back_to_url() {
        let fetcher = StubFetcher::returning(b"hello");
        let image = resolve(&fetcher, Some("   "), Some("http://example.com/a.png"))
            .await
            .unwrap();

        assert_eq!(image, "aGVsbG8=");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn missing_sources_fail() {
        let fetcher = StubFetcher::returning(b"unused");
        for (inline, url) in [(None, Some("")), (Some(""), None), (None, None), (Some(" "), Some(" "))] {
            let err = resolve(&fetcher, inline, url).await.unwrap_err();
            assert!(matches!(err, RelayError::MissingImage));
        }
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn empty_download_is_fetch_error() {
        let fetcher = StubFetcher::returning(b"");
        let err = resolve(&fetcher, None, Some("http://example.com/empty.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Fetch { .. }));
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let err = resolve(&FailingFetcher, None, Some("http://slow.example.com/x.png"))
            .await
            .unwrap_err();
        match err {
            RelayError::Fetch { url, reason } => {
                assert_eq!(url, "http://slow.example.com/x.png");
                assert!(reason.contains("timed out"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
