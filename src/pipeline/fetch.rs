//! Background fetching: one themed image per slide, streamed to disk.
//!
//! Each slide gets exactly one [`AssetOutcome`], success or failure, so the
//! completion barrier downstream always sees every slide settle.
//!
//! ## Retry Strategy
//!
//! Every attempt is bounded by `fetch_timeout_secs`. Transient failures
//! (timeouts, connection errors, 5xx, 408/429) are retried up to
//! `max_retries` times with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`, capped at [`MAX_BACKOFF`]).
//! Permanent failures (other 4xx, a body that is not an image) stop
//! immediately.

use crate::config::DeckConfig;
use crate::error::{AssetError, DeckError};
use crate::pipeline::store::AssetLocations;
use async_trait::async_trait;
use futures::StreamExt;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Longest single wait between two attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// What to fetch for one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Slide index; doubles as the per-slide disambiguator in the query.
    pub index: usize,
    /// Comma-joined keywords.
    pub keywords: String,
}

/// A source of themed background images.
///
/// Implementations write the raw image body into `sink` and return the
/// number of bytes written. The default is [`HttpImageSource`]; tests and
/// embedders can inject their own through
/// [`crate::config::DeckConfigBuilder::image_source`].
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_into(
        &self,
        request: &ImageRequest,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, AssetError>;
}

/// Fetches images with one HTTP GET per slide against a search endpoint.
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    timeout_secs: u64,
}

impl HttpImageSource {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, DeckError> {
        let endpoint = reqwest::Url::parse(endpoint).map_err(|e| {
            DeckError::InvalidConfig(format!("Invalid image endpoint '{}': {}", endpoint, e))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DeckError::Internal(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint,
            timeout_secs,
        })
    }

    pub fn from_config(config: &DeckConfig) -> Result<Self, DeckError> {
        Self::new(&config.image_endpoint, config.fetch_timeout_secs)
    }

    /// `<endpoint>?<keywords>&sig=<index>`, each keyword percent-encoded.
    pub fn query_url(&self, request: &ImageRequest) -> reqwest::Url {
        let keywords = request
            .keywords
            .split(',')
            .map(|k| urlencoding::encode(k.trim()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        let mut url = self.endpoint.clone();
        url.set_query(Some(&format!("{}&sig={}", keywords, request.index)));
        url
    }

    fn map_reqwest(&self, index: usize, e: reqwest::Error) -> AssetError {
        if e.is_timeout() {
            AssetError::Timeout {
                index,
                secs: self.timeout_secs,
                attempts: 1,
            }
        } else {
            AssetError::Network {
                index,
                attempts: 1,
                detail: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch_into(
        &self,
        request: &ImageRequest,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, AssetError> {
        let index = request.index;
        let url = self.query_url(request);
        debug!("Slide {}: GET {}", index, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_reqwest(index, e))?;

        if !response.status().is_success() {
            return Err(AssetError::Http {
                index,
                status: response.status().as_u16(),
                attempts: 1,
            });
        }

        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| self.map_reqwest(index, e))?;
            sink.write_all(&chunk).await.map_err(|e| AssetError::Io {
                index,
                detail: e.to_string(),
            })?;
            written += chunk.len() as u64;
        }
        Ok(written)
    }
}

/// A background that landed in asset storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub path: PathBuf,
    pub format: ImageFormat,
    pub bytes: u64,
}

/// Terminal result of one slide's fetch, after retries.
#[derive(Debug, Clone)]
pub struct AssetOutcome {
    pub index: usize,
    pub result: Result<StoredAsset, AssetError>,
    pub attempts: u32,
    pub duration_ms: u64,
}

/// Fetch slide `request.index`'s background, retrying transient failures.
///
/// Always returns an outcome; never propagates the error upward.
pub async fn fetch_asset(
    source: &Arc<dyn ImageSource>,
    request: &ImageRequest,
    locations: &AssetLocations,
    config: &DeckConfig,
) -> AssetOutcome {
    let start = Instant::now();
    let index = request.index;
    let per_attempt = Duration::from_secs(config.fetch_timeout_secs);
    let mut last_err: Option<AssetError> = None;
    let mut attempts = 0;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_delay(config.retry_backoff_ms, attempt);
            warn!(
                "Slide {}: retry {}/{} after {}ms",
                index,
                attempt,
                config.max_retries,
                backoff.as_millis()
            );
            sleep(backoff).await;
        }
        attempts = attempt + 1;

        let result = match timeout(per_attempt, fetch_once(source, request, locations)).await {
            Ok(result) => result,
            Err(_) => Err(AssetError::Timeout {
                index,
                secs: config.fetch_timeout_secs,
                attempts: 1,
            }),
        };

        match result {
            Ok(asset) => {
                debug!(
                    "Slide {}: {} bytes of {:?} in {:?}",
                    index,
                    asset.bytes,
                    asset.format,
                    start.elapsed()
                );
                return AssetOutcome {
                    index,
                    result: Ok(asset),
                    attempts,
                    duration_ms: start.elapsed().as_millis() as u64,
                };
            }
            Err(e) => {
                warn!("Slide {}: attempt {} failed: {}", index, attempts, e);
                let retryable = e.is_retryable();
                last_err = Some(e);
                if !retryable {
                    break;
                }
            }
        }
    }

    let _ = tokio::fs::remove_file(locations.staging_path(index)).await;
    let err = last_err
        .unwrap_or_else(|| AssetError::Network {
            index,
            attempts,
            detail: "no attempt was made".to_string(),
        })
        .with_attempts(attempts);

    AssetOutcome {
        index,
        result: Err(err),
        attempts,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

/// Delay before retry number `attempt` (1-based).
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor)).min(MAX_BACKOFF)
}

/// One attempt: download into the staging file, sniff the format, then move
/// the file to its final `img<i>.<ext>` name.
async fn fetch_once(
    source: &Arc<dyn ImageSource>,
    request: &ImageRequest,
    locations: &AssetLocations,
) -> Result<StoredAsset, AssetError> {
    let index = request.index;
    let io_err = |e: std::io::Error| AssetError::Io {
        index,
        detail: e.to_string(),
    };

    let staging = locations.staging_path(index);
    let mut file = tokio::fs::File::create(&staging).await.map_err(io_err)?;
    let bytes = source.fetch_into(request, &mut file).await?;
    file.flush().await.map_err(io_err)?;
    drop(file);

    let format = sniff_format(&staging)
        .await
        .map_err(io_err)?
        .ok_or(AssetError::NotAnImage { index })?;
    let extension = format.extensions_str().first().copied().unwrap_or("png");
    let path = locations.asset_path(index, extension);
    tokio::fs::rename(&staging, &path).await.map_err(io_err)?;

    Ok(StoredAsset {
        path,
        format,
        bytes,
    })
}

/// Identify the image format from the file's leading bytes.
async fn sniff_format(path: &Path) -> std::io::Result<Option<ImageFormat>> {
    let mut head = Vec::with_capacity(32);
    tokio::fs::File::open(path)
        .await?
        .take(32)
        .read_to_end(&mut head)
        .await?;
    Ok(image::guess_format(&head).ok())
}
