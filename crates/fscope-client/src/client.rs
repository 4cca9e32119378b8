//! HTTP implementations of the collaborator contracts.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use tracing::{debug, warn};

use fscope_mask::BinaryMask;
use fscope_models::{BBox, Detection, Frame, SemanticAnalysis};

use crate::contract::{ObjectDetector, Segmenter, SemanticAnalyzer};
use crate::error::{ClientError, ClientResult};
use crate::types::{
    AnalyzeRequest, DetectRequest, DetectResponse, HealthResponse, SegmentRequest, SegmentResponse,
};

/// Configuration shared by the collaborator clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries for transient failures inside the client
    pub max_retries: u32,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }

    /// Read `<PREFIX>_URL`, `<PREFIX>_TIMEOUT` (seconds) and
    /// `<PREFIX>_RETRIES` from the environment.
    pub fn from_env_prefix(prefix: &str, default_url: &str, default_timeout_secs: u64) -> Self {
        Self {
            base_url: std::env::var(format!("{prefix}_URL"))
                .unwrap_or_else(|_| default_url.to_string()),
            timeout: Duration::from_secs(
                std::env::var(format!("{prefix}_TIMEOUT"))
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default_timeout_secs),
            ),
            max_retries: std::env::var(format!("{prefix}_RETRIES"))
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        }
    }
}

fn build_http(config: &ClientConfig) -> ClientResult<Client> {
    Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(ClientError::Network)
}

/// Map an error HTTP response onto the client error taxonomy: 5xx and 429
/// are transient, everything else is a hard request failure.
async fn response_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() || status.as_u16() == 429 {
        ClientError::ServiceUnavailable(format!("{status}: {body}"))
    } else {
        ClientError::RequestFailed(format!("{status}: {body}"))
    }
}

/// Execute an operation with exponential backoff on retryable errors.
async fn with_retry<F, Fut, T>(max_retries: u32, operation: F) -> ClientResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = ClientResult<T>>,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                warn!(
                    "request failed (attempt {}), retrying in {:?}: {}",
                    attempt + 1,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or(ClientError::RequestFailed("unknown error".to_string())))
}

/// HTTP object detection client.
pub struct HttpDetector {
    http: Client,
    config: ClientConfig,
}

impl HttpDetector {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = build_http(&config)?;
        Ok(Self { http, config })
    }

    /// Create from `FSCOPE_DETECTOR_*` environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env_prefix(
            "FSCOPE_DETECTOR",
            "http://localhost:8001",
            30,
        ))
    }

    /// Check if the detection service is healthy.
    pub async fn health_check(&self) -> ClientResult<bool> {
        let url = format!("{}/health", self.config.base_url);
        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                Ok(health.status == "healthy" || health.status == "ok")
            }
            Ok(response) => {
                warn!("detector health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("detector health check error: {}", e);
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl ObjectDetector for HttpDetector {
    async fn detect(&self, frame: &Frame) -> ClientResult<Vec<Detection>> {
        let url = format!("{}/detect", self.config.base_url);
        let request = DetectRequest {
            frame_index: frame.index,
            width: frame.width,
            height: frame.height,
            frame: BASE64.encode(&frame.pixel_data),
        };

        debug!(frame = frame.index, "sending detection request");

        let response = with_retry(self.config.max_retries, || async {
            let response = self
                .http
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(ClientError::Network)?;

            if !response.status().is_success() {
                return Err(response_error(response).await);
            }
            Ok(response)
        })
        .await?;

        let parsed: DetectResponse = response.json().await?;
        Ok(parsed
            .detections
            .into_iter()
            .map(|d| Detection::new(frame.index, d.class_label, d.confidence, d.bbox))
            .collect())
    }
}

/// HTTP segmentation client.
///
/// Segment responses are RLE strings decoded at this boundary, so corrupt
/// masks surface here as typed errors rather than leaking malformed
/// strings into the result payload.
pub struct HttpSegmenter {
    http: Client,
    config: ClientConfig,
}

impl HttpSegmenter {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = build_http(&config)?;
        Ok(Self { http, config })
    }

    /// Create from `FSCOPE_SEGMENTER_*` environment variables. Returns
    /// `None` when no URL is configured: absence of a segmenter is a valid
    /// configuration.
    pub fn from_env() -> ClientResult<Option<Self>> {
        if std::env::var("FSCOPE_SEGMENTER_URL").is_err() {
            return Ok(None);
        }
        Ok(Some(Self::new(ClientConfig::from_env_prefix(
            "FSCOPE_SEGMENTER",
            "http://localhost:8002",
            60,
        ))?))
    }
}

#[async_trait]
impl Segmenter for HttpSegmenter {
    async fn segment(&self, frame: &Frame, bbox: &BBox) -> ClientResult<BinaryMask> {
        let url = format!("{}/segment", self.config.base_url);
        let request = SegmentRequest {
            frame_index: frame.index,
            width: frame.width,
            height: frame.height,
            frame: BASE64.encode(&frame.pixel_data),
            bbox: *bbox,
        };

        let response = with_retry(self.config.max_retries, || async {
            let response = self
                .http
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(ClientError::Network)?;

            if !response.status().is_success() {
                return Err(response_error(response).await);
            }
            Ok(response)
        })
        .await?;

        let parsed: SegmentResponse = response.json().await?;
        let mask = fscope_mask::decode(&parsed.rle, parsed.width, parsed.height)?;
        Ok(mask)
    }
}

/// HTTP semantic analysis client.
pub struct HttpSemanticAnalyzer {
    http: Client,
    config: ClientConfig,
}

impl HttpSemanticAnalyzer {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = build_http(&config)?;
        Ok(Self { http, config })
    }

    /// Create from `FSCOPE_SEMANTIC_*` environment variables. The default
    /// timeout is generous: whole-video analysis takes tens of seconds.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env_prefix(
            "FSCOPE_SEMANTIC",
            "http://localhost:8003",
            300,
        ))
    }
}

#[async_trait]
impl SemanticAnalyzer for HttpSemanticAnalyzer {
    async fn analyze(&self, video_ref: &str) -> ClientResult<SemanticAnalysis> {
        let url = format!("{}/analyze", self.config.base_url);
        let request = AnalyzeRequest {
            video_ref: video_ref.to_string(),
        };

        debug!(video_ref, "sending semantic analysis request");

        let response = with_retry(self.config.max_retries, || async {
            let response = self
                .http
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(ClientError::Network)?;

            if !response.status().is_success() {
                return Err(response_error(response).await);
            }
            Ok(response)
        })
        .await?;

        let analysis: SemanticAnalysis = response.json().await?;
        Ok(analysis)
    }
}
