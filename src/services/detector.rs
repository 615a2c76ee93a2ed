use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::models::detection::Detection;

/// Object detection capability the processor counts people with.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Detector: Send + Sync {
    /// Run detection on the image at `image_path`. The file is expected to exist.
    async fn detect(&self, image_path: &Path) -> Result<Vec<Detection>, DetectorError>;
}

/// Client for a YOLO model served behind an HTTP inference endpoint.
pub struct HttpDetector {
    http: Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    image: String,
    model: &'a str,
}

#[derive(Deserialize)]
struct DetectResponse {
    detections: Vec<Detection>,
}

impl HttpDetector {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DetectorError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(&self, image_path: &Path) -> Result<Vec<Detection>, DetectorError> {
        let image_bytes = tokio::fs::read(image_path).await?;

        // Reject anything the model server could not decode before paying for the upload
        let format = image::guess_format(&image_bytes)
            .map_err(|_| DetectorError::UnsupportedImage(image_path.display().to_string()))?;

        tracing::debug!(
            path = %image_path.display(),
            bytes = image_bytes.len(),
            format = ?format,
            "Sending snapshot to detector"
        );

        let request_body = DetectRequest {
            image: base64::engine::general_purpose::STANDARD.encode(&image_bytes),
            model: &self.model,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DetectorError::Status(status, body));
        }

        let parsed: DetectResponse = response.json().await?;
        Ok(parsed.detections)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a supported image: {0}")]
    UnsupportedImage(String),

    #[error("Detector request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Detector returned {0}: {1}")]
    Status(StatusCode, String),
}
