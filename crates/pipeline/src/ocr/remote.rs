//! Remote OCR backends: TrOCR and Docling, driven over HTTP by endpoint
//! URL. Both are `is_deferred() == true` — the pipeline runner schedules
//! them as concurrent consumers rather than blocking the producing stage,
//! the same way the corpus defers its own cloud-vision OCR backends.

#![allow(dead_code)]

use std::path::Path;

use base64::Engine;
use serde::{Deserialize, Serialize};

use idp_core::models::HocrPage;

use super::backend::{BackendConfig, OcrBackend, OcrBackendType, OcrConfig, OcrError};

#[derive(Debug, Serialize)]
struct OcrRequest {
    image_base64: String,
    mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    text: Option<String>,
    error: Option<String>,
}

struct RemoteOcrBackend {
    backend_type: OcrBackendType,
    endpoint_env: &'static str,
    endpoint: Option<String>,
    config: BackendConfig,
    client: reqwest::blocking::Client,
}

impl RemoteOcrBackend {
    fn new(backend_type: OcrBackendType, endpoint_env: &'static str, config: OcrConfig) -> Self {
        Self {
            backend_type,
            endpoint_env,
            endpoint: std::env::var(endpoint_env).ok(),
            config: BackendConfig::with_config(config),
            client: reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("reqwest client with default TLS config builds"),
        }
    }

    fn run(&self, image_path: &Path) -> Result<String, OcrError> {
        let endpoint = self.endpoint.as_ref().ok_or_else(|| {
            OcrError::BackendNotAvailable(format!("{} not set", self.endpoint_env))
        })?;

        let bytes = std::fs::read(image_path)?;
        let request = OcrRequest {
            image_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: "image/png",
        };

        let response = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .map_err(|e| OcrError::OcrFailed(format!("request to {} failed: {}", endpoint, e)))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(OcrError::RateLimited {
                backend: self.backend_type,
                retry_after_secs,
            });
        }
        if !response.status().is_success() {
            return Err(OcrError::OcrFailed(format!(
                "{} returned {}",
                endpoint,
                response.status()
            )));
        }

        let body: OcrResponse = response
            .json()
            .map_err(|e| OcrError::OcrFailed(format!("invalid response body: {}", e)))?;
        if let Some(err) = body.error {
            return Err(OcrError::OcrFailed(err));
        }
        body.text
            .ok_or_else(|| OcrError::OcrFailed(format!("{} returned no text", endpoint)))
    }
}

pub struct TrocrBackend {
    inner: RemoteOcrBackend,
}

impl TrocrBackend {
    pub fn new() -> Self {
        Self::with_config(OcrConfig::default())
    }

    pub fn with_config(config: OcrConfig) -> Self {
        Self {
            inner: RemoteOcrBackend::new(OcrBackendType::Trocr, "TROCR_ENDPOINT", config),
        }
    }
}

impl Default for TrocrBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for TrocrBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Trocr
    }

    fn is_available(&self) -> bool {
        self.inner.endpoint.is_some()
    }

    fn availability_hint(&self) -> String {
        "TROCR_ENDPOINT not set".to_string()
    }

    fn run_ocr(&self, image_path: &Path) -> Result<(String, Option<HocrPage>), OcrError> {
        Ok((self.inner.run(image_path)?, None))
    }
}

pub struct DoclingBackend {
    inner: RemoteOcrBackend,
}

impl DoclingBackend {
    pub fn new() -> Self {
        Self::with_config(OcrConfig::default())
    }

    pub fn with_config(config: OcrConfig) -> Self {
        Self {
            inner: RemoteOcrBackend::new(OcrBackendType::Docling, "DOCLING_ENDPOINT", config),
        }
    }
}

impl Default for DoclingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for DoclingBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Docling
    }

    fn is_available(&self) -> bool {
        self.inner.endpoint.is_some()
    }

    fn availability_hint(&self) -> String {
        "DOCLING_ENDPOINT not set".to_string()
    }

    fn run_ocr(&self, image_path: &Path) -> Result<(String, Option<HocrPage>), OcrError> {
        Ok((self.inner.run(image_path)?, None))
    }
}
