//! Shoe-generation relay.
//!
//! Forwards a foot scan and design choices to the ScanSoles API and returns
//! the generated model's URL and price estimate. One call, no state.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default ScanSoles API endpoint.
pub const DEFAULT_SCANSOLES_URL: &str = "https://api.scansoles.com";

/// Incoming shoe design request, as the frontend sends it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoeDesignRequest {
    #[serde(default)]
    pub foot_scan_data: serde_json::Value,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
}

/// Generated shoe returned to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoeDesign {
    pub model_url: String,
    pub price_estimate: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GenerateShoeBody<'a> {
    scan_data: &'a serde_json::Value,
    design: DesignChoices<'a>,
}

#[derive(Debug, Serialize)]
struct DesignChoices<'a> {
    style: Option<&'a str>,
    color: Option<&'a str>,
    material: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GenerateShoeResponse {
    model_url: String,
    #[serde(default)]
    price_estimate: serde_json::Value,
}

/// Errors from the shoe relay.
#[derive(Debug, thiserror::Error)]
pub enum ShoeError {
    #[error("Invalid shoe request: {0}")]
    InvalidRequest(String),

    #[error("ScanSoles API key is not configured")]
    NotConfigured,

    #[error("ScanSoles API unavailable: {0}")]
    Unavailable(String),

    #[error("ScanSoles API rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("ScanSoles API returned a malformed response: {0}")]
    Malformed(String),
}

/// Something that can turn a foot scan into a shoe model.
#[async_trait]
pub trait ShoeDesigner: Send + Sync + std::fmt::Debug {
    async fn generate(&self, request: &ShoeDesignRequest) -> Result<ShoeDesign, ShoeError>;
}

/// [`ShoeDesigner`] backed by the ScanSoles HTTP API.
#[derive(Clone)]
pub struct ScanSolesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for ScanSolesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSolesClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl ScanSolesClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self::with_client(http, base_url, api_key))
    }

    #[must_use]
    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

#[async_trait]
impl ShoeDesigner for ScanSolesClient {
    async fn generate(&self, request: &ShoeDesignRequest) -> Result<ShoeDesign, ShoeError> {
        let api_key = self.api_key.as_deref().ok_or(ShoeError::NotConfigured)?;
        let url = format!("{}/v1/generate-shoe", self.base_url);
        debug!(%url, style = ?request.style, "Requesting shoe generation");

        let body = GenerateShoeBody {
            scan_data: &request.foot_scan_data,
            design: DesignChoices {
                style: request.style.as_deref(),
                color: request.color.as_deref(),
                material: request.material.as_deref(),
            },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ShoeError::Unavailable(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ShoeError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            let message: String = String::from_utf8_lossy(&bytes).chars().take(200).collect();
            warn!(status = status.as_u16(), "ScanSoles rejected shoe generation");
            return Err(ShoeError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateShoeResponse =
            serde_json::from_slice(&bytes).map_err(|e| ShoeError::Malformed(e.to_string()))?;

        Ok(ShoeDesign {
            model_url: parsed.model_url,
            price_estimate: parsed.price_estimate,
        })
    }
}
