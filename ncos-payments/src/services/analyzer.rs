//! Audio analysis collaborator
//!
//! The analysis itself happens in an external worker; this service only
//! sends it the asset's audio URL and stores the JSON it answers with.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Upper bound for one analysis request
pub const ANALYZER_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Analyzer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Analyzer returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Analysis failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, asset_id: &str, audio_url: &str) -> Result<Value, AnalyzerError>;
}

/// Analyzer reached over HTTP at `{base_url}/analyze`
#[derive(Debug, Clone)]
pub struct HttpAnalyzer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalyzer {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AnalyzerError> {
        let client = reqwest::Client::builder().timeout(ANALYZER_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(&self, asset_id: &str, audio_url: &str) -> Result<Value, AnalyzerError> {
        let url = format!("{}/analyze", self.base_url);
        debug!(asset_id, url = %url, "Calling analysis worker");

        let response = self
            .client
            .post(&url)
            .json(&json!({ "audioUrl": audio_url, "assetId": asset_id }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}
