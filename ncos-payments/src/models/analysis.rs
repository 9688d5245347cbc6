//! Asset audio analysis job state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Maximum number of times a failed analysis may be re-queued
pub const MAX_ANALYSIS_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "PENDING",
            AnalysisStatus::Processing => "PROCESSING",
            AnalysisStatus::Complete => "COMPLETE",
            AnalysisStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AnalysisStatus::Pending),
            "PROCESSING" => Ok(AnalysisStatus::Processing),
            "COMPLETE" => Ok(AnalysisStatus::Complete),
            "FAILED" => Ok(AnalysisStatus::Failed),
            other => Err(format!("Unknown analysis status: {}", other)),
        }
    }
}

/// One analysis record per asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAnalysis {
    pub asset_id: String,
    pub audio_url: String,
    pub status: AnalysisStatus,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssetAnalysis {
    pub fn new(asset_id: impl Into<String>, audio_url: impl Into<String>) -> Self {
        let now = ncos_common::time::now();
        Self {
            asset_id: asset_id.into(),
            audio_url: audio_url.into(),
            status: AnalysisStatus::Pending,
            retry_count: 0,
            result: None,
            error_message: None,
            last_retry_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= MAX_ANALYSIS_RETRIES
    }
}
