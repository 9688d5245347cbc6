//! Asset analysis job queue
//!
//! Requests enqueue jobs on a bounded channel; a single background worker
//! drains it, calling the [`Analyzer`] and writing the outcome back to the
//! [`AnalysisStore`]. Scheduling is independent of the triggering request:
//! the caller gets an answer as soon as the job is queued and polls status.
//!
//! A channel slot is reserved before any record is written, so a full or
//! stopped queue leaves the stored analysis untouched. A failed analysis may
//! be re-queued at most [`MAX_ANALYSIS_RETRIES`] times.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::analyzer::Analyzer;
use crate::db::AnalysisStore;
use crate::models::{AnalysisStatus, AssetAnalysis, MAX_ANALYSIS_RETRIES};

/// Default job channel capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Analysis not found: {0}")]
    NotFound(String),

    #[error("Maximum retry limit reached ({max} attempts)")]
    RetryLimitReached { max: u32 },

    #[error("Analysis queue is full, try again later")]
    QueueFull,

    #[error("Analysis queue is not running")]
    QueueClosed,

    #[error(transparent)]
    Store(#[from] ncos_common::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisJob {
    pub asset_id: String,
}

/// Result of [`AnalysisQueue::queue`]
#[derive(Debug, Clone)]
pub struct QueueOutcome {
    pub analysis: AssetAnalysis,
    /// False when the asset was already COMPLETE or PROCESSING and nothing
    /// was queued
    pub queued: bool,
}

#[derive(Clone)]
pub struct AnalysisQueue {
    store: Arc<dyn AnalysisStore>,
    tx: mpsc::Sender<AnalysisJob>,
}

impl AnalysisQueue {
    /// Create the queue and spawn its worker task
    pub fn start(
        store: Arc<dyn AnalysisStore>,
        analyzer: Arc<dyn Analyzer>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let worker = tokio::spawn(run_worker(store.clone(), analyzer, rx));
        (Self { store, tx }, worker)
    }

    /// Create (or reset) the analysis record for an asset and queue it
    ///
    /// COMPLETE and PROCESSING analyses are returned as-is without queuing.
    pub async fn queue(&self, asset_id: &str, audio_url: &str) -> Result<QueueOutcome, AnalysisError> {
        if asset_id.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("Missing required field: assetId".to_string()));
        }
        if audio_url.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("Missing required field: audioUrl".to_string()));
        }

        let existing = self.store.get_analysis(asset_id).await?;
        if let Some(current) = existing
            .as_ref()
            .filter(|a| matches!(a.status, AnalysisStatus::Complete | AnalysisStatus::Processing))
        {
            return Ok(QueueOutcome {
                analysis: current.clone(),
                queued: false,
            });
        }

        let permit = self.reserve(asset_id)?;

        let analysis = match existing {
            Some(mut existing) => {
                existing.status = AnalysisStatus::Pending;
                existing.error_message = None;
                existing.audio_url = audio_url.to_string();
                existing.updated_at = ncos_common::time::now();
                existing
            }
            None => AssetAnalysis::new(asset_id, audio_url),
        };

        self.store.save_analysis(&analysis).await?;
        permit.send(AnalysisJob {
            asset_id: asset_id.to_string(),
        });

        info!(asset_id, "Analysis queued");

        Ok(QueueOutcome {
            analysis,
            queued: true,
        })
    }

    /// Re-queue an analysis, counting against the retry cap
    ///
    /// The retry is only counted once a queue slot is secured.
    pub async fn retry(&self, asset_id: &str) -> Result<AssetAnalysis, AnalysisError> {
        if asset_id.trim().is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Missing required parameter: assetId".to_string(),
            ));
        }

        let mut analysis = self
            .store
            .get_analysis(asset_id)
            .await?
            .ok_or_else(|| AnalysisError::NotFound(asset_id.to_string()))?;

        if analysis.retries_exhausted() {
            warn!(asset_id, retry_count = analysis.retry_count, "Analysis retry limit reached");
            return Err(AnalysisError::RetryLimitReached {
                max: MAX_ANALYSIS_RETRIES,
            });
        }

        let permit = self.reserve(asset_id)?;

        let now = ncos_common::time::now();
        analysis.status = AnalysisStatus::Pending;
        analysis.error_message = None;
        analysis.retry_count += 1;
        analysis.last_retry_at = Some(now);
        analysis.updated_at = now;

        self.store.save_analysis(&analysis).await?;
        permit.send(AnalysisJob {
            asset_id: asset_id.to_string(),
        });

        info!(asset_id, retry_count = analysis.retry_count, "Analysis retry queued");

        Ok(analysis)
    }

    pub async fn get(&self, asset_id: &str) -> Result<AssetAnalysis, AnalysisError> {
        self.store
            .get_analysis(asset_id)
            .await?
            .ok_or_else(|| AnalysisError::NotFound(asset_id.to_string()))
    }

    /// Claim a channel slot without waiting
    fn reserve(&self, asset_id: &str) -> Result<mpsc::Permit<'_, AnalysisJob>, AnalysisError> {
        self.tx.try_reserve().map_err(|e| match e {
            TrySendError::Full(()) => {
                warn!(asset_id, "Analysis queue full, rejecting job");
                AnalysisError::QueueFull
            }
            TrySendError::Closed(()) => {
                error!(asset_id, "Failed to enqueue analysis job: worker stopped");
                AnalysisError::QueueClosed
            }
        })
    }
}

/// Best-effort FAILED write; a failure here is logged and not retried
async fn record_failure(store: &dyn AnalysisStore, asset_id: &str, message: String) {
    if let Err(update_error) = store
        .set_analysis_outcome(
            asset_id,
            AnalysisStatus::Failed,
            None,
            Some(message),
            ncos_common::time::now(),
        )
        .await
    {
        error!(asset_id, error = %update_error, "Failed to record analysis failure");
    }
}

/// Run one job to completion, returning the final status
pub async fn process_job(
    store: &dyn AnalysisStore,
    analyzer: &dyn Analyzer,
    job: &AnalysisJob,
) -> Result<AnalysisStatus, AnalysisError> {
    let asset_id = job.asset_id.as_str();
    let analysis = store
        .get_analysis(asset_id)
        .await?
        .ok_or_else(|| AnalysisError::NotFound(asset_id.to_string()))?;

    info!(asset_id, "Starting analysis");
    store
        .set_analysis_outcome(asset_id, AnalysisStatus::Processing, None, None, ncos_common::time::now())
        .await?;

    match analyzer.analyze(asset_id, &analysis.audio_url).await {
        Ok(result) => {
            if let Err(e) = store
                .set_analysis_outcome(
                    asset_id,
                    AnalysisStatus::Complete,
                    Some(result),
                    None,
                    ncos_common::time::now(),
                )
                .await
            {
                error!(asset_id, error = %e, "Failed to store analysis result");
                record_failure(store, asset_id, format!("Failed to store analysis result: {}", e)).await;
                return Err(e.into());
            }
            info!(asset_id, "Analysis complete");
            Ok(AnalysisStatus::Complete)
        }
        Err(e) => {
            error!(asset_id, error = %e, "Analysis failed");
            record_failure(store, asset_id, e.to_string()).await;
            Ok(AnalysisStatus::Failed)
        }
    }
}

async fn run_worker(
    store: Arc<dyn AnalysisStore>,
    analyzer: Arc<dyn Analyzer>,
    mut rx: mpsc::Receiver<AnalysisJob>,
) {
    info!("Analysis worker started");

    while let Some(job) = rx.recv().await {
        if let Err(e) = process_job(store.as_ref(), analyzer.as_ref(), &job).await {
            error!(asset_id = %job.asset_id, error = %e, "Analysis job aborted");
        }
    }

    info!("Analysis worker stopped");
}
