//! Persistence layer
//!
//! Handlers and services depend on the [`PaymentStore`] and [`AnalysisStore`]
//! traits. [`SqliteStore`] backs the running service; [`MemoryStore`] is a
//! development and test substitute with the same behavior.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ncos_common::Result;
use serde_json::Value;

use crate::models::{AnalysisStatus, AssetAnalysis, PaymentLink, PaymentRecord, PaymentStatus};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Payment records and payment links
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a new record; fails if the id already exists
    async fn insert_record(&self, record: &PaymentRecord) -> Result<()>;

    async fn get_record(&self, id: &str) -> Result<Option<PaymentRecord>>;

    /// Persist `record`'s status fields if the stored status still equals
    /// `expected`. Returns `false` when another writer got there first.
    async fn update_record_status(
        &self,
        record: &PaymentRecord,
        expected: PaymentStatus,
    ) -> Result<bool>;

    /// All records attributed to `user_id`, any status, newest first
    async fn records_for_user(&self, user_id: &str) -> Result<Vec<PaymentRecord>>;

    /// Records where `user_id` is the attributed user or the payer,
    /// newest first, truncated to `limit`
    async fn history_for_user(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<PaymentRecord>>;

    /// Append-only: fails if the id already exists
    async fn insert_link(&self, link: &PaymentLink) -> Result<()>;

    async fn get_link(&self, id: &str) -> Result<Option<PaymentLink>>;
}

/// Asset analysis job records
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn get_analysis(&self, asset_id: &str) -> Result<Option<AssetAnalysis>>;

    /// Insert or fully replace the record for `analysis.asset_id`
    async fn save_analysis(&self, analysis: &AssetAnalysis) -> Result<()>;

    /// Update status, result and error message only, leaving retry
    /// bookkeeping untouched. Returns `false` if the asset is unknown.
    async fn set_analysis_outcome(
        &self,
        asset_id: &str,
        status: AnalysisStatus,
        result: Option<Value>,
        error_message: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<bool>;
}

/// Newest first, ties broken by id for a stable order
pub(crate) fn sort_newest_first(records: &mut [PaymentRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}
