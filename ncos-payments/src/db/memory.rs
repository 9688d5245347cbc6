//! In-memory store
//!
//! Keyed maps behind `tokio::sync::RwLock`. Nothing is persisted; intended
//! for tests and local development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ncos_common::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{sort_newest_first, AnalysisStore, PaymentStore};
use crate::models::{AnalysisStatus, AssetAnalysis, PaymentLink, PaymentRecord, PaymentStatus};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, PaymentRecord>>,
    links: RwLock<HashMap<String, PaymentLink>>,
    analyses: RwLock<HashMap<String, AssetAnalysis>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payment links
    pub async fn link_count(&self) -> usize {
        self.links.read().await.len()
    }

    /// Number of stored payment records
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn insert_record(&self, record: &PaymentRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(Error::InvalidInput(format!("Duplicate payment id: {}", record.id)));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<Option<PaymentRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn update_record_status(
        &self,
        record: &PaymentRecord,
        expected: PaymentStatus,
    ) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id) {
            Some(stored) if stored.status == expected => {
                stored.status = record.status;
                stored.transaction_hash = record.transaction_hash.clone();
                stored.updated_at = record.updated_at;
                stored.completed_at = record.completed_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn records_for_user(&self, user_id: &str) -> Result<Vec<PaymentRecord>> {
        let mut result: Vec<PaymentRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        sort_newest_first(&mut result);
        Ok(result)
    }

    async fn history_for_user(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<PaymentRecord>> {
        let mut result: Vec<PaymentRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id || r.payer_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        sort_newest_first(&mut result);
        if let Some(limit) = limit {
            result.truncate(limit);
        }
        Ok(result)
    }

    async fn insert_link(&self, link: &PaymentLink) -> Result<()> {
        let mut links = self.links.write().await;
        if links.contains_key(&link.id) {
            return Err(Error::InvalidInput(format!("Duplicate payment link id: {}", link.id)));
        }
        links.insert(link.id.clone(), link.clone());
        Ok(())
    }

    async fn get_link(&self, id: &str) -> Result<Option<PaymentLink>> {
        Ok(self.links.read().await.get(id).cloned())
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn get_analysis(&self, asset_id: &str) -> Result<Option<AssetAnalysis>> {
        Ok(self.analyses.read().await.get(asset_id).cloned())
    }

    async fn save_analysis(&self, analysis: &AssetAnalysis) -> Result<()> {
        self.analyses
            .write()
            .await
            .insert(analysis.asset_id.clone(), analysis.clone());
        Ok(())
    }

    async fn set_analysis_outcome(
        &self,
        asset_id: &str,
        status: AnalysisStatus,
        result: Option<Value>,
        error_message: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut analyses = self.analyses.write().await;
        match analyses.get_mut(asset_id) {
            Some(stored) => {
                stored.status = status;
                stored.result = result;
                stored.error_message = error_message;
                stored.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentType;

    #[tokio::test]
    async fn test_stale_status_update_loses() {
        let store = MemoryStore::new();
        let mut record = PaymentRecord::new(PaymentType::Tip, "artist", "artist", 5.0);
        store.insert_record(&record).await.unwrap();

        record
            .transition_to(PaymentStatus::Failed, None, ncos_common::time::now())
            .unwrap();
        assert!(store.update_record_status(&record, PaymentStatus::Pending).await.unwrap());
        assert!(!store.update_record_status(&record, PaymentStatus::Pending).await.unwrap());
        assert_eq!(
            store.get_record(&record.id).await.unwrap().unwrap().status,
            PaymentStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let store = MemoryStore::new();
        let record = PaymentRecord::new(PaymentType::Tip, "artist", "artist", 5.0);

        store.insert_record(&record).await.unwrap();
        assert!(store.insert_record(&record).await.is_err());
        assert_eq!(store.record_count().await, 1);
    }
}
