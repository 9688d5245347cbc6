//! Payment record lifecycle: creation, tips, project funding and status
//! updates reported by the settlement side

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::PaymentStore;
use crate::models::{
    PaymentRecord, PaymentStatus, PaymentType, SplitAllocation, StatusTransitionError,
};
use crate::splits::{allocate, resolve_defaults, RoleRecipients};

/// Smallest accepted tip or project contribution, in USD
pub const MINIMUM_CONTRIBUTION_USD: f64 = 1.0;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Payment not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    IllegalTransition(#[from] StatusTransitionError),

    #[error("Payment {0} was modified concurrently")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] ncos_common::Error),
}

/// POST /payments request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub user_id: String,
    pub target_id: String,
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
    #[serde(default)]
    pub payer_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// POST /payments/{id}/status request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: PaymentStatus,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

/// POST /payments/tip request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipRequest {
    pub target_user_id: String,
    pub tipper_id: String,
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
    #[serde(default)]
    pub message: Option<String>,
}

/// POST /payments/fund-project request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundProjectRequest {
    pub project_id: String,
    /// Project owner, credited with the creator share
    pub creator_id: String,
    pub funder_id: String,
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
    #[serde(default)]
    pub message: Option<String>,
}

/// A created record together with its resolved default split
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPayment {
    pub payment: PaymentRecord,
    pub splits: Vec<SplitAllocation>,
}

fn require_id(value: &str, field: &str) -> Result<(), PaymentError> {
    if value.trim().is_empty() {
        return Err(PaymentError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

fn require_positive(amount: f64) -> Result<(), PaymentError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(PaymentError::InvalidInput(format!(
            "amountUSD must be greater than 0, got {}",
            amount
        )));
    }
    Ok(())
}

fn require_minimum(amount: f64, what: &str) -> Result<(), PaymentError> {
    if !amount.is_finite() || amount < MINIMUM_CONTRIBUTION_USD {
        return Err(PaymentError::InvalidInput(format!(
            "Minimum {} amount is ${}",
            what, MINIMUM_CONTRIBUTION_USD
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn PaymentStore>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn PaymentStore>) -> Self {
        Self { store }
    }

    /// Create a PENDING record
    pub async fn record_payment(&self, request: RecordPaymentRequest) -> Result<PaymentRecord, PaymentError> {
        require_id(&request.user_id, "userId")?;
        require_id(&request.target_id, "targetId")?;
        require_positive(request.amount_usd)?;

        let mut record = PaymentRecord::new(
            request.payment_type,
            request.user_id,
            request.target_id,
            request.amount_usd,
        );
        record.payer_id = request.payer_id;
        record.metadata = request.metadata;

        self.store.insert_record(&record).await?;

        info!(
            payment_id = %record.id,
            payment_type = %record.payment_type,
            amount_usd = record.amount_usd,
            "Created payment record"
        );

        Ok(record)
    }

    pub async fn get_payment(&self, id: &str) -> Result<PaymentRecord, PaymentError> {
        self.store
            .get_record(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(id.to_string()))
    }

    /// Apply a monotonic status transition
    pub async fn update_status(
        &self,
        id: &str,
        request: UpdateStatusRequest,
    ) -> Result<PaymentRecord, PaymentError> {
        let mut record = self.get_payment(id).await?;
        let previous = record.status;

        record.transition_to(request.status, request.transaction_hash, ncos_common::time::now())?;

        if !self.store.update_record_status(&record, previous).await? {
            warn!(payment_id = %id, "Status update lost a race with another writer");
            return Err(PaymentError::Conflict(id.to_string()));
        }

        info!(
            payment_id = %id,
            from = %previous,
            to = %record.status,
            "Updated payment status"
        );

        Ok(record)
    }

    /// Records where the user is the attributed user or the payer
    pub async fn history(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<PaymentRecord>, PaymentError> {
        require_id(user_id, "userId")?;
        Ok(self.store.history_for_user(user_id, limit).await?)
    }

    /// Direct tip to a creator, split by the TIP policy
    pub async fn tip(&self, request: TipRequest) -> Result<SplitPayment, PaymentError> {
        require_id(&request.target_user_id, "targetUserId")?;
        require_id(&request.tipper_id, "tipperId")?;
        require_minimum(request.amount_usd, "tip")?;

        let splits = resolve_defaults(
            PaymentType::Tip,
            &RoleRecipients::creator(request.target_user_id.clone()),
        );

        let record = PaymentRecord::new(
            PaymentType::Tip,
            request.target_user_id.clone(),
            request.target_user_id,
            request.amount_usd,
        )
        .with_payer(request.tipper_id)
        .with_metadata(json!({
            "message": request.message,
            "splits": &splits,
        }));

        self.store.insert_record(&record).await?;

        let allocations = allocate(record.amount_usd, &splits);
        info!(
            payment_id = %record.id,
            amount_usd = record.amount_usd,
            creator_amount = allocations.first().map(|a| a.amount).unwrap_or_default(),
            "Recorded tip"
        );

        Ok(SplitPayment {
            payment: record,
            splits: allocations,
        })
    }

    /// Contribution to a project, split by the PROJECT_FUNDING policy
    pub async fn fund_project(&self, request: FundProjectRequest) -> Result<SplitPayment, PaymentError> {
        require_id(&request.project_id, "projectId")?;
        require_id(&request.creator_id, "creatorId")?;
        require_id(&request.funder_id, "funderId")?;
        require_minimum(request.amount_usd, "funding")?;

        let splits = resolve_defaults(
            PaymentType::ProjectFunding,
            &RoleRecipients::creator(request.creator_id.clone()).with_pool(request.project_id.clone()),
        );

        let record = PaymentRecord::new(
            PaymentType::ProjectFunding,
            request.creator_id,
            request.project_id,
            request.amount_usd,
        )
        .with_payer(request.funder_id)
        .with_metadata(json!({
            "message": request.message,
            "splits": &splits,
        }));

        self.store.insert_record(&record).await?;

        info!(
            payment_id = %record.id,
            project_id = %record.target_id,
            amount_usd = record.amount_usd,
            "Recorded project funding"
        );

        let allocations = allocate(record.amount_usd, &splits);
        Ok(SplitPayment {
            payment: record,
            splits: allocations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn service() -> PaymentService {
        PaymentService::new(Arc::new(MemoryStore::new()))
    }

    fn record_request(user_id: &str, amount: f64) -> RecordPaymentRequest {
        RecordPaymentRequest {
            payment_type: PaymentType::MarketplacePurchase,
            user_id: user_id.to_string(),
            target_id: "beat-1".to_string(),
            amount_usd: amount,
            payer_id: Some("buyer".to_string()),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_record_then_complete() {
        let service = service();
        let record = service.record_payment(record_request("artist", 25.0)).await.unwrap();
        assert_eq!(record.status, PaymentStatus::Pending);

        let updated = service
            .update_status(
                &record.id,
                UpdateStatusRequest {
                    status: PaymentStatus::Completed,
                    transaction_hash: Some("0xfeed".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, PaymentStatus::Completed);
        assert!(updated.completed_at.is_some());
        assert_eq!(service.get_payment(&record.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_illegal_transition_rejected_and_not_stored() {
        let service = service();
        let record = service.record_payment(record_request("artist", 25.0)).await.unwrap();

        let err = service
            .update_status(
                &record.id,
                UpdateStatusRequest {
                    status: PaymentStatus::Refunded,
                    transaction_hash: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::IllegalTransition(_)));
        assert_eq!(
            service.get_payment(&record.id).await.unwrap().status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_unknown_payment() {
        let err = service()
            .update_status(
                "payment_missing",
                UpdateStatusRequest {
                    status: PaymentStatus::Completed,
                    transaction_hash: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_record_requires_positive_amount() {
        let err = service()
            .record_payment(record_request("artist", -3.0))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_tip_below_minimum() {
        let err = service()
            .tip(TipRequest {
                target_user_id: "artist".to_string(),
                tipper_id: "fan".to_string(),
                amount_usd: 0.5,
                message: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Minimum tip amount is $1");
    }

    #[tokio::test]
    async fn test_tip_splits_and_attribution() {
        let service = service();
        let result = service
            .tip(TipRequest {
                target_user_id: "artist".to_string(),
                tipper_id: "fan".to_string(),
                amount_usd: 10.0,
                message: Some("love the track".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(result.payment.user_id, "artist");
        assert_eq!(result.payment.payer_id.as_deref(), Some("fan"));
        assert_eq!(result.payment.payment_type, PaymentType::Tip);
        assert_eq!(result.splits.len(), 2);
        assert!((result.splits[0].amount - 9.5).abs() < 1e-9);
        assert!((result.splits[1].amount - 0.5).abs() < 1e-9);

        // Visible to both sides of the payment
        assert_eq!(service.history("artist", None).await.unwrap().len(), 1);
        assert_eq!(service.history("fan", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fund_project_splits() {
        let result = service()
            .fund_project(FundProjectRequest {
                project_id: "project-7".to_string(),
                creator_id: "artist".to_string(),
                funder_id: "backer".to_string(),
                amount_usd: 100.0,
                message: None,
            })
            .await
            .unwrap();

        let amounts: Vec<(String, f64)> = result
            .splits
            .iter()
            .map(|a| (a.recipient_id.clone(), a.amount))
            .collect();
        assert_eq!(amounts[0].0, "artist");
        assert!((amounts[0].1 - 70.0).abs() < 1e-9);
        assert_eq!(amounts[1].0, "project-7");
        assert!((amounts[1].1 - 20.0).abs() < 1e-9);
        assert_eq!(amounts[2].0, "platform");
        assert!((amounts[2].1 - 10.0).abs() < 1e-9);
        assert_eq!(result.payment.target_id, "project-7");
    }

    #[tokio::test]
    async fn test_history_limit() {
        let service = service();
        for _ in 0..5 {
            service.record_payment(record_request("artist", 1.0)).await.unwrap();
        }
        assert_eq!(service.history("artist", Some(3)).await.unwrap().len(), 3);
        assert_eq!(service.history("buyer", None).await.unwrap().len(), 5);
    }
}
