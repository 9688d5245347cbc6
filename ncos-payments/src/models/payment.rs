//! Payment records and their status lifecycle
//!
//! Status transitions are monotonic:
//! PENDING → COMPLETED | FAILED, COMPLETED → REFUNDED. FAILED and REFUNDED
//! are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What a payment was for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    ProjectFunding,
    Tip,
    MarketplacePurchase,
    BountyPayment,
}

impl PaymentType {
    pub const ALL: [PaymentType; 4] = [
        PaymentType::ProjectFunding,
        PaymentType::Tip,
        PaymentType::MarketplacePurchase,
        PaymentType::BountyPayment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::ProjectFunding => "PROJECT_FUNDING",
            PaymentType::Tip => "TIP",
            PaymentType::MarketplacePurchase => "MARKETPLACE_PURCHASE",
            PaymentType::BountyPayment => "BOUNTY_PAYMENT",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown payment type: {}", s))
    }
}

/// Settlement status of a payment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    /// Whether `self → next` is an allowed transition
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Completed)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Completed, PaymentStatus::Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "COMPLETED" => Ok(PaymentStatus::Completed),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            _ => Err(format!("Unknown payment status: {}", s)),
        }
    }
}

/// Rejected status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Illegal payment status transition: {from} → {to}")]
pub struct StatusTransitionError {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
}

/// A single payment, attributed to `user_id` for earnings purposes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    /// Account the payment is attributed to (the earning party)
    pub user_id: String,
    /// Account that paid, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_id: Option<String>,
    /// Project, user, product or bounty the payment targets
    pub target_id: String,
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    /// Create a new PENDING record
    pub fn new(
        payment_type: PaymentType,
        user_id: impl Into<String>,
        target_id: impl Into<String>,
        amount_usd: f64,
    ) -> Self {
        let now = ncos_common::time::now();
        Self {
            id: ncos_common::uuid_utils::prefixed("payment"),
            payment_type,
            user_id: user_id.into(),
            payer_id: None,
            target_id: target_id.into(),
            amount_usd,
            status: PaymentStatus::Pending,
            transaction_hash: None,
            metadata: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn with_payer(mut self, payer_id: impl Into<String>) -> Self {
        self.payer_id = Some(payer_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Apply a status change, stamping `updated_at` (and `completed_at` on
    /// completion)
    pub fn transition_to(
        &mut self,
        next: PaymentStatus,
        transaction_hash: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), StatusTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(StatusTransitionError {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.updated_at = at;
        if next == PaymentStatus::Completed {
            self.completed_at = Some(at);
        }
        if transaction_hash.is_some() {
            self.transaction_hash = transaction_hash;
        }
        Ok(())
    }

    /// Timestamp used to place the record in a calendar month
    pub fn earned_at(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.created_at)
    }
}
