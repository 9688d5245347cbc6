//! Revenue split types

use serde::{Deserialize, Serialize};

/// A recipient's fractional share of a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSplit {
    pub recipient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_wallet: Option<String>,
    /// Fraction of the payment, 0.0 – 1.0
    pub share: f64,
    /// e.g. "Creator", "Project Pool", "Platform Fee"
    #[serde(default)]
    pub label: String,
}

impl PaymentSplit {
    pub fn new(recipient_id: impl Into<String>, share: f64, label: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            recipient_wallet: None,
            share,
            label: label.into(),
        }
    }
}

/// A split resolved against a concrete amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitAllocation {
    pub recipient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_wallet: Option<String>,
    pub label: String,
    pub share: f64,
    /// `share` expressed in percent
    pub percentage: f64,
    pub amount: f64,
}

impl SplitAllocation {
    pub fn from_split(split: &PaymentSplit, total_amount: f64) -> Self {
        Self {
            recipient_id: split.recipient_id.clone(),
            recipient_wallet: split.recipient_wallet.clone(),
            label: split.label.clone(),
            share: split.share,
            percentage: split.share * 100.0,
            amount: total_amount * split.share,
        }
    }
}
