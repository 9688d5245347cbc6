//! Payment link creation
//!
//! Validation order: required fields, target type, amount, then splits.
//! Nothing is persisted unless every check passes. When the caller asks for
//! it, the platform fee is carved out of the validated splits afterwards.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::db::PaymentStore;
use crate::models::{PaymentLink, PaymentSplit, SettlementRail, TargetType};
use crate::splits::{validate_splits, with_platform_fee, SplitError};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid target type: {0}")]
    InvalidTargetType(String),

    #[error("Amount must be greater than 0, got {0}")]
    InvalidAmount(f64),

    #[error(transparent)]
    InvalidSplit(#[from] SplitError),

    #[error(transparent)]
    Store(#[from] ncos_common::Error),
}

/// POST /payments/create-link request
///
/// Every field is optional at the serde level so that absence is reported
/// as a missing field rather than a body parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentLinkRequest {
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub splits: Option<Vec<PaymentSplit>>,
    pub metadata: Option<Value>,
    pub description: Option<String>,
    /// Scale the splits down and append the configured platform fee
    #[serde(default)]
    pub apply_platform_fee: bool,
}

/// POST /payments/escrow request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEscrowRequest {
    pub booking_id: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub splits: Option<Vec<PaymentSplit>>,
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, LinkError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LinkError::MissingField(field)),
    }
}

#[derive(Clone)]
pub struct PaymentLinkFactory {
    store: Arc<dyn PaymentStore>,
    public_base_url: String,
    platform_fee_fraction: f64,
}

impl PaymentLinkFactory {
    pub fn new(store: Arc<dyn PaymentStore>, public_base_url: impl Into<String>) -> Self {
        Self {
            store,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            platform_fee_fraction: 0.0,
        }
    }

    /// Fee fraction used for requests with `applyPlatformFee`
    pub fn platform_fee(mut self, fraction: f64) -> Self {
        self.platform_fee_fraction = fraction;
        self
    }

    /// Validate the request and persist a new link
    pub async fn create_link(&self, request: CreatePaymentLinkRequest) -> Result<PaymentLink, LinkError> {
        let target_type = required_text(request.target_type, "targetType")?;
        let target_id = required_text(request.target_id, "targetId")?;
        let amount = request.amount.ok_or(LinkError::MissingField("amount"))?;
        let currency = required_text(request.currency, "currency")?;
        let splits = request.splits.ok_or(LinkError::MissingField("splits"))?;

        let target_type = target_type
            .parse::<TargetType>()
            .map_err(|_| LinkError::InvalidTargetType(target_type.clone()))?;

        if !amount.is_finite() || amount <= 0.0 {
            return Err(LinkError::InvalidAmount(amount));
        }

        validate_splits(&splits)?;
        let splits = if request.apply_platform_fee && self.platform_fee_fraction > 0.0 {
            with_platform_fee(&splits, self.platform_fee_fraction)
        } else {
            splits
        };

        let rail = SettlementRail::for_currency(&currency);
        let id = ncos_common::uuid_utils::prefixed(match rail {
            SettlementRail::Crypto => "x402",
            SettlementRail::Fiat => "link",
        });
        let url = format!("{}/{}/{}", self.public_base_url, rail.path_segment(), id);

        let link = PaymentLink {
            id,
            target_type,
            target_id,
            amount,
            currency,
            rail,
            url,
            splits,
            metadata: request.metadata,
            description: request.description,
            created_at: ncos_common::time::now(),
        };

        self.store.insert_link(&link).await?;

        info!(
            link_id = %link.id,
            target_type = %link.target_type,
            target_id = %link.target_id,
            amount = link.amount,
            currency = %link.currency,
            rail = link.rail.as_str(),
            splits = link.splits.len(),
            "Created payment link"
        );

        Ok(link)
    }

    /// Booking link whose funds are held until the booking completes
    pub async fn create_escrow(&self, request: CreateEscrowRequest) -> Result<PaymentLink, LinkError> {
        let booking_id = required_text(request.booking_id, "bookingId")?;

        self.create_link(CreatePaymentLinkRequest {
            target_type: Some(TargetType::Booking.to_string()),
            description: Some(format!("Escrow for Booking {}", booking_id)),
            target_id: Some(booking_id),
            amount: request.amount,
            currency: request.currency,
            splits: request.splits,
            metadata: Some(json!({
                "escrow": true,
                "releaseCondition": "booking_completed",
            })),
            apply_platform_fee: false,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn factory() -> (Arc<MemoryStore>, PaymentLinkFactory) {
        let store = Arc::new(MemoryStore::new());
        let factory = PaymentLinkFactory::new(store.clone(), "https://ncos.example/");
        (store, factory)
    }

    fn valid_request() -> CreatePaymentLinkRequest {
        CreatePaymentLinkRequest {
            target_type: Some("Asset".to_string()),
            target_id: Some("asset-1".to_string()),
            amount: Some(49.99),
            currency: Some("USD".to_string()),
            splits: Some(vec![
                PaymentSplit::new("producer", 0.7, "Producer"),
                PaymentSplit::new("writer", 0.2, "Writer"),
                PaymentSplit::new("platform", 0.1, "Platform Fee"),
            ]),
            metadata: None,
            description: Some("Beat license".to_string()),
            apply_platform_fee: false,
        }
    }

    #[tokio::test]
    async fn test_create_link_persists() {
        let (store, factory) = factory();

        let link = factory.create_link(valid_request()).await.unwrap();

        assert_eq!(link.target_type, TargetType::Asset);
        assert_eq!(link.rail, SettlementRail::Fiat);
        assert_eq!(link.url, format!("https://ncos.example/checkout/{}", link.id));
        assert_eq!(store.get_link(&link.id).await.unwrap(), Some(link));
    }

    #[tokio::test]
    async fn test_crypto_currency_gets_invoice_url() {
        let (_store, factory) = factory();
        let request = CreatePaymentLinkRequest {
            currency: Some("USDC".to_string()),
            ..valid_request()
        };

        let link = factory.create_link(request).await.unwrap();

        assert_eq!(link.rail, SettlementRail::Crypto);
        assert!(link.id.starts_with("x402_"));
        assert!(link.url.starts_with("https://ncos.example/invoice/x402_"));
    }

    #[tokio::test]
    async fn test_missing_field_wins_over_bad_splits() {
        let (store, factory) = factory();
        let request = CreatePaymentLinkRequest {
            target_id: None,
            splits: Some(vec![PaymentSplit::new("a", 0.5, "")]),
            ..valid_request()
        };

        let err = factory.create_link(request).await.unwrap_err();

        assert!(matches!(err, LinkError::MissingField("targetId")));
        assert_eq!(store.link_count().await, 0);
    }

    #[tokio::test]
    async fn test_blank_currency_is_missing() {
        let (_store, factory) = factory();
        let request = CreatePaymentLinkRequest {
            currency: Some("  ".to_string()),
            ..valid_request()
        };

        assert!(matches!(
            factory.create_link(request).await,
            Err(LinkError::MissingField("currency"))
        ));
    }

    #[tokio::test]
    async fn test_unknown_target_type() {
        let (store, factory) = factory();
        let request = CreatePaymentLinkRequest {
            target_type: Some("Project".to_string()),
            ..valid_request()
        };

        assert!(matches!(
            factory.create_link(request).await,
            Err(LinkError::InvalidTargetType(t)) if t == "Project"
        ));
        assert_eq!(store.link_count().await, 0);
    }

    #[tokio::test]
    async fn test_non_positive_amount() {
        let (_store, factory) = factory();
        let request = CreatePaymentLinkRequest {
            amount: Some(0.0),
            ..valid_request()
        };

        assert!(matches!(
            factory.create_link(request).await,
            Err(LinkError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_split_total_not_persisted() {
        let (store, factory) = factory();
        let request = CreatePaymentLinkRequest {
            splits: Some(vec![
                PaymentSplit::new("a", 0.5, ""),
                PaymentSplit::new("b", 0.4, ""),
            ]),
            ..valid_request()
        };

        assert!(matches!(
            factory.create_link(request).await,
            Err(LinkError::InvalidSplit(SplitError::InvalidTotal { .. }))
        ));
        assert_eq!(store.link_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_splits_rejected() {
        let (_store, factory) = factory();
        let request = CreatePaymentLinkRequest {
            splits: Some(Vec::new()),
            ..valid_request()
        };

        assert!(matches!(
            factory.create_link(request).await,
            Err(LinkError::InvalidSplit(SplitError::Empty))
        ));
    }

    #[tokio::test]
    async fn test_platform_fee_applied_on_request() {
        let store = Arc::new(MemoryStore::new());
        let factory = PaymentLinkFactory::new(store, "https://ncos.example").platform_fee(0.05);
        let request = CreatePaymentLinkRequest {
            splits: Some(vec![
                PaymentSplit::new("producer", 0.5, "Producer"),
                PaymentSplit::new("writer", 0.5, "Writer"),
            ]),
            apply_platform_fee: true,
            ..valid_request()
        };

        let link = factory.create_link(request).await.unwrap();

        assert_eq!(link.splits.len(), 3);
        assert!((link.splits[0].share - 0.475).abs() < 1e-9);
        assert_eq!(link.splits[2].recipient_id, "platform");
        assert!(validate_splits(&link.splits).is_ok());
    }

    #[tokio::test]
    async fn test_escrow_link() {
        let (_store, factory) = factory();

        let link = factory
            .create_escrow(CreateEscrowRequest {
                booking_id: Some("booking-9".to_string()),
                amount: Some(150.0),
                currency: Some("USD".to_string()),
                splits: Some(vec![PaymentSplit::new("engineer", 1.0, "Studio")]),
            })
            .await
            .unwrap();

        assert_eq!(link.target_type, TargetType::Booking);
        assert_eq!(link.target_id, "booking-9");
        assert_eq!(link.description.as_deref(), Some("Escrow for Booking booking-9"));
        let metadata = link.metadata.unwrap();
        assert_eq!(metadata["escrow"], true);
        assert_eq!(metadata["releaseCondition"], "booking_completed");
    }
}
