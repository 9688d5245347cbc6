//! Default split policy per payment type
//!
//! | Payment type          | creator | pool | platform |
//! |-----------------------|---------|------|----------|
//! | PROJECT_FUNDING       | 0.70    | 0.20 | 0.10     |
//! | TIP                   | 0.95    |  -   | 0.05     |
//! | MARKETPLACE_PURCHASE  | 0.90    |  -   | 0.10     |
//! | BOUNTY_PAYMENT        | 0.90    |  -   | 0.10     |
//!
//! Callers that supply their own splits bypass these tables entirely; their
//! splits must pass [`validate_splits`](super::validate_splits) on their own.

use serde::Serialize;

use crate::models::{PaymentSplit, PaymentType, SplitAllocation};

/// Recipient id used for the platform's share
pub const PLATFORM_RECIPIENT_ID: &str = "platform";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Creator,
    Pool,
    Platform,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Creator => "Creator",
            Role::Pool => "Project Pool",
            Role::Platform => "Platform Fee",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Allocation {
    pub role: Role,
    pub share: f64,
}

const fn alloc(role: Role, share: f64) -> Allocation {
    Allocation { role, share }
}

static PROJECT_FUNDING: [Allocation; 3] = [
    alloc(Role::Creator, 0.70),
    alloc(Role::Pool, 0.20),
    alloc(Role::Platform, 0.10),
];

static TIP: [Allocation; 2] = [alloc(Role::Creator, 0.95), alloc(Role::Platform, 0.05)];

static MARKETPLACE: [Allocation; 2] = [alloc(Role::Creator, 0.90), alloc(Role::Platform, 0.10)];

/// Static allocation table for a payment type
pub fn default_allocations(payment_type: PaymentType) -> &'static [Allocation] {
    match payment_type {
        PaymentType::ProjectFunding => &PROJECT_FUNDING,
        PaymentType::Tip => &TIP,
        // Bounties have no table of their own and follow marketplace policy
        PaymentType::MarketplacePurchase | PaymentType::BountyPayment => &MARKETPLACE,
    }
}

/// Who receives each role's share
#[derive(Debug, Clone)]
pub struct RoleRecipients {
    pub creator: String,
    /// Project pool; the creator receives the pool share when absent
    pub pool: Option<String>,
}

impl RoleRecipients {
    pub fn creator(creator: impl Into<String>) -> Self {
        Self {
            creator: creator.into(),
            pool: None,
        }
    }

    pub fn with_pool(mut self, pool: impl Into<String>) -> Self {
        self.pool = Some(pool.into());
        self
    }

    fn recipient_for(&self, role: Role) -> &str {
        match role {
            Role::Creator => &self.creator,
            Role::Pool => self.pool.as_deref().unwrap_or(&self.creator),
            Role::Platform => PLATFORM_RECIPIENT_ID,
        }
    }
}

/// Materialise the default table for `payment_type` as splits
pub fn resolve_defaults(payment_type: PaymentType, recipients: &RoleRecipients) -> Vec<PaymentSplit> {
    default_allocations(payment_type)
        .iter()
        .map(|a| PaymentSplit::new(recipients.recipient_for(a.role), a.share, a.role.label()))
        .collect()
}

/// Resolve splits against a concrete amount
pub fn allocate(amount: f64, splits: &[PaymentSplit]) -> Vec<SplitAllocation> {
    splits
        .iter()
        .map(|split| SplitAllocation::from_split(split, amount))
        .collect()
}

/// Scale every split by `1 - fee_fraction` and append a platform split
/// carrying `fee_fraction`
///
/// The share total is preserved, so valid input stays valid.
pub fn with_platform_fee(splits: &[PaymentSplit], fee_fraction: f64) -> Vec<PaymentSplit> {
    let mut adjusted: Vec<PaymentSplit> = splits
        .iter()
        .map(|split| PaymentSplit {
            share: split.share * (1.0 - fee_fraction),
            ..split.clone()
        })
        .collect();

    adjusted.push(PaymentSplit::new(
        PLATFORM_RECIPIENT_ID,
        fee_fraction,
        Role::Platform.label(),
    ));

    adjusted
}
