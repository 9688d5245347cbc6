//! Payment links: an amount to collect and how to distribute it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::split::PaymentSplit;

/// What a payment link sells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetType {
    Asset,
    Booking,
    License,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Asset => "Asset",
            TargetType::Booking => "Booking",
            TargetType::License => "License",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = String;

    /// Exact match only: the wire names are case-sensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Asset" => Ok(TargetType::Asset),
            "Booking" => Ok(TargetType::Booking),
            "License" => Ok(TargetType::License),
            other => Err(format!("Invalid target type: {}", other)),
        }
    }
}

/// Currencies settled on-chain; everything else goes through card checkout
const CRYPTO_CURRENCIES: [&str; 4] = ["ETH", "BTC", "USDC", "USDT"];

/// How a payment link is settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementRail {
    /// x402 invoice paid on-chain
    Crypto,
    /// Card checkout
    Fiat,
}

impl SettlementRail {
    pub fn for_currency(currency: &str) -> Self {
        let upper = currency.to_ascii_uppercase();
        if CRYPTO_CURRENCIES.contains(&upper.as_str()) {
            SettlementRail::Crypto
        } else {
            SettlementRail::Fiat
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementRail::Crypto => "crypto",
            SettlementRail::Fiat => "fiat",
        }
    }

    /// URL path segment under the public base URL
    pub fn path_segment(&self) -> &'static str {
        match self {
            SettlementRail::Crypto => "invoice",
            SettlementRail::Fiat => "checkout",
        }
    }
}

impl FromStr for SettlementRail {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crypto" => Ok(SettlementRail::Crypto),
            "fiat" => Ok(SettlementRail::Fiat),
            other => Err(format!("Unknown settlement rail: {}", other)),
        }
    }
}

/// Immutable once created; settlement status is tracked externally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLink {
    pub id: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub amount: f64,
    pub currency: String,
    pub rail: SettlementRail,
    pub url: String,
    pub splits: Vec<PaymentSplit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rail_selection_by_currency() {
        assert_eq!(SettlementRail::for_currency("usdc"), SettlementRail::Crypto);
        assert_eq!(SettlementRail::for_currency("ETH"), SettlementRail::Crypto);
        assert_eq!(SettlementRail::for_currency("USD"), SettlementRail::Fiat);
        assert_eq!(SettlementRail::for_currency("eur"), SettlementRail::Fiat);
    }

    #[test]
    fn test_target_type_is_case_sensitive() {
        assert_eq!("License".parse::<TargetType>().unwrap(), TargetType::License);
        assert!("license".parse::<TargetType>().is_err());
        assert!("Project".parse::<TargetType>().is_err());
    }
}
