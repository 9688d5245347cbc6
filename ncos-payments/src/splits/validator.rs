//! Split validation
//!
//! A split set is well formed when it is non-empty, every share is a finite
//! fraction in [0, 1], and the shares sum to 1.0 within [`SHARE_TOLERANCE`].

use thiserror::Error;

use crate::models::PaymentSplit;

/// Allowed deviation of the share total from 1.0
pub const SHARE_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplitError {
    #[error("Splits array is required")]
    Empty,

    #[error("Split {index} has share {share}, expected a fraction between 0 and 1")]
    ShareOutOfRange { index: usize, share: f64 },

    #[error("Splits must sum to 1.0, got {total}")]
    InvalidTotal { total: f64 },
}

/// Validate raw shares, returning their sum
pub fn validate_shares(shares: &[f64]) -> Result<f64, SplitError> {
    if shares.is_empty() {
        return Err(SplitError::Empty);
    }

    if let Some((index, &share)) = shares
        .iter()
        .enumerate()
        .find(|(_, s)| !s.is_finite() || **s < 0.0 || **s > 1.0)
    {
        return Err(SplitError::ShareOutOfRange { index, share });
    }

    let total: f64 = shares.iter().sum();
    if (total - 1.0).abs() > SHARE_TOLERANCE {
        return Err(SplitError::InvalidTotal { total });
    }

    Ok(total)
}

pub fn validate_splits(splits: &[PaymentSplit]) -> Result<(), SplitError> {
    let shares: Vec<f64> = splits.iter().map(|s| s.share).collect();
    validate_shares(&shares).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seventy_twenty_ten_accepted() {
        assert!(validate_shares(&[0.7, 0.2, 0.1]).is_ok());
    }

    #[test]
    fn test_short_total_rejected() {
        match validate_shares(&[0.5, 0.4]) {
            Err(SplitError::InvalidTotal { total }) => assert!((total - 0.9).abs() < 1e-9),
            other => panic!("expected InvalidTotal, got {:?}", other),
        }
    }

    #[test]
    fn test_tolerance_band_edges() {
        assert!(validate_shares(&[0.5, 0.5009]).is_ok());
        assert!(validate_shares(&[0.5, 0.4991]).is_ok());
        assert!(validate_shares(&[0.5, 0.502]).is_err());
        assert!(validate_shares(&[0.5, 0.498]).is_err());
    }

    #[test]
    fn test_thirds_accepted() {
        let third = 1.0 / 3.0;
        assert!(validate_shares(&[third, third, third]).is_ok());
        assert!(validate_shares(&[0.3334, 0.3333, 0.3333]).is_ok());
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(validate_shares(&[]), Err(SplitError::Empty));
    }

    #[test]
    fn test_single_full_share_accepted() {
        assert!(validate_shares(&[1.0]).is_ok());
    }

    #[test]
    fn test_negative_share_rejected_even_if_total_is_one() {
        assert!(matches!(
            validate_shares(&[1.2, -0.2]),
            Err(SplitError::ShareOutOfRange { index: 0, .. })
        ));
        assert!(matches!(
            validate_shares(&[0.5, -0.5, 1.0]),
            Err(SplitError::ShareOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn test_nan_rejected() {
        assert!(matches!(
            validate_shares(&[f64::NAN, 1.0]),
            Err(SplitError::ShareOutOfRange { .. })
        ));
    }

    #[test]
    fn test_error_message_reports_total() {
        let err = validate_shares(&[0.25, 0.25]).unwrap_err();
        assert_eq!(err.to_string(), "Splits must sum to 1.0, got 0.5");
    }
}
