//! Earnings aggregation
//!
//! All figures are recomputed from the user's COMPLETED payment records on
//! every query; nothing here is persisted. A record that moves to REFUNDED
//! simply drops out of future sums.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::db::PaymentStore;
use crate::models::{PaymentRecord, PaymentStatus, PaymentType};
use ncos_common::time::{local_month_of, previous_month};

/// Number of records included in [`EarningsSummary::recent`]
pub const RECENT_EARNINGS_LIMIT: usize = 10;

/// Read-side projection over a user's payment records
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsSummary {
    pub total_earned: f64,
    pub this_month: f64,
    pub last_month: f64,
    /// Sum of PENDING records
    pub pending_payouts: f64,
    pub breakdown: BTreeMap<PaymentType, f64>,
    pub recent: Vec<PaymentRecord>,
}

// ---------------------------------------------------------------------------
// Pure folds
// ---------------------------------------------------------------------------

/// COMPLETED records belonging to `user_id`, most recent first
pub fn completed_for_user(records: &[PaymentRecord], user_id: &str) -> Vec<PaymentRecord> {
    let mut completed: Vec<PaymentRecord> = records
        .iter()
        .filter(|r| r.user_id == user_id && r.status == PaymentStatus::Completed)
        .cloned()
        .collect();
    crate::db::sort_newest_first(&mut completed);
    completed
}

pub fn total(records: &[PaymentRecord]) -> f64 {
    records.iter().map(|r| r.amount_usd).sum()
}

/// Sum of records earned in the local calendar month `(year, month)`
pub fn total_in_month(records: &[PaymentRecord], year: i32, month: u32) -> f64 {
    records
        .iter()
        .filter(|r| local_month_of(r.earned_at()) == (year, month))
        .map(|r| r.amount_usd)
        .sum()
}

pub fn breakdown(records: &[PaymentRecord]) -> BTreeMap<PaymentType, f64> {
    records.iter().fold(BTreeMap::new(), |mut acc, r| {
        *acc.entry(r.payment_type).or_insert(0.0) += r.amount_usd;
        acc
    })
}

/// Build a summary for `user_id` as of `now`
///
/// `records` may contain other users' records; they are ignored.
pub fn summarize(records: &[PaymentRecord], user_id: &str, now: DateTime<Utc>) -> EarningsSummary {
    let completed = completed_for_user(records, user_id);
    let (year, month) = local_month_of(now);
    let (last_year, last_month) = previous_month(year, month);

    let pending_payouts = records
        .iter()
        .filter(|r| r.user_id == user_id && r.status == PaymentStatus::Pending)
        .map(|r| r.amount_usd)
        .sum();

    EarningsSummary {
        total_earned: total(&completed),
        this_month: total_in_month(&completed, year, month),
        last_month: total_in_month(&completed, last_year, last_month),
        pending_payouts,
        breakdown: breakdown(&completed),
        recent: completed.into_iter().take(RECENT_EARNINGS_LIMIT).collect(),
    }
}

// ---------------------------------------------------------------------------
// Store-backed aggregator
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct EarningsAggregator {
    store: Arc<dyn PaymentStore>,
}

impl EarningsAggregator {
    pub fn new(store: Arc<dyn PaymentStore>) -> Self {
        Self { store }
    }

    /// COMPLETED records for the user, most recent first
    pub async fn get_user_earnings(&self, user_id: &str) -> ncos_common::Result<Vec<PaymentRecord>> {
        let records = self.store.records_for_user(user_id).await?;
        Ok(completed_for_user(&records, user_id))
    }

    pub async fn calculate_total_earnings(&self, user_id: &str) -> ncos_common::Result<f64> {
        Ok(total(&self.get_user_earnings(user_id).await?))
    }

    /// Earnings in the current calendar month of the local server clock
    pub async fn calculate_monthly_earnings(&self, user_id: &str) -> ncos_common::Result<f64> {
        let (year, month) = local_month_of(ncos_common::time::now());
        Ok(total_in_month(&self.get_user_earnings(user_id).await?, year, month))
    }

    pub async fn get_earnings_breakdown(
        &self,
        user_id: &str,
    ) -> ncos_common::Result<BTreeMap<PaymentType, f64>> {
        Ok(breakdown(&self.get_user_earnings(user_id).await?))
    }

    pub async fn get_earnings_summary(&self, user_id: &str) -> ncos_common::Result<EarningsSummary> {
        let records = self.store.records_for_user(user_id).await?;
        Ok(summarize(&records, user_id, ncos_common::time::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use chrono::Duration;
    use ncos_common::time::local_month_start;

    fn completed(payment_type: PaymentType, user_id: &str, amount: f64, at: DateTime<Utc>) -> PaymentRecord {
        let mut record = PaymentRecord::new(payment_type, user_id, "target", amount);
        record.created_at = at;
        record.transition_to(PaymentStatus::Completed, None, at).unwrap();
        record
    }

    #[test]
    fn test_breakdown_by_type() {
        let now = ncos_common::time::now();
        let records = vec![
            completed(PaymentType::Tip, "artist", 10.0, now),
            completed(PaymentType::MarketplacePurchase, "artist", 20.0, now),
        ];

        let expected: BTreeMap<PaymentType, f64> = [
            (PaymentType::Tip, 10.0),
            (PaymentType::MarketplacePurchase, 20.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(breakdown(&records), expected);

        let json = serde_json::to_value(breakdown(&records)).unwrap();
        assert_eq!(json, serde_json::json!({"TIP": 10.0, "MARKETPLACE_PURCHASE": 20.0}));
    }

    #[test]
    fn test_only_completed_records_of_user_count() {
        let now = ncos_common::time::now();
        let mut pending = PaymentRecord::new(PaymentType::Tip, "artist", "artist", 5.0);
        pending.created_at = now;
        let mut failed = PaymentRecord::new(PaymentType::Tip, "artist", "artist", 7.0);
        failed.transition_to(PaymentStatus::Failed, None, now).unwrap();
        let mut refunded = completed(PaymentType::Tip, "artist", 11.0, now);
        refunded.transition_to(PaymentStatus::Refunded, None, now).unwrap();

        let records = vec![
            completed(PaymentType::Tip, "artist", 10.0, now),
            completed(PaymentType::Tip, "someone-else", 100.0, now),
            pending,
            failed,
            refunded,
        ];

        let summary = summarize(&records, "artist", now);
        assert_eq!(summary.total_earned, 10.0);
        assert_eq!(summary.pending_payouts, 5.0);
        assert_eq!(summary.recent.len(), 1);
    }

    #[test]
    fn test_monthly_and_last_month() {
        let now = ncos_common::time::now();
        let (year, month) = local_month_of(now);
        let this_month_start = local_month_start(year, month).unwrap();
        let last_month_day = this_month_start - Duration::days(3);
        let long_ago = this_month_start - Duration::days(120);

        let records = vec![
            completed(PaymentType::Tip, "artist", 10.0, now),
            completed(PaymentType::Tip, "artist", 4.0, last_month_day),
            completed(PaymentType::Tip, "artist", 1.0, long_ago),
        ];

        let summary = summarize(&records, "artist", now);
        assert_eq!(summary.total_earned, 15.0);
        assert_eq!(summary.this_month, 10.0);
        assert_eq!(summary.last_month, 4.0);
    }

    #[test]
    fn test_recent_is_newest_first_and_capped() {
        let now = ncos_common::time::now();
        let records: Vec<PaymentRecord> = (0..15)
            .map(|i| completed(PaymentType::Tip, "artist", 1.0, now - Duration::minutes(i)))
            .collect();

        let summary = summarize(&records, "artist", now);

        assert_eq!(summary.recent.len(), RECENT_EARNINGS_LIMIT);
        assert!(summary
            .recent
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at));
        assert_eq!(summary.total_earned, 15.0);
    }

    #[test]
    fn test_empty_history() {
        let summary = summarize(&[], "nobody", ncos_common::time::now());
        assert_eq!(summary.total_earned, 0.0);
        assert!(summary.breakdown.is_empty());
        assert!(summary.recent.is_empty());
    }

    async fn aggregator_with(records: &[PaymentRecord]) -> (Arc<MemoryStore>, EarningsAggregator) {
        let store = Arc::new(MemoryStore::new());
        for record in records {
            store.insert_record(record).await.unwrap();
        }
        (store.clone(), EarningsAggregator::new(store))
    }

    #[tokio::test]
    async fn test_aggregator_totals_ignore_other_users() {
        let now = ncos_common::time::now();
        let (_store, aggregator) = aggregator_with(&[
            completed(PaymentType::Tip, "artist", 10.0, now),
            completed(PaymentType::MarketplacePurchase, "artist", 20.0, now),
            completed(PaymentType::Tip, "someone-else", 500.0, now),
            PaymentRecord::new(PaymentType::Tip, "artist", "artist", 3.0),
        ])
        .await;

        assert_eq!(aggregator.calculate_total_earnings("artist").await.unwrap(), 30.0);
        assert_eq!(aggregator.calculate_monthly_earnings("artist").await.unwrap(), 30.0);
        assert_eq!(aggregator.get_user_earnings("artist").await.unwrap().len(), 2);
        assert_eq!(aggregator.calculate_total_earnings("nobody").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_aggregator_breakdown_by_type() {
        let now = ncos_common::time::now();
        let (_store, aggregator) = aggregator_with(&[
            completed(PaymentType::Tip, "artist", 10.0, now),
            completed(PaymentType::MarketplacePurchase, "artist", 20.0, now),
        ])
        .await;

        let expected: BTreeMap<PaymentType, f64> = [
            (PaymentType::Tip, 10.0),
            (PaymentType::MarketplacePurchase, 20.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(aggregator.get_earnings_breakdown("artist").await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_aggregator_refund_reduces_total() {
        let now = ncos_common::time::now();
        let mut refunded = completed(PaymentType::Tip, "artist", 10.0, now);
        let (store, aggregator) = aggregator_with(&[
            refunded.clone(),
            completed(PaymentType::MarketplacePurchase, "artist", 20.0, now),
        ])
        .await;
        assert_eq!(aggregator.calculate_total_earnings("artist").await.unwrap(), 30.0);

        refunded.transition_to(PaymentStatus::Refunded, None, now).unwrap();
        assert!(store
            .update_record_status(&refunded, PaymentStatus::Completed)
            .await
            .unwrap());

        assert_eq!(aggregator.calculate_total_earnings("artist").await.unwrap(), 20.0);
        assert_eq!(aggregator.calculate_monthly_earnings("artist").await.unwrap(), 20.0);
        let breakdown = aggregator.get_earnings_breakdown("artist").await.unwrap();
        assert_eq!(breakdown.get(&PaymentType::Tip), None);
    }

    #[tokio::test]
    async fn test_aggregator_monthly_excludes_earlier_months() {
        let now = ncos_common::time::now();
        let (year, month) = local_month_of(now);
        let before_this_month = local_month_start(year, month).unwrap() - Duration::days(3);
        let (_store, aggregator) = aggregator_with(&[
            completed(PaymentType::Tip, "artist", 10.0, now),
            completed(PaymentType::Tip, "artist", 4.0, before_this_month),
        ])
        .await;

        assert_eq!(aggregator.calculate_monthly_earnings("artist").await.unwrap(), 10.0);
        assert_eq!(aggregator.calculate_total_earnings("artist").await.unwrap(), 14.0);
    }
}
