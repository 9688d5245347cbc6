//! SQLite-backed store
//!
//! Timestamps are stored as fixed-width RFC 3339 text (nanosecond precision,
//! `Z` suffix) so that lexical order matches chronological order.
//! Splits, metadata and analysis results are stored as JSON text.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use ncos_common::time::parse_rfc3339;
use ncos_common::{Error, Result};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{AnalysisStore, PaymentStore};
use crate::models::{
    AnalysisStatus, AssetAnalysis, PaymentLink, PaymentRecord, PaymentSplit, PaymentStatus,
    PaymentType, SettlementRail, TargetType,
};

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap a pool whose schema has already been created
    /// (see `ncos_common::db::create_schema`)
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_opt_ts(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_rfc3339).transpose()
}

fn to_json_text(value: &Value) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("Failed to serialize JSON: {}", e)))
}

fn parse_json_text(value: Option<String>) -> Result<Option<Value>> {
    value
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to deserialize JSON column: {}", e)))
}

fn record_from_row(row: &SqliteRow) -> Result<PaymentRecord> {
    let payment_type: String = row.try_get("payment_type")?;
    let status: String = row.try_get("status")?;

    Ok(PaymentRecord {
        id: row.try_get("id")?,
        payment_type: payment_type.parse::<PaymentType>().map_err(Error::Internal)?,
        user_id: row.try_get("user_id")?,
        payer_id: row.try_get("payer_id")?,
        target_id: row.try_get("target_id")?,
        amount_usd: row.try_get("amount_usd")?,
        status: status.parse::<PaymentStatus>().map_err(Error::Internal)?,
        transaction_hash: row.try_get("transaction_hash")?,
        metadata: parse_json_text(row.try_get("metadata")?)?,
        created_at: parse_rfc3339(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_rfc3339(&row.try_get::<String, _>("updated_at")?)?,
        completed_at: parse_opt_ts(row.try_get("completed_at")?)?,
    })
}

fn link_from_row(row: &SqliteRow) -> Result<PaymentLink> {
    let target_type: String = row.try_get("target_type")?;
    let rail: String = row.try_get("rail")?;
    let splits: String = row.try_get("splits")?;
    let splits: Vec<PaymentSplit> = serde_json::from_str(&splits)
        .map_err(|e| Error::Internal(format!("Failed to deserialize splits: {}", e)))?;

    Ok(PaymentLink {
        id: row.try_get("id")?,
        target_type: target_type.parse::<TargetType>().map_err(Error::Internal)?,
        target_id: row.try_get("target_id")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        rail: rail.parse::<SettlementRail>().map_err(Error::Internal)?,
        url: row.try_get("url")?,
        splits,
        metadata: parse_json_text(row.try_get("metadata")?)?,
        description: row.try_get("description")?,
        created_at: parse_rfc3339(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn analysis_from_row(row: &SqliteRow) -> Result<AssetAnalysis> {
    let status: String = row.try_get("status")?;
    let retry_count: i64 = row.try_get("retry_count")?;

    Ok(AssetAnalysis {
        asset_id: row.try_get("asset_id")?,
        audio_url: row.try_get("audio_url")?,
        status: status.parse::<AnalysisStatus>().map_err(Error::Internal)?,
        retry_count: u32::try_from(retry_count)
            .map_err(|_| Error::Internal(format!("Invalid retry_count: {}", retry_count)))?,
        result: parse_json_text(row.try_get("result")?)?,
        error_message: row.try_get("error_message")?,
        last_retry_at: parse_opt_ts(row.try_get("last_retry_at")?)?,
        created_at: parse_rfc3339(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_rfc3339(&row.try_get::<String, _>("updated_at")?)?,
    })
}

const RECORD_COLUMNS: &str = "id, payment_type, user_id, payer_id, target_id, amount_usd, status, \
     transaction_hash, metadata, created_at, updated_at, completed_at";

#[async_trait]
impl PaymentStore for SqliteStore {
    async fn insert_record(&self, record: &PaymentRecord) -> Result<()> {
        let metadata = record.metadata.as_ref().map(to_json_text).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO payment_records (
                id, payment_type, user_id, payer_id, target_id, amount_usd, status,
                transaction_hash, metadata, created_at, updated_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(record.payment_type.as_str())
        .bind(&record.user_id)
        .bind(&record.payer_id)
        .bind(&record.target_id)
        .bind(record.amount_usd)
        .bind(record.status.as_str())
        .bind(&record.transaction_hash)
        .bind(metadata)
        .bind(ts(record.created_at))
        .bind(ts(record.updated_at))
        .bind(record.completed_at.map(ts))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM payment_records WHERE id = ?", RECORD_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn update_record_status(
        &self,
        record: &PaymentRecord,
        expected: PaymentStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payment_records
            SET status = ?, transaction_hash = ?, updated_at = ?, completed_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(record.status.as_str())
        .bind(&record.transaction_hash)
        .bind(ts(record.updated_at))
        .bind(record.completed_at.map(ts))
        .bind(&record.id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn records_for_user(&self, user_id: &str) -> Result<Vec<PaymentRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM payment_records WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            RECORD_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn history_for_user(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<PaymentRecord>> {
        // LIMIT -1 means "no limit" in SQLite
        let limit = limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX)).unwrap_or(-1);

        let rows = sqlx::query(&format!(
            "SELECT {} FROM payment_records
             WHERE user_id = ? OR payer_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
            RECORD_COLUMNS
        ))
        .bind(user_id)
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn insert_link(&self, link: &PaymentLink) -> Result<()> {
        let splits = serde_json::to_string(&link.splits)
            .map_err(|e| Error::Internal(format!("Failed to serialize splits: {}", e)))?;
        let metadata = link.metadata.as_ref().map(to_json_text).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO payment_links (
                id, target_type, target_id, amount, currency, rail, url,
                splits, metadata, description, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&link.id)
        .bind(link.target_type.as_str())
        .bind(&link.target_id)
        .bind(link.amount)
        .bind(&link.currency)
        .bind(link.rail.as_str())
        .bind(&link.url)
        .bind(splits)
        .bind(metadata)
        .bind(&link.description)
        .bind(ts(link.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_link(&self, id: &str) -> Result<Option<PaymentLink>> {
        let row = sqlx::query(
            r#"
            SELECT id, target_type, target_id, amount, currency, rail, url,
                   splits, metadata, description, created_at
            FROM payment_links
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(link_from_row).transpose()
    }
}

#[async_trait]
impl AnalysisStore for SqliteStore {
    async fn get_analysis(&self, asset_id: &str) -> Result<Option<AssetAnalysis>> {
        let row = sqlx::query(
            r#"
            SELECT asset_id, audio_url, status, retry_count, result, error_message,
                   last_retry_at, created_at, updated_at
            FROM asset_analyses
            WHERE asset_id = ?
            "#,
        )
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(analysis_from_row).transpose()
    }

    async fn save_analysis(&self, analysis: &AssetAnalysis) -> Result<()> {
        let result = analysis.result.as_ref().map(to_json_text).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO asset_analyses (
                asset_id, audio_url, status, retry_count, result, error_message,
                last_retry_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(asset_id) DO UPDATE SET
                audio_url = excluded.audio_url,
                status = excluded.status,
                retry_count = excluded.retry_count,
                result = excluded.result,
                error_message = excluded.error_message,
                last_retry_at = excluded.last_retry_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&analysis.asset_id)
        .bind(&analysis.audio_url)
        .bind(analysis.status.as_str())
        .bind(i64::from(analysis.retry_count))
        .bind(result)
        .bind(&analysis.error_message)
        .bind(analysis.last_retry_at.map(ts))
        .bind(ts(analysis.created_at))
        .bind(ts(analysis.updated_at))
        .execute(&self.pool)
        .await?;

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
        let result = result.as_ref().map(to_json_text).transpose()?;

        let outcome = sqlx::query(
            r#"
            UPDATE asset_analyses
            SET status = ?, result = ?, error_message = ?, updated_at = ?
            WHERE asset_id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(result)
        .bind(error_message)
        .bind(ts(at))
        .bind(asset_id)
        .execute(&self.pool)
        .await?;

        Ok(outcome.rows_affected() == 1)
    }
}
