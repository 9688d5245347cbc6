//! Earnings API handler

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    services::EarningsSummary,
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EarningsResponse {
    pub earnings: EarningsSummary,
}

/// GET /payments/earnings?userId=
pub async fn get_earnings(
    State(state): State<AppState>,
    query: Result<Query<EarningsQuery>, QueryRejection>,
) -> ApiResult<Json<EarningsResponse>> {
    let Query(query) = query?;
    let user_id = query
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("userId is required".to_string()))?;

    let earnings = state.earnings.get_earnings_summary(&user_id).await?;

    tracing::debug!(
        user_id = %user_id,
        total_earned = earnings.total_earned,
        "Computed earnings summary"
    );

    Ok(Json(EarningsResponse { earnings }))
}

/// Build earnings routes
pub fn earnings_routes() -> Router<AppState> {
    Router::new().route("/payments/earnings", get(get_earnings))
}
