//! Asset analysis API handlers
//!
//! POST /analysis/queue, POST /analysis/retry, GET /analysis/:asset_id

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    models::{AnalysisStatus, AssetAnalysis},
    AppState,
};

/// POST /analysis/queue request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueAnalysisRequest {
    pub asset_id: Option<String>,
    pub audio_url: Option<String>,
}

/// POST /analysis/retry query
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryQuery {
    pub asset_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub message: String,
    pub analysis: AssetAnalysis,
}

#[derive(Debug, Serialize)]
pub struct AnalysisStatusResponse {
    pub analysis: AssetAnalysis,
}

/// POST /analysis/queue
///
/// Returns 202 once the job is queued, or 200 if the asset is already
/// analyzed or being analyzed. A full queue is a 503.
pub async fn queue_analysis(
    State(state): State<AppState>,
    payload: Result<Json<QueueAnalysisRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AnalysisResponse>)> {
    let Json(request) = payload?;
    let asset_id = request.asset_id.unwrap_or_default();
    let audio_url = request.audio_url.unwrap_or_default();

    let outcome = state.analysis.queue(&asset_id, &audio_url).await?;

    if !outcome.queued {
        let message = match outcome.analysis.status {
            AnalysisStatus::Processing => "Analysis already in progress",
            _ => "Analysis already complete",
        };
        return Ok((
            StatusCode::OK,
            Json(AnalysisResponse {
                message: message.to_string(),
                analysis: outcome.analysis,
            }),
        ));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(AnalysisResponse {
            message: "Analysis queued".to_string(),
            analysis: outcome.analysis,
        }),
    ))
}

/// POST /analysis/retry?assetId=
pub async fn retry_analysis(
    State(state): State<AppState>,
    query: Result<Query<RetryQuery>, QueryRejection>,
) -> ApiResult<(StatusCode, Json<AnalysisResponse>)> {
    let Query(query) = query?;
    let asset_id = query
        .asset_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("assetId is required".to_string()))?;

    let analysis = state.analysis.retry(&asset_id).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AnalysisResponse {
            message: format!("Analysis retry {} queued", analysis.retry_count),
            analysis,
        }),
    ))
}

/// GET /analysis/:asset_id
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> ApiResult<Json<AnalysisStatusResponse>> {
    let analysis = state.analysis.get(&asset_id).await?;
    Ok(Json(AnalysisStatusResponse { analysis }))
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/analysis/queue", post(queue_analysis))
        .route("/analysis/retry", post(retry_analysis))
        .route("/analysis/:asset_id", get(get_analysis))
}
