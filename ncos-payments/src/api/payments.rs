//! Payment API handlers
//!
//! POST /payments/create-link, POST /payments/escrow, POST /payments,
//! GET /payments, POST /payments/:id/status, POST /payments/tip,
//! POST /payments/fund-project, GET /payments/split-config/:payment_type

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
    models::{PaymentLink, PaymentRecord, PaymentType, SplitAllocation},
    services::{
        CreateEscrowRequest, CreatePaymentLinkRequest, FundProjectRequest, RecordPaymentRequest,
        SplitPayment, TipRequest, UpdateStatusRequest,
    },
    splits::{allocate, default_allocations, resolve_defaults, RoleRecipients},
    AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinkResponse {
    pub payment_link: PaymentLink,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment: PaymentRecord,
}

#[derive(Debug, Serialize)]
pub struct PaymentsResponse {
    pub payments: Vec<PaymentRecord>,
}

/// GET /payments query
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    /// Kept as text so a malformed value is reported as a 400 with our body
    pub limit: Option<String>,
}

/// GET /payments/split-config/:payment_type query
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitConfigQuery {
    pub creator_id: Option<String>,
    pub pool_id: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AllocationView {
    pub role: crate::splits::Role,
    pub label: &'static str,
    pub share: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitConfigResponse {
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub allocations: Vec<AllocationView>,
    pub platform_fee_percentage: f64,
    /// Default table materialised for `creatorId` and `amount`, when given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<Vec<SplitAllocation>>,
}

/// POST /payments/create-link
pub async fn create_link(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentLinkRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PaymentLinkResponse>)> {
    let Json(request) = payload?;
    let payment_link = state.links.create_link(request).await?;
    Ok((StatusCode::CREATED, Json(PaymentLinkResponse { payment_link })))
}

/// POST /payments/escrow
pub async fn create_escrow(
    State(state): State<AppState>,
    payload: Result<Json<CreateEscrowRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PaymentLinkResponse>)> {
    let Json(request) = payload?;
    let payment_link = state.links.create_escrow(request).await?;
    Ok((StatusCode::CREATED, Json(PaymentLinkResponse { payment_link })))
}

/// POST /payments
pub async fn record_payment(
    State(state): State<AppState>,
    payload: Result<Json<RecordPaymentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PaymentResponse>)> {
    let Json(request) = payload?;
    let payment = state.payments.record_payment(request).await?;
    Ok((StatusCode::CREATED, Json(PaymentResponse { payment })))
}

/// GET /payments?userId=&limit=
pub async fn list_payments(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<PaymentsResponse>> {
    let Query(query) = query?;

    let user_id = query
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("userId is required".to_string()))?;

    let limit = match query.limit.as_deref() {
        None => None,
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                return Err(ApiError::BadRequest(format!(
                    "limit must be a positive integer, got '{}'",
                    raw
                )))
            }
        },
    };

    let payments = state.payments.history(&user_id, limit).await?;
    Ok(Json(PaymentsResponse { payments }))
}

/// POST /payments/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Json<PaymentResponse>> {
    let Json(request) = payload?;
    let payment = state.payments.update_status(&id, request).await?;
    Ok(Json(PaymentResponse { payment }))
}

/// POST /payments/tip
pub async fn tip(
    State(state): State<AppState>,
    payload: Result<Json<TipRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SplitPayment>)> {
    let Json(request) = payload?;
    let result = state.payments.tip(request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// POST /payments/fund-project
pub async fn fund_project(
    State(state): State<AppState>,
    payload: Result<Json<FundProjectRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SplitPayment>)> {
    let Json(request) = payload?;
    let result = state.payments.fund_project(request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /payments/split-config/:payment_type
pub async fn split_config(
    State(state): State<AppState>,
    Path(payment_type): Path<String>,
    query: Result<Query<SplitConfigQuery>, QueryRejection>,
) -> ApiResult<Json<SplitConfigResponse>> {
    let Query(query) = query?;
    let payment_type = payment_type
        .parse::<PaymentType>()
        .map_err(ApiError::BadRequest)?;

    let allocations = default_allocations(payment_type)
        .iter()
        .map(|a| AllocationView {
            role: a.role,
            label: a.role.label(),
            share: a.share,
        })
        .collect();

    let resolved = match (query.creator_id, query.amount) {
        (Some(creator_id), Some(amount)) => {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(ApiError::BadRequest(format!(
                    "amount must be greater than 0, got {}",
                    amount
                )));
            }
            let mut recipients = RoleRecipients::creator(creator_id);
            if let Some(pool_id) = query.pool_id {
                recipients = recipients.with_pool(pool_id);
            }
            Some(allocate(amount, &resolve_defaults(payment_type, &recipients)))
        }
        _ => None,
    };

    Ok(Json(SplitConfigResponse {
        payment_type,
        allocations,
        platform_fee_percentage: state.platform_fee_fraction * 100.0,
        resolved,
    }))
}

/// Build payment routes
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments).post(record_payment))
        .route("/payments/create-link", post(create_link))
        .route("/payments/escrow", post(create_escrow))
        .route("/payments/tip", post(tip))
        .route("/payments/fund-project", post(fund_project))
        .route("/payments/:id/status", post(update_status))
        .route("/payments/split-config/:payment_type", get(split_config))
}
