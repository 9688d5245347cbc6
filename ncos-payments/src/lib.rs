//! ncos-payments library - payment links, revenue splits, earnings and
//! asset analysis scheduling

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod splits;

use db::PaymentStore;
use services::{AnalysisQueue, EarningsAggregator, PaymentLinkFactory, PaymentService};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub links: PaymentLinkFactory,
    pub earnings: EarningsAggregator,
    pub payments: PaymentService,
    pub analysis: AnalysisQueue,
    /// Platform fee as a fraction in [0, 1)
    pub platform_fee_fraction: f64,
}

impl AppState {
    /// Wire the services over one payment store
    pub fn new(
        store: Arc<dyn PaymentStore>,
        analysis: AnalysisQueue,
        public_base_url: &str,
        platform_fee_fraction: f64,
    ) -> Self {
        Self {
            links: PaymentLinkFactory::new(store.clone(), public_base_url)
                .platform_fee(platform_fee_fraction),
            earnings: EarningsAggregator::new(store.clone()),
            payments: PaymentService::new(store),
            analysis,
            platform_fee_fraction,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::payment_routes())
        .merge(api::earnings_routes())
        .merge(api::analysis_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
