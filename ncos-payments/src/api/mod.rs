//! HTTP API handlers for ncos-payments

pub mod analysis;
pub mod earnings;
pub mod health;
pub mod payments;

pub use analysis::analysis_routes;
pub use earnings::earnings_routes;
pub use health::health_routes;
pub use payments::payment_routes;
