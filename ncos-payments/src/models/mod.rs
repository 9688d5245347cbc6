//! Domain models for payments, payment links and asset analysis

pub mod analysis;
pub mod link;
pub mod payment;
pub mod split;

pub use analysis::{AnalysisStatus, AssetAnalysis, MAX_ANALYSIS_RETRIES};
pub use link::{PaymentLink, SettlementRail, TargetType};
pub use payment::{PaymentRecord, PaymentStatus, PaymentType, StatusTransitionError};
pub use split::{PaymentSplit, SplitAllocation};
