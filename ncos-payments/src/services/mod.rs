//! Business services behind the HTTP handlers

pub mod analysis;
pub mod analyzer;
pub mod earnings;
pub mod link_factory;
pub mod payments;

pub use analysis::{AnalysisError, AnalysisJob, AnalysisQueue, QueueOutcome, DEFAULT_QUEUE_CAPACITY};
pub use analyzer::{Analyzer, AnalyzerError, HttpAnalyzer};
pub use earnings::{EarningsAggregator, EarningsSummary};
pub use link_factory::{CreateEscrowRequest, CreatePaymentLinkRequest, LinkError, PaymentLinkFactory};
pub use payments::{
    FundProjectRequest, PaymentError, PaymentService, RecordPaymentRequest, SplitPayment, TipRequest,
    UpdateStatusRequest,
};
