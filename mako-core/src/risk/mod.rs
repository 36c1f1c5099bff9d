//! Risk management: position accounting and the gated order submitter.

pub mod position;
pub mod submitter;

pub use position::PositionTracker;
pub use submitter::{OrderSink, OrderSubmitter, RiskLimits, RiskRejection, SubmitError};
