//! Validation and hand-off to the analysis stage.
//!
//! A [`ProcessingResult`](crate::types::ProcessingResult) is checked against a
//! [`ValidationPolicy`]. Acceptable results become an
//! [`AnalysisRequest`](crate::types::AnalysisRequest) that carries the result unchanged;
//! anything else comes back with issues and recommendations and no request at all.

pub mod consumer;
pub mod validation;

pub use consumer::{AnalysisConsumer, forward};
pub use validation::{BridgeOutcome, ValidationPolicy, validate_and_bridge};
