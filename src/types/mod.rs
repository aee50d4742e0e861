//! Type definitions for the prediction serving pipeline

pub mod prediction;
pub mod response;

pub use prediction::{ClassProbabilities, PredictionResult, RiskLevel};
pub use response::{EnrichedPrediction, ErrorBody, ModelInfo};

/// Feature width of the deployed model contract. The dispatcher validates
/// inbound payloads against this before any backend work is attempted.
pub const EXPECTED_FEATURES: usize = 50;
