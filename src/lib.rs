//! Bankruptcy Prediction Serving Library
//!
//! Serves predictions from a pretrained binary bankruptcy classifier behind
//! an HTTP boundary: artifact loading, input normalization, scaling +
//! classification + risk tiering, and the request dispatcher wrapped around
//! that pipeline.

pub mod artifacts;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod scoring;
pub mod types;

pub use artifacts::ArtifactBundle;
pub use config::AppConfig;
pub use dispatcher::EndpointRegistry;
pub use error::ServingError;
pub use scoring::{InputNormalizer, ScoringEngine};
pub use types::{PredictionResult, RiskLevel};
