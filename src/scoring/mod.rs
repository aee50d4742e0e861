//! Scoring pipeline: input normalization and model execution

pub mod engine;
pub mod normalizer;

pub use engine::ScoringEngine;
pub use normalizer::{AlignedInput, InputNormalizer, RawPayload};
