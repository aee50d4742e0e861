//! Scoring engine: scaling, classification, and risk tiering

use crate::artifacts::ArtifactBundle;
use crate::error::{ServingError, ServingResult};
use crate::types::PredictionResult;
use std::sync::Arc;
use tracing::debug;

/// Executes the deterministic scoring computation over a loaded bundle.
///
/// The engine holds no mutable state of its own: scoring is a pure function
/// of (bundle, aligned input), so concurrent calls need no coordination.
pub struct ScoringEngine {
    bundle: Option<Arc<ArtifactBundle>>,
}

impl ScoringEngine {
    /// Create an engine over a fully loaded bundle.
    pub fn new(bundle: Arc<ArtifactBundle>) -> Self {
        Self {
            bundle: Some(bundle),
        }
    }

    /// Create an engine with no bundle; every scoring call fails with
    /// "not ready" until one is attached. Precondition violation, not a
    /// transient condition; callers must not retry.
    pub fn uninitialized() -> Self {
        Self { bundle: None }
    }

    pub fn is_ready(&self) -> bool {
        self.bundle.is_some()
    }

    /// Score one aligned feature vector.
    ///
    /// The input is treated as a single-row batch of the model width. The
    /// per-feature affine transform is applied, then the classifier is
    /// invoked for the label and the class probabilities, and the risk tier
    /// is derived from the bankrupt-class probability.
    pub fn score(&self, aligned: &[f64]) -> ServingResult<PredictionResult> {
        let bundle = self
            .bundle
            .as_ref()
            .ok_or_else(|| ServingError::Scoring("not ready".to_string()))?;

        if aligned.len() != bundle.feature_count() {
            return Err(ServingError::Scoring(format!(
                "aligned input width {} does not match model width {}",
                aligned.len(),
                bundle.feature_count()
            )));
        }

        let scaled = bundle.scaler().transform(aligned);

        let label = bundle.classifier().classify(&scaled)?;
        let (not_bankrupt, bankrupt) = bundle.classifier().classify_probabilities(&scaled)?;

        let result = PredictionResult::new(label, not_bankrupt, bankrupt);

        debug!(
            prediction = result.prediction,
            p_bankrupt = result.probability.bankrupt,
            risk_level = ?result.risk_level,
            "Scoring complete"
        );

        Ok(result)
    }
}
