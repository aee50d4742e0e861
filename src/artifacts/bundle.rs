//! Artifact bundle: the loaded (classifier, scaler, feature list) triple

use crate::artifacts::classifier::{ClassifierModel, OnnxClassifier};
use crate::artifacts::scaler::ScalingParameters;
use crate::config::ArtifactsConfig;
use crate::error::{ServingError, ServingResult};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// The three logically-linked training artifacts, loaded once per process
/// and treated as one atomic unit.
///
/// Construction validates consistency; after that the bundle is immutable
/// and shared behind `Arc` with no locking. Reloading a model means
/// building a new bundle and swapping the shared handle, never mutating
/// this one.
pub struct ArtifactBundle {
    classifier: Arc<dyn ClassifierModel>,
    scaler: ScalingParameters,
    features: Vec<String>,
    model_type: String,
}

impl std::fmt::Debug for ArtifactBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactBundle")
            .field("scaler", &self.scaler)
            .field("features", &self.features)
            .field("model_type", &self.model_type)
            .finish_non_exhaustive()
    }
}

impl ArtifactBundle {
    /// Load all three artifacts from the configured directory.
    ///
    /// Fails atomically: a missing or unreadable artifact, or a width
    /// mismatch between them, fails the whole load.
    pub fn load(config: &ArtifactsConfig) -> ServingResult<Self> {
        let dir = Path::new(&config.dir);
        info!(dir = %dir.display(), "Loading model artifacts");

        let scaler_raw = read_artifact(&dir.join(&config.scaler_file), "scaler")?;
        let scaler = ScalingParameters::from_json(&scaler_raw)?;

        let features_raw = read_artifact(&dir.join(&config.features_file), "feature list")?;
        let features: Vec<String> = serde_json::from_str(&features_raw)
            .map_err(|e| ServingError::ArtifactLoad(format!("unreadable feature list: {}", e)))?;

        let classifier =
            OnnxClassifier::load(dir.join(&config.classifier_file), config.onnx_threads)?;

        let bundle = Self::from_parts(
            Arc::new(classifier),
            scaler,
            features,
            config.model_type.clone(),
        )?;

        info!(
            features = bundle.feature_count(),
            model_type = %bundle.model_type(),
            "All artifacts loaded successfully"
        );

        Ok(bundle)
    }

    /// Assemble a bundle from already-loaded parts, validating consistency.
    ///
    /// This is the seam for substituting classifier test doubles.
    pub fn from_parts(
        classifier: Arc<dyn ClassifierModel>,
        scaler: ScalingParameters,
        features: Vec<String>,
        model_type: String,
    ) -> ServingResult<Self> {
        if features.is_empty() {
            return Err(ServingError::ArtifactLoad(
                "selected feature list is empty".to_string(),
            ));
        }

        if scaler.width() != features.len() {
            return Err(ServingError::ArtifactInconsistent(format!(
                "scaler expects {} features, feature list has {}",
                scaler.width(),
                features.len()
            )));
        }

        if let Some(width) = classifier.input_width() {
            if width != features.len() {
                return Err(ServingError::ArtifactInconsistent(format!(
                    "classifier expects {} features, feature list has {}",
                    width,
                    features.len()
                )));
            }
        }

        Ok(Self {
            classifier,
            scaler,
            features,
            model_type,
        })
    }

    /// Number of features the deployed model consumes.
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Ordered selected-feature names from training.
    pub fn feature_names(&self) -> &[String] {
        &self.features
    }

    /// Human-readable model kind.
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn scaler(&self) -> &ScalingParameters {
        &self.scaler
    }

    pub fn classifier(&self) -> &dyn ClassifierModel {
        self.classifier.as_ref()
    }
}

fn read_artifact(path: &Path, what: &str) -> ServingResult<String> {
    fs::read_to_string(path).map_err(|e| {
        ServingError::ArtifactLoad(format!("{} not found at {}: {}", what, path.display(), e))
    })
}
