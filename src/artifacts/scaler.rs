//! Standard-scaler parameters produced by training

use crate::error::{ServingError, ServingResult};
use serde::Deserialize;

/// Per-feature (mean, scale) pairs for the affine input transform.
///
/// Owned exclusively by the artifact bundle and never mutated after load.
#[derive(Debug, Clone, Deserialize)]
pub struct ScalingParameters {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl ScalingParameters {
    /// Parse scaler parameters from their JSON artifact representation.
    pub fn from_json(raw: &str) -> ServingResult<Self> {
        let params: ScalingParameters = serde_json::from_str(raw)
            .map_err(|e| ServingError::ArtifactLoad(format!("unreadable scaler: {}", e)))?;

        if params.mean.len() != params.scale.len() {
            return Err(ServingError::ArtifactInconsistent(format!(
                "scaler mean/scale width mismatch: {} vs {}",
                params.mean.len(),
                params.scale.len()
            )));
        }

        Ok(params)
    }

    /// Number of features the scaler expects.
    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Apply the affine transform `(x[i] - mean[i]) / scale[i]`.
    ///
    /// No clipping and no imputation; the input is expected to already be
    /// aligned to the scaler width.
    pub fn transform(&self, aligned: &[f64]) -> Vec<f64> {
        aligned
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(&x, (&mean, &scale))| (x - mean) / scale)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform() {
        let scaler = ScalingParameters {
            mean: vec![1.0, 2.0],
            scale: vec![2.0, 4.0],
        };

        let scaled = scaler.transform(&[3.0, 10.0]);
        assert_eq!(scaled, vec![1.0, 2.0]);
    }

    #[test]
    fn test_from_json() {
        let scaler =
            ScalingParameters::from_json(r#"{"mean": [0.5, 0.1], "scale": [1.0, 0.2]}"#).unwrap();
        assert_eq!(scaler.width(), 2);
    }

    #[test]
    fn test_mismatched_widths_rejected() {
        let err =
            ScalingParameters::from_json(r#"{"mean": [0.5], "scale": [1.0, 0.2]}"#).unwrap_err();
        assert!(matches!(err, ServingError::ArtifactInconsistent(_)));
    }

    #[test]
    fn test_unreadable_json_is_load_error() {
        let err = ScalingParameters::from_json("not json").unwrap_err();
        assert!(matches!(err, ServingError::ArtifactLoad(_)));
    }
}
