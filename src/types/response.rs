//! Response envelope bodies emitted by the request dispatcher

use crate::types::prediction::{ClassProbabilities, PredictionResult, RiskLevel};
use serde::{Deserialize, Serialize};

/// Static model metadata attached to successful responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model kind (e.g. "MLPClassifier")
    pub model_type: String,
    /// Number of features the deployed model consumes
    pub features_used: usize,
    /// Name of the backend endpoint that served the prediction
    pub endpoint: String,
}

/// Successful response body: the prediction result enriched with
/// confidence, model metadata, and a request-correlation identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedPrediction {
    pub prediction: u8,
    pub probability: ClassProbabilities,
    pub risk_level: RiskLevel,
    /// Larger of the two class probabilities
    pub confidence: f64,
    pub model_info: ModelInfo,
    /// Request-correlation identifier
    pub timestamp: String,
}

impl EnrichedPrediction {
    /// Enrich a raw prediction result with response metadata.
    pub fn new(result: PredictionResult, model_info: ModelInfo, request_id: String) -> Self {
        let confidence = result.confidence();
        Self {
            prediction: result.prediction,
            probability: result.probability,
            risk_level: result.risk_level,
            confidence,
            model_info,
            timestamp: request_id,
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message
    pub error: String,
    /// HTTP status code, repeated in the body
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

impl ErrorBody {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            status_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrichment_derives_confidence() {
        let result = PredictionResult::new(0, 0.85, 0.15);
        let info = ModelInfo {
            model_type: "MLPClassifier".to_string(),
            features_used: 50,
            endpoint: "bankruptcy-predictor-local".to_string(),
        };

        let enriched = EnrichedPrediction::new(result, info, "req-123".to_string());

        assert_eq!(enriched.confidence, 0.85);
        assert_eq!(enriched.prediction, 0);
        assert_eq!(enriched.timestamp, "req-123");
        assert_eq!(enriched.model_info.features_used, 50);
    }

    #[test]
    fn test_error_body_serialization() {
        let body = ErrorBody::new(400, "field 'data' missing");
        let json = serde_json::to_string(&body).unwrap();

        assert!(json.contains("\"error\":\"field 'data' missing\""));
        assert!(json.contains("\"statusCode\":400"));
    }
}
