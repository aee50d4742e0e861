//! Prediction result data structures

use serde::{Deserialize, Serialize};

/// Risk tier derived from the bankruptcy-class probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Bankruptcy probability above which a prediction is tiered high.
const HIGH_THRESHOLD: f64 = 0.7;
/// Bankruptcy probability above which a prediction is tiered medium.
const MEDIUM_THRESHOLD: f64 = 0.3;

impl RiskLevel {
    /// Determine the risk tier from the bankruptcy-class probability.
    ///
    /// Thresholds are fixed: `> 0.7` is high, `> 0.3` is medium, everything
    /// else is low. Boundary values fall to the lower tier.
    pub fn from_bankrupt_probability(p_bankrupt: f64) -> Self {
        if p_bankrupt > HIGH_THRESHOLD {
            RiskLevel::High
        } else if p_bankrupt > MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Lowercase tier name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Class probabilities for the two outcomes, summing to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub not_bankrupt: f64,
    pub bankrupt: f64,
}

/// Result of scoring one aligned feature vector.
///
/// Field order matches the canonical response body: `prediction`,
/// `probability`, `risk_level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted class label (0 = not bankrupt, 1 = bankrupt)
    pub prediction: u8,
    /// Class probabilities
    pub probability: ClassProbabilities,
    /// Discrete risk tier
    pub risk_level: RiskLevel,
}

impl PredictionResult {
    /// Build a result from a label and its class probabilities.
    pub fn new(label: u8, not_bankrupt: f64, bankrupt: f64) -> Self {
        Self {
            prediction: label,
            probability: ClassProbabilities {
                not_bankrupt,
                bankrupt,
            },
            risk_level: RiskLevel::from_bankrupt_probability(bankrupt),
        }
    }

    /// Confidence is the larger of the two class probabilities.
    pub fn confidence(&self) -> f64 {
        self.probability.not_bankrupt.max(self.probability.bankrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::from_bankrupt_probability(0.1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_bankrupt_probability(0.5), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_bankrupt_probability(0.9), RiskLevel::High);
    }

    #[test]
    fn test_risk_level_boundaries_fall_to_lower_tier() {
        assert_eq!(RiskLevel::from_bankrupt_probability(0.3), RiskLevel::Low);
        assert_eq!(RiskLevel::from_bankrupt_probability(0.7), RiskLevel::Medium);
    }

    #[test]
    fn test_prediction_confidence() {
        let result = PredictionResult::new(1, 0.2, 0.8);
        assert_eq!(result.confidence(), 0.8);

        let result = PredictionResult::new(0, 0.95, 0.05);
        assert_eq!(result.confidence(), 0.95);
    }

    #[test]
    fn test_result_field_order_is_canonical() {
        let result = PredictionResult::new(1, 0.25, 0.75);
        let json = serde_json::to_string(&result).unwrap();

        let prediction_pos = json.find("\"prediction\"").unwrap();
        let probability_pos = json.find("\"probability\"").unwrap();
        let risk_pos = json.find("\"risk_level\"").unwrap();
        assert!(prediction_pos < probability_pos);
        assert!(probability_pos < risk_pos);
        assert!(json.contains("\"risk_level\":\"high\""));
    }
}
