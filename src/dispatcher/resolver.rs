//! Backend endpoint resolution and invocation

use crate::artifacts::ArtifactBundle;
use crate::error::{ServingError, ServingResult};
use crate::metrics::ServingMetrics;
use crate::scoring::{InputNormalizer, ScoringEngine};
use crate::types::PredictionResult;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Scoring contract of a live backend instance.
///
/// The in-process implementation chains Normalizer and Engine over a loaded
/// bundle; a remote implementation would carry the same contract over the
/// network.
pub trait ScoringBackend: Send + Sync {
    /// Score a validated feature vector.
    fn invoke(&self, data: &[f64]) -> ServingResult<PredictionResult>;
}

impl std::fmt::Debug for dyn ScoringBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ScoringBackend")
    }
}

/// In-process scoring backend over a loaded artifact bundle.
pub struct LocalBackend {
    normalizer: InputNormalizer,
    engine: ScoringEngine,
    expected: usize,
    metrics: Arc<ServingMetrics>,
}

impl LocalBackend {
    pub fn new(bundle: Arc<ArtifactBundle>, metrics: Arc<ServingMetrics>) -> Self {
        let expected = bundle.feature_count();
        Self {
            normalizer: InputNormalizer::new(),
            engine: ScoringEngine::new(bundle),
            expected,
            metrics,
        }
    }

    /// Score a raw payload in any of the shapes the normalizer accepts.
    ///
    /// This is the entry point callers hitting the backend directly use;
    /// the dispatcher goes through `invoke` with an already-validated
    /// vector.
    pub fn invoke_raw(&self, raw: &Value) -> ServingResult<PredictionResult> {
        let aligned = self.normalizer.normalize(raw, self.expected)?;
        if aligned.was_resized() {
            self.metrics.record_length_mismatch();
        }
        self.engine.score(&aligned.values)
    }
}

impl ScoringBackend for LocalBackend {
    fn invoke(&self, data: &[f64]) -> ServingResult<PredictionResult> {
        // Same wire shape a remote scoring call would carry
        let payload = Value::Array(
            data.iter()
                .map(|&x| {
                    serde_json::Number::from_f64(x)
                        .map(Value::Number)
                        .ok_or_else(|| {
                            ServingError::Transport(format!("non-finite value {} in payload", x))
                        })
                })
                .collect::<ServingResult<Vec<Value>>>()?,
        );
        self.invoke_raw(&payload)
    }
}

struct RegisteredEndpoint {
    name: String,
    in_service: bool,
    backend: Arc<dyn ScoringBackend>,
}

/// Registry of currently-live backend scoring instances.
///
/// Resolution prefers an explicitly configured endpoint name and falls back
/// to a discovery scan filtered by the marker substring.
pub struct EndpointRegistry {
    endpoints: RwLock<Vec<RegisteredEndpoint>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self {
            endpoints: RwLock::new(Vec::new()),
        }
    }

    /// Register a live backend instance under an endpoint name.
    pub fn register(&self, name: &str, backend: Arc<dyn ScoringBackend>) {
        info!(endpoint = %name, "Registering scoring backend");
        if let Ok(mut endpoints) = self.endpoints.write() {
            endpoints.push(RegisteredEndpoint {
                name: name.to_string(),
                in_service: true,
                backend,
            });
        }
    }

    /// Names of all registered endpoints.
    pub fn endpoint_names(&self) -> Vec<String> {
        self.endpoints
            .read()
            .map(|endpoints| endpoints.iter().map(|e| e.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Resolve the live backend to invoke.
    ///
    /// The configured name wins when it is registered; otherwise the scan
    /// picks the first in-service endpoint whose name contains the marker.
    pub fn resolve(
        &self,
        configured: Option<&str>,
        marker: &str,
    ) -> ServingResult<(String, Arc<dyn ScoringBackend>)> {
        let endpoints = self
            .endpoints
            .read()
            .map_err(|e| ServingError::Resolution(format!("registry lock poisoned: {}", e)))?;

        if let Some(name) = configured {
            if let Some(endpoint) = endpoints.iter().find(|e| e.name == name && e.in_service) {
                debug!(endpoint = %name, "Resolved configured endpoint");
                return Ok((endpoint.name.clone(), endpoint.backend.clone()));
            }
            warn!(
                endpoint = %name,
                "Configured endpoint not registered, falling back to discovery scan"
            );
        }

        if let Some(endpoint) = endpoints
            .iter()
            .find(|e| e.in_service && e.name.contains(marker))
        {
            debug!(endpoint = %endpoint.name, "Resolved endpoint via discovery scan");
            return Ok((endpoint.name.clone(), endpoint.backend.clone()));
        }

        Err(ServingError::Resolution(format!(
            "no live scoring endpoint matching '{}' found; start a backend instance and \
             register it, or set endpoint.name in the configuration",
            marker
        )))
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullBackend;

    impl ScoringBackend for NullBackend {
        fn invoke(&self, _data: &[f64]) -> ServingResult<PredictionResult> {
            Ok(PredictionResult::new(0, 0.9, 0.1))
        }
    }

    #[test]
    fn test_configured_endpoint_wins() {
        let registry = EndpointRegistry::new();
        registry.register("bankruptcy-predictor-a", Arc::new(NullBackend));
        registry.register("bankruptcy-predictor-b", Arc::new(NullBackend));

        let (name, _) = registry
            .resolve(Some("bankruptcy-predictor-b"), "bankruptcy-predictor")
            .unwrap();
        assert_eq!(name, "bankruptcy-predictor-b");
    }

    #[test]
    fn test_discovery_scan_filters_by_marker() {
        let registry = EndpointRegistry::new();
        registry.register("other-service", Arc::new(NullBackend));
        registry.register("bankruptcy-predictor-prod", Arc::new(NullBackend));

        let (name, _) = registry.resolve(None, "bankruptcy-predictor").unwrap();
        assert_eq!(name, "bankruptcy-predictor-prod");
    }

    #[test]
    fn test_missing_configured_endpoint_falls_back_to_scan() {
        let registry = EndpointRegistry::new();
        registry.register("bankruptcy-predictor-prod", Arc::new(NullBackend));

        let (name, _) = registry
            .resolve(Some("gone-endpoint"), "bankruptcy-predictor")
            .unwrap();
        assert_eq!(name, "bankruptcy-predictor-prod");
    }

    #[test]
    fn test_empty_registry_is_resolution_error() {
        let registry = EndpointRegistry::new();

        let err = registry.resolve(None, "bankruptcy-predictor").unwrap_err();
        assert!(matches!(err, ServingError::Resolution(_)));
        assert!(err.to_string().contains("register"));
    }

    #[test]
    fn test_no_marker_match_is_resolution_error() {
        let registry = EndpointRegistry::new();
        registry.register("other-service", Arc::new(NullBackend));

        let err = registry.resolve(None, "bankruptcy-predictor").unwrap_err();
        assert!(matches!(err, ServingError::Resolution(_)));
    }
}
