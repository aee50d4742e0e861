//! Request dispatcher: the transport-facing front door
//!
//! Handles one request as `Received -> Validated -> EndpointResolved ->
//! Invoked -> Enriched -> Returned`, with terminal rejection (400) and
//! unavailability (503) outcomes, and converts every failure into a
//! structured error envelope.

pub mod resolver;

pub use resolver::{EndpointRegistry, LocalBackend, ScoringBackend};

use crate::config::EndpointConfig;
use crate::error::{ServingError, ServingResult};
use crate::metrics::ServingMetrics;
use crate::scoring::normalizer::coerce_number;
use crate::types::{EnrichedPrediction, ErrorBody, ModelInfo, EXPECTED_FEATURES};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<EndpointRegistry>,
    pub endpoint_config: EndpointConfig,
    /// Model kind reported in response metadata
    pub model_type: String,
    pub metrics: Arc<ServingMetrics>,
}

/// Create the main router with all routes and layers.
///
/// The CORS layer is outermost so browser-originated callers are never
/// blocked by header policy, whatever the outcome.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .route("/metrics", get(metrics_snapshot))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS, Method::GET])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
}

/// POST /predict
async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    state.metrics.record_request();

    let response = match handle_predict(&state, payload) {
        Ok(enriched) => {
            state.metrics.record_prediction(enriched.risk_level.as_str());
            info!(
                request_id = %enriched.timestamp,
                prediction = enriched.prediction,
                risk_level = ?enriched.risk_level,
                endpoint = %enriched.model_info.endpoint,
                "Prediction served"
            );
            (StatusCode::OK, Json(enriched)).into_response()
        }
        Err(err) => error_response(&err),
    };

    state
        .metrics
        .record_response(response.status().as_u16(), started.elapsed());
    response
}

/// Walk one request through validation, resolution, invocation, and
/// enrichment. Every failure short-circuits with its taxonomy error.
fn handle_predict(
    state: &AppState,
    payload: Result<Json<Value>, JsonRejection>,
) -> ServingResult<EnrichedPrediction> {
    // Received -> Validated
    let Json(payload) = payload.map_err(|e| {
        ServingError::InputFormat(format!("request body is not valid JSON: {}", e))
    })?;
    let data = validate_payload(&payload)?;

    // Validated -> EndpointResolved
    let (endpoint, backend) = state.registry.resolve(
        state.endpoint_config.name.as_deref(),
        &state.endpoint_config.marker,
    )?;

    // EndpointResolved -> Invoked
    let result = backend.invoke(&data)?;

    // Invoked -> Enriched
    let request_id = Uuid::new_v4().to_string();
    Ok(EnrichedPrediction::new(
        result,
        ModelInfo {
            model_type: state.model_type.clone(),
            features_used: EXPECTED_FEATURES,
            endpoint,
        },
        request_id,
    ))
}

/// Validate the inbound payload contract: a `data` field holding an array
/// of exactly the expected number of float-coercible values.
fn validate_payload(payload: &Value) -> ServingResult<Vec<f64>> {
    let body = payload.as_object().ok_or_else(|| {
        ServingError::InputFormat("request body must be a JSON object".to_string())
    })?;

    let data = body.get("data").ok_or_else(|| {
        ServingError::InputFormat("missing required field 'data'".to_string())
    })?;

    let data = data
        .as_array()
        .ok_or_else(|| ServingError::InputFormat("field 'data' must be an array".to_string()))?;

    if data.len() != EXPECTED_FEATURES {
        return Err(ServingError::InputFormat(format!(
            "field 'data' must contain exactly {} values, received {}",
            EXPECTED_FEATURES,
            data.len()
        )));
    }

    data.iter()
        .enumerate()
        .map(|(i, v)| coerce_number(v, i))
        .collect()
}

fn error_response(err: &ServingError) -> Response {
    let status_code = err.status_code();
    if status_code >= 500 {
        error!(error = %err, "Request failed");
    } else {
        warn!(error = %err, status = status_code, "Request rejected");
    }

    let status =
        StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorBody::new(status_code, err.to_string()))).into_response()
}

/// Outermost boundary: a panic anywhere in request handling becomes a
/// structured 500, never an unstructured failure.
fn handle_panic(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    error!("Panic while handling request");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new(500, "internal server error")),
    )
        .into_response()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    model_type: String,
    features_used: usize,
    endpoints: Vec<String>,
    timestamp: i64,
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        model_type: state.model_type.clone(),
        features_used: EXPECTED_FEATURES,
        endpoints: state.registry.endpoint_names(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

/// GET /metrics
async fn metrics_snapshot(State(state): State<AppState>) -> Response {
    Json(state.metrics.snapshot()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_accepts_exact_contract() {
        let payload = json!({"data": vec![0.5; EXPECTED_FEATURES]});
        let data = validate_payload(&payload).unwrap();
        assert_eq!(data.len(), EXPECTED_FEATURES);
    }

    #[test]
    fn test_validate_names_missing_field() {
        let err = validate_payload(&json!({"values": [1, 2]})).unwrap_err();
        assert!(err.to_string().contains("'data'"));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_validate_names_wrong_type() {
        let err = validate_payload(&json!({"data": "not an array"})).unwrap_err();
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_validate_names_wrong_length() {
        let err = validate_payload(&json!({"data": [1.0, 2.0, 3.0]})).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exactly 50"));
        assert!(msg.contains("received 3"));
    }

    #[test]
    fn test_validate_names_non_numeric_entry() {
        let mut values = vec![json!(0.1); EXPECTED_FEATURES];
        values[7] = json!("x");

        let err = validate_payload(&json!({"data": values})).unwrap_err();
        assert!(err.to_string().contains("index 7"));
    }
}
