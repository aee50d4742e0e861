//! Input normalization: raw payload shapes to an aligned feature vector

use crate::error::{ServingError, ServingResult};
use serde_json::Value;
use tracing::warn;

/// The three raw payload shapes the scoring backend accepts, classified
/// once before any numeric coercion.
#[derive(Debug)]
pub enum RawPayload<'a> {
    /// Bare ordered numeric sequence
    Sequence(&'a [Value]),
    /// Object carrying the sequence in a `data` field
    DataObject(&'a [Value]),
    /// Arbitrary key/value mapping; values taken in document order.
    /// Permissive fallback, not a primary contract.
    Mapping(Vec<&'a Value>),
}

impl<'a> RawPayload<'a> {
    /// Classify a raw JSON payload into exactly one accepted shape.
    pub fn classify(raw: &'a Value) -> ServingResult<Self> {
        match raw {
            Value::Array(values) => Ok(RawPayload::Sequence(values.as_slice())),
            Value::Object(map) => {
                if let Some(data) = map.get("data") {
                    match data {
                        Value::Array(values) => Ok(RawPayload::DataObject(values.as_slice())),
                        other => Err(ServingError::InputFormat(format!(
                            "'data' field must be an array, got {}",
                            type_name(other)
                        ))),
                    }
                } else if map.is_empty() {
                    Err(ServingError::InputFormat(
                        "object payload has no usable values".to_string(),
                    ))
                } else {
                    Ok(RawPayload::Mapping(map.values().collect()))
                }
            }
            other => Err(ServingError::InputFormat(format!(
                "unsupported payload shape: {}",
                type_name(other)
            ))),
        }
    }
}

/// A feature vector coerced to exactly the model's expected width.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedInput {
    /// Feature values, exactly `expected` of them
    pub values: Vec<f64>,
    /// Length of the raw sequence before truncation/padding
    pub received: usize,
}

impl AlignedInput {
    /// Whether the truncate/pad shim had to change the input length.
    /// Callers flag these distinctly in telemetry.
    pub fn was_resized(&self) -> bool {
        self.received != self.values.len()
    }
}

/// Converts heterogeneous raw payloads into a fixed-length ordered feature
/// vector matching the model contract.
pub struct InputNormalizer;

impl InputNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize a raw payload to exactly `expected` features.
    ///
    /// Oversized inputs are truncated and undersized inputs right-padded
    /// with zeros; length drift alone never rejects a request. Only
    /// non-numeric content or a wholly unusable shape fails.
    pub fn normalize(&self, raw: &Value, expected: usize) -> ServingResult<AlignedInput> {
        let mut values = match RawPayload::classify(raw)? {
            RawPayload::Sequence(values) | RawPayload::DataObject(values) => values
                .iter()
                .enumerate()
                .map(|(i, v)| coerce_number(v, i))
                .collect::<ServingResult<Vec<f64>>>()?,
            RawPayload::Mapping(values) => values
                .into_iter()
                .enumerate()
                .map(|(i, v)| coerce_number(v, i))
                .collect::<ServingResult<Vec<f64>>>()?,
        };

        let received = values.len();
        if received > expected {
            warn!(
                received = received,
                expected = expected,
                "Truncating oversized feature vector"
            );
            values.truncate(expected);
        } else if received < expected {
            warn!(
                received = received,
                expected = expected,
                "Padding undersized feature vector with zeros"
            );
            values.resize(expected, 0.0);
        }

        Ok(AlignedInput { values, received })
    }
}

impl Default for InputNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Coerce one JSON value to a float: numbers directly, numeric strings by
/// parse, booleans as 1.0/0.0. Anything else names the offending entry.
pub fn coerce_number(value: &Value, index: usize) -> ServingResult<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            ServingError::InputFormat(format!("value {} at index {} is not a finite number", n, index))
        }),
        Value::String(s) => match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            Ok(_) => Err(ServingError::InputFormat(format!(
                "value \"{}\" at index {} is not a finite number",
                s, index
            ))),
            Err(_) => Err(ServingError::InputFormat(format!(
                "value \"{}\" at index {} is not numeric",
                s, index
            ))),
        },
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(ServingError::InputFormat(format!(
            "value at index {} is not numeric ({})",
            index,
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
