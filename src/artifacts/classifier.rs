//! Classifier capability trait and its ONNX Runtime implementation

use crate::error::{ServingError, ServingResult};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Capability set exposed by a trained binary classifier.
///
/// Any model implementing this is substitutable behind the artifact bundle,
/// including fixed-probability test doubles.
pub trait ClassifierModel: Send + Sync {
    /// Input width the model was trained with, when statically known.
    fn input_width(&self) -> Option<usize>;

    /// Discrete class label for one scaled feature row.
    fn classify(&self, scaled: &[f64]) -> ServingResult<u8>;

    /// Class probabilities `(not_bankrupt, bankrupt)`, summing to 1.0.
    fn classify_probabilities(&self, scaled: &[f64]) -> ServingResult<(f64, f64)>;
}

/// Classifier backed by an ONNX Runtime session.
pub struct OnnxClassifier {
    /// Session requires `&mut` to run, so it sits behind a lock; the rest
    /// of the bundle stays lock-free.
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    input_width: Option<usize>,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("input_width", &self.input_width)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Load the classifier from an ONNX file.
    pub fn load<P: AsRef<Path>>(path: P, onnx_threads: usize) -> ServingResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ServingError::ArtifactLoad(format!(
                "classifier not found at {}",
                path.display()
            )));
        }

        ort::init()
            .commit()
            .map_err(|e| ServingError::ArtifactLoad(format!("ONNX Runtime init: {}", e)))?;

        info!(path = %path.display(), threads = onnx_threads, "Loading ONNX classifier");

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(onnx_threads))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| {
                ServingError::ArtifactLoad(format!(
                    "failed to load classifier from {}: {}",
                    path.display(),
                    e
                ))
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("output"))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| {
                session
                    .outputs
                    .last()
                    .map(|o| o.name.clone())
                    .unwrap_or_else(|| "probabilities".to_string())
            });

        let input_width = session.inputs.first().and_then(|i| match &i.input_type {
            ort::value::ValueType::Tensor { shape, .. } => shape
                .last()
                .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
            _ => None,
        });

        info!(
            input = %input_name,
            output = %output_name,
            input_width = ?input_width,
            "Classifier loaded successfully"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            input_width,
        })
    }

    /// Run the session once, returning the label output (when present) and
    /// both class probabilities.
    fn run(&self, scaled: &[f64]) -> ServingResult<(Option<i64>, (f64, f64))> {
        use ort::value::Tensor;

        let features: Vec<f32> = scaled.iter().map(|&x| x as f32).collect();
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features))
            .map_err(|e| ServingError::Scoring(format!("failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ServingError::Scoring(format!("session lock poisoned: {}", e)))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_tensor])
            .map_err(|e| ServingError::Scoring(format!("inference failed: {}", e)))?;

        let label = extract_label(&outputs);
        let probabilities = extract_probabilities(&outputs, &self.output_name)?;

        Ok((label, probabilities))
    }
}

impl ClassifierModel for OnnxClassifier {
    fn input_width(&self) -> Option<usize> {
        self.input_width
    }

    fn classify(&self, scaled: &[f64]) -> ServingResult<u8> {
        let (label, (p0, p1)) = self.run(scaled)?;
        match label {
            Some(l) => Ok((l != 0) as u8),
            None => Ok((p1 > p0) as u8),
        }
    }

    fn classify_probabilities(&self, scaled: &[f64]) -> ServingResult<(f64, f64)> {
        let (_, probabilities) = self.run(scaled)?;
        Ok(probabilities)
    }
}

/// Extract the discrete label from the output named like "label", if any.
fn extract_label(outputs: &ort::session::SessionOutputs) -> Option<i64> {
    for (name, output) in outputs.iter() {
        if !name.contains("label") {
            continue;
        }
        if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
            return data.first().copied();
        }
    }
    None
}

/// Extract both class probabilities from the model output.
///
/// Handles tensor outputs as well as the seq(map(int64, float)) format that
/// scikit-learn's ZipMap export produces.
fn extract_probabilities(
    outputs: &ort::session::SessionOutputs,
    output_name: &str,
) -> ServingResult<(f64, f64)> {
    if let Some(output) = outputs.get(output_name) {
        let dtype = output.dtype();

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            return probabilities_from_tensor(&shape, data);
        }

        if DynSequenceValueType::can_downcast(&dtype) {
            if let Ok(probs) = probabilities_from_sequence_map(output) {
                return Ok(probs);
            }
        }
    }

    // Fallback: iterate all outputs, skipping the label
    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }

        let dtype = output.dtype();

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            return probabilities_from_tensor(&shape, data);
        }

        if DynSequenceValueType::can_downcast(&dtype) {
            if let Ok(probs) = probabilities_from_sequence_map(&output) {
                return Ok(probs);
            }
        }
    }

    Err(ServingError::Scoring(
        "could not extract class probabilities from model output".to_string(),
    ))
}

/// Read `(p0, p1)` from a probability tensor of shape [1, 2], [2], or a
/// single-value bankrupt-class output.
fn probabilities_from_tensor(shape: &ort::tensor::Shape, data: &[f32]) -> ServingResult<(f64, f64)> {
    let dims: Vec<i64> = shape.iter().copied().collect();
    let width = *dims.last().unwrap_or(&0) as usize;

    if width >= 2 && data.len() >= 2 {
        debug!(p0 = data[0], p1 = data[1], "Extracted probabilities from tensor");
        return Ok((data[0] as f64, data[1] as f64));
    }

    if width == 1 || data.len() == 1 {
        let p1 = data[0] as f64;
        return Ok((1.0 - p1, p1));
    }

    Err(ServingError::Scoring(format!(
        "unexpected probability tensor shape {:?}",
        dims
    )))
}

/// Read `(p0, p1)` from the seq(map(int64, float)) ZipMap format.
fn probabilities_from_sequence_map(output: &ort::value::DynValue) -> ServingResult<(f64, f64)> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| ServingError::Scoring(format!("failed to downcast to sequence: {}", e)))?;

    let maps = sequence
        .try_extract_sequence::<DynMapValueType>(&allocator)
        .map_err(|e| ServingError::Scoring(format!("failed to extract sequence: {}", e)))?;

    let map_value = maps
        .first()
        .ok_or_else(|| ServingError::Scoring("empty probability sequence".to_string()))?;

    let kv_pairs = map_value
        .try_extract_key_values::<i64, f32>()
        .map_err(|e| ServingError::Scoring(format!("failed to extract map entries: {}", e)))?;

    let mut p0 = None;
    let mut p1 = None;
    for (class_id, prob) in &kv_pairs {
        match class_id {
            0 => p0 = Some(*prob as f64),
            1 => p1 = Some(*prob as f64),
            _ => {}
        }
    }

    match (p0, p1) {
        (Some(p0), Some(p1)) => Ok((p0, p1)),
        (None, Some(p1)) => Ok((1.0 - p1, p1)),
        (Some(p0), None) => Ok((p0, 1.0 - p0)),
        (None, None) => Err(ServingError::Scoring(
            "no class probabilities in map output".to_string(),
        )),
    }
}
