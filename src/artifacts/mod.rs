//! Trained model artifacts: classifier, scaler, selected feature list

pub mod bundle;
pub mod classifier;
pub mod scaler;

pub use bundle::ArtifactBundle;
pub use classifier::{ClassifierModel, OnnxClassifier};
pub use scaler::ScalingParameters;
