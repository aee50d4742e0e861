//! Configuration management for the prediction serving service

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub endpoint: EndpointConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Model artifacts configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory containing the trained model artifacts
    pub dir: String,
    /// ONNX classifier file name
    #[serde(default = "default_classifier_file")]
    pub classifier_file: String,
    /// Scaler parameters file name (JSON with "mean" and "scale" arrays)
    #[serde(default = "default_scaler_file")]
    pub scaler_file: String,
    /// Selected feature list file name (JSON array of names)
    #[serde(default = "default_features_file")]
    pub features_file: String,
    /// Human-readable model kind reported in responses
    #[serde(default = "default_model_type")]
    pub model_type: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

/// Backend endpoint resolution configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Explicit endpoint name; when unset, discovery scans registered
    /// instances for the marker substring
    #[serde(default)]
    pub name: Option<String>,
    /// Substring that identifies this service's endpoints during discovery
    #[serde(default = "default_marker")]
    pub marker: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_classifier_file() -> String {
    "classifier.onnx".to_string()
}

fn default_scaler_file() -> String {
    "scaler.json".to_string()
}

fn default_features_file() -> String {
    "selected_features.json".to_string()
}

fn default_model_type() -> String {
    "MLPClassifier".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

fn default_marker() -> String {
    "bankruptcy-predictor".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            artifacts: ArtifactsConfig {
                dir: "artifacts".to_string(),
                classifier_file: default_classifier_file(),
                scaler_file: default_scaler_file(),
                features_file: default_features_file(),
                model_type: default_model_type(),
                onnx_threads: 1,
            },
            endpoint: EndpointConfig {
                name: None,
                marker: default_marker(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.artifacts.classifier_file, "classifier.onnx");
        assert_eq!(config.artifacts.model_type, "MLPClassifier");
        assert_eq!(config.endpoint.marker, "bankruptcy-predictor");
        assert!(config.endpoint.name.is_none());
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load_from_path("config/does_not_exist.toml").is_err());
    }
}
