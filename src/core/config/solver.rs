//! Solver and monitor configuration.
//!
//! Both structs deserialize from JSON with every field optional; missing fields
//! take the defaults from [`crate::core::constants`].

use super::errors::{ConfigError, ConfigValidator};
use super::onnx::OrtSessionConfig;
use crate::core::constants::{
    DEFAULT_CHARSET, DEFAULT_ERROR_BACKOFF, DEFAULT_INPUT_SHAPE, DEFAULT_PARALLEL_THRESHOLD,
    DEFAULT_POLL_INTERVAL,
};
use crate::processors::ConfidenceReduction;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for [`crate::pipeline::CaptchaSolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Path to the ONNX recognition model.
    pub model_path: PathBuf,
    /// Name used in logs and errors; defaults to the model file stem.
    pub model_name: Option<String>,
    /// Name of the model input; defaults to the first declared input.
    pub input_name: Option<String>,
    /// Name of the model output; defaults to the first declared output.
    pub output_name: Option<String>,
    /// Model input shape as (channels, height, width).
    pub input_shape: [usize; 3],
    /// Recognizable characters, in token-id order.
    pub charset: String,
    /// Number of ONNX sessions kept for concurrent callers.
    pub session_pool_size: usize,
    /// ONNX Runtime session options.
    pub ort_session: Option<OrtSessionConfig>,
    /// How per-character probabilities combine into a confidence.
    pub confidence_reduction: ConfidenceReduction,
    /// Results below this confidence are rejected.
    pub min_confidence: Option<f32>,
    /// Batches larger than this are solved in parallel.
    pub parallel_threshold: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("captcha.onnx"),
            model_name: None,
            input_name: None,
            output_name: None,
            input_shape: DEFAULT_INPUT_SHAPE,
            charset: DEFAULT_CHARSET.to_string(),
            session_pool_size: 1,
            ort_session: None,
            confidence_reduction: ConfidenceReduction::default(),
            min_confidence: None,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl SolverConfig {
    /// Creates a configuration for the given model with defaults elsewhere.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            ..Self::default()
        }
    }

    /// Reads a configuration from a JSON file.
    ///
    /// Relative model paths are resolved against the directory of the file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if config.model_path.is_relative()
            && let Some(dir) = path.parent()
        {
            config.model_path = dir.join(&config.model_path);
        }
        Ok(config)
    }

    /// Target height and width of the preprocessed image.
    ///
    /// Dimensions outside the `u32` range saturate; `validate` rejects them.
    pub fn target_size(&self) -> (u32, u32) {
        let to_pixels = |d: usize| u32::try_from(d).unwrap_or(u32::MAX);
        (to_pixels(self.input_shape[1]), to_pixels(self.input_shape[2]))
    }

    /// The model name, falling back to the file stem.
    pub fn resolved_model_name(&self) -> String {
        self.model_name
            .clone()
            .or_else(|| {
                self.model_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| crate::core::constants::DEFAULT_MODEL_NAME.to_string())
    }
}

impl ConfigValidator for SolverConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.input_shape[0] != 3 {
            return Err(ConfigError::InvalidConfig {
                message: format!(
                    "input_shape must have 3 channels, got {}",
                    self.input_shape[0]
                ),
            });
        }
        self.validate_image_dimensions(self.input_shape[2], self.input_shape[1])?;
        if self.charset.is_empty() {
            return Err(ConfigError::InvalidConfig {
                message: "charset must not be empty".to_string(),
            });
        }
        self.validate_positive_count("session_pool_size", self.session_pool_size)?;
        self.validate_positive_count("parallel_threshold", self.parallel_threshold)?;
        if let Some(threshold) = self.min_confidence {
            self.validate_confidence_threshold(threshold)?;
        }
        Ok(())
    }
}

/// Configuration for [`crate::pipeline::Monitor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Milliseconds between polls of the image source.
    pub poll_interval_ms: u64,
    /// Milliseconds to wait after the image source reports an error.
    pub error_backoff_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            error_backoff_ms: DEFAULT_ERROR_BACKOFF.as_millis() as u64,
        }
    }
}

impl MonitorConfig {
    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Sets the error backoff.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// The poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The error backoff as a `Duration`.
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

impl ConfigValidator for MonitorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "poll_interval_ms must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_model_contract() {
        let config = SolverConfig::default();
        assert_eq!(config.input_shape, [3, 32, 128]);
        assert_eq!(config.target_size(), (32, 128));
        assert_eq!(config.charset.chars().count(), 94);
        assert_eq!(config.session_pool_size, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SolverConfig::default();
        config.min_confidence = Some(1.5);
        assert!(config.validate().is_err());

        let mut config = SolverConfig::default();
        config.input_shape = [1, 32, 128];
        assert!(config.validate().is_err());

        let mut config = SolverConfig::default();
        config.charset.clear();
        assert!(config.validate().is_err());

        let mut config = SolverConfig::default();
        config.session_pool_size = 0;
        assert!(config.validate().is_err());

        let mut config = SolverConfig::default();
        config.input_shape = [3, 32, u32::MAX as usize + 1];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_resolved_model_name() {
        let config = SolverConfig::new("models/parseq_captcha.onnx");
        assert_eq!(config.resolved_model_name(), "parseq_captcha");

        let mut config = SolverConfig::new("models/parseq_captcha.onnx");
        config.model_name = Some("custom".to_string());
        assert_eq!(config.resolved_model_name(), "custom");
    }

    #[test]
    fn test_from_json_file_resolves_relative_model_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"model_path": "captcha.onnx", "min_confidence": 0.25, "session_pool_size": 2}}"#
        )
        .unwrap();

        let config = SolverConfig::from_json_file(&path).unwrap();
        assert_eq!(config.model_path, dir.path().join("captcha.onnx"));
        assert_eq!(config.min_confidence, Some(0.25));
        assert_eq!(config.session_pool_size, 2);
        assert_eq!(config.input_shape, DEFAULT_INPUT_SHAPE);
    }

    #[test]
    fn test_from_json_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = SolverConfig::from_json_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(
            SolverConfig::from_json_file(&bad),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_monitor_config_durations() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.error_backoff(), Duration::from_secs(2));

        let config = config.with_poll_interval(Duration::from_millis(50));
        assert_eq!(config.poll_interval_ms, 50);
        assert!(config.validate().is_ok());
        assert!(MonitorConfig::default()
            .with_poll_interval(Duration::ZERO)
            .validate()
            .is_err());
    }
}
