//! Configuration error types and validation traits.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The configuration file could not be read.
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for the expected schema.
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A trait for validating configuration parameters.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Validates that image dimensions are positive.
    fn validate_image_dimensions(&self, width: usize, height: usize) -> Result<(), ConfigError> {
        if width == 0 || height == 0 {
            Err(ConfigError::InvalidConfig {
                message: "Image dimensions must be positive".to_string(),
            })
        } else if u32::try_from(width).is_err() || u32::try_from(height).is_err() {
            Err(ConfigError::InvalidConfig {
                message: format!("Image dimensions {width}x{height} exceed the u32 pixel range"),
            })
        } else {
            Ok(())
        }
    }

    /// Validates that a confidence threshold lies in [0.0, 1.0].
    fn validate_confidence_threshold(&self, threshold: f32) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&threshold) {
            Err(ConfigError::InvalidConfig {
                message: format!(
                    "Confidence threshold must be between 0.0 and 1.0, got {}",
                    threshold
                ),
            })
        } else {
            Ok(())
        }
    }

    /// Validates that a pool or thread count is non-zero.
    fn validate_positive_count(&self, name: &str, count: usize) -> Result<(), ConfigError> {
        if count == 0 {
            Err(ConfigError::InvalidConfig {
                message: format!("{name} must be greater than 0"),
            })
        } else {
            Ok(())
        }
    }
}
