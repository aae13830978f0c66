//! Error constructor utilities for the solving pipeline.
//!
//! These helpers build `CaptchaError` values with consistent context strings so
//! call sites stay short.

use super::types::{CaptchaError, ProcessingStage};

impl CaptchaError {
    /// Creates a processing error tagged with the given stage.
    pub fn processing_error(
        kind: ProcessingStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for an image that cannot enter the pipeline.
    pub fn unsupported_image(message: impl Into<String>) -> Self {
        Self::UnsupportedImage {
            message: message.into(),
        }
    }

    /// Creates an error for invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates a configuration error naming the field, its value and the reason.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::ConfigError {
            message: format!("field '{field}' with value '{value}': {reason}"),
        }
    }

    /// Creates an inference error with model context.
    pub fn inference_error(
        model_name: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for a model that cannot be used, with an optional suggestion.
    ///
    /// # Arguments
    /// * `model_path` - Path to the model file
    /// * `reason` - Short reason description
    /// * `suggestion` - Optional suggestion message (without punctuation)
    /// * `source` - Optional underlying error
    pub fn model_unavailable(
        model_path: impl AsRef<std::path::Path>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        let suggestion = suggestion
            .map(|s| format!("; suggested fix: {s}"))
            .unwrap_or_default();
        Self::ModelUnavailable {
            model_path: model_path.as_ref().display().to_string(),
            reason: reason.into(),
            suggestion,
            source: source.map(|e| Box::new(e) as _),
        }
    }

    /// Creates a decode error for a batch item.
    pub fn decode_failure(batch_index: usize, context: impl Into<String>) -> Self {
        Self::Decode {
            batch_index,
            position: None,
            context: context.into(),
        }
    }

    /// Creates a decode error pinned to a sequence position.
    pub fn decode_failure_at(
        batch_index: usize,
        position: usize,
        context: impl Into<String>,
    ) -> Self {
        Self::Decode {
            batch_index,
            position: Some(position),
            context: context.into(),
        }
    }

    /// Creates an error for tensor operations with detailed shape information.
    pub fn tensor_operation_error(
        operation: &str,
        expected_shape: &[usize],
        actual_shape: &[usize],
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::TensorOperation {
            operation: operation.to_string(),
            expected_shape: expected_shape.to_vec(),
            actual_shape: actual_shape.to_vec(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates a monitor state error.
    pub fn monitor_error(message: impl Into<String>) -> Self {
        Self::Monitor {
            message: message.into(),
        }
    }
}
