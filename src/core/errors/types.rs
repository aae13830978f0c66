//! Core error types for the CAPTCHA solving pipeline.
//!
//! This module defines the `CaptchaError` enum shared by every stage of the
//! pipeline together with the `ProcessingStage` tag used to locate failures
//! inside preprocessing and post-processing.

use thiserror::Error;

/// Enum representing different stages of processing in the solving pipeline.
///
/// This enum is used to identify which stage of the pipeline an error occurred in,
/// providing context for debugging and error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred while cropping a region out of a larger image.
    Cropping,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Cropping => write!(f, "cropping"),
        }
    }
}

/// A plain message error used as the `source` of wrapped failures that have
/// no underlying library error.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SimpleError(String);

impl SimpleError {
    /// Creates a new message error.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Enum representing the errors that can occur while solving a CAPTCHA.
///
/// `ModelUnavailable` and `ConfigError` are startup failures: they are returned
/// while the solver is being built and no solver exists afterwards. The
/// remaining variants describe a single failed request.
#[derive(Error, Debug)]
pub enum CaptchaError {
    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// The image cannot be processed (for example it has a zero dimension).
    #[error("unsupported image: {message}")]
    UnsupportedImage {
        /// Why the image was rejected.
        message: String,
    },

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The model artifact is missing, unreadable, or structurally invalid.
    #[error("model unavailable at '{model_path}': {reason}{suggestion}")]
    ModelUnavailable {
        /// Path to the model that failed to load
        model_path: String,
        /// Short reason string
        reason: String,
        /// Optional suggestion (prefixed with '; ' when present)
        suggestion: String,
        /// Underlying source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The scoring function raised an error while running.
    #[error("inference failed in model '{model_name}': {context}")]
    Inference {
        /// The name of the model where inference failed.
        model_name: String,
        /// Additional context about the inference error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The probability matrix could not be turned into text.
    #[error("decode failed for batch[{batch_index}]: {context}")]
    Decode {
        /// Index of the batch item being decoded.
        batch_index: usize,
        /// Sequence position that triggered the failure, if any.
        position: Option<usize>,
        /// Description of the violated expectation.
        context: String,
    },

    /// A character could not be mapped to a token id.
    #[error("character {character:?} at position {position} is not in the charset")]
    UnknownCharacter {
        /// The offending character.
        character: char,
        /// Its index in the encoded string.
        position: usize,
    },

    /// The decoded text scored below the configured confidence floor.
    #[error("low confidence: '{text}' scored {confidence:.4}, below {threshold:.4}")]
    LowConfidence {
        /// The decoded text that was rejected.
        text: String,
        /// Its confidence.
        confidence: f32,
        /// The configured minimum.
        threshold: f32,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error raised by the background monitor's state machine.
    #[error("monitor: {message}")]
    Monitor {
        /// What went wrong.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations with detailed context.
    #[error(
        "tensor operation '{operation}' failed: expected shape {expected_shape:?}, got {actual_shape:?} in {context}"
    )]
    TensorOperation {
        /// The tensor operation that failed.
        operation: String,
        /// The expected tensor shape.
        expected_shape: Vec<usize>,
        /// The actual tensor shape.
        actual_shape: Vec<usize>,
        /// Additional context about where the error occurred.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error from basic tensor operations (fallback for ndarray errors).
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for CaptchaError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for CaptchaError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

impl CaptchaError {
    /// Returns true for errors that only affect the request that produced them.
    ///
    /// Startup failures (`ModelUnavailable`, `ConfigError`) and I/O errors are
    /// not per-request.
    pub fn is_per_request(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedImage { .. }
                | Self::Processing { .. }
                | Self::Inference { .. }
                | Self::Decode { .. }
                | Self::LowConfidence { .. }
                | Self::Session(_)
                | Self::TensorOperation { .. }
                | Self::Tensor(_)
        )
    }

    /// Returns true when the error means no usable model could be loaded.
    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, Self::ModelUnavailable { .. })
    }
}
