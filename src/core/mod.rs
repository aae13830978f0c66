//! The core module of the solving pipeline.
//!
//! This module contains the fundamental components shared by every stage:
//! - Tensor type aliases
//! - Configuration management
//! - Constants used throughout the pipeline
//! - Error handling
//! - ONNX Runtime inference engine
//! - Traits separating preprocessing and inference

pub mod batch;
pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;
pub mod traits;

pub use crate::utils::{init_tracing, load_image, load_images};
pub use batch::{Tensor3D, Tensor4D};
pub use config::{ConfigError, ConfigValidator, MonitorConfig, SolverConfig};
pub use constants::*;
pub use errors::{CaptchaError, CaptchaResult, ProcessingStage};
pub use inference::OrtInfer;
pub use traits::{InferenceEngine, Preprocessor};
