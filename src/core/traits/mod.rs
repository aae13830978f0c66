//! Traits separating the stages of the solving pipeline.
//!
//! ```text
//! ┌─────────────┐    ┌─────────────────┐    ┌─────────┐
//! │Preprocessor │───▶│InferenceEngine  │───▶│ Decoder │
//! │• preprocess │    │• infer          │    │         │
//! └─────────────┘    │• engine_info    │    └─────────┘
//!                    └─────────────────┘
//! ```
//!
//! The solver is generic over its [`InferenceEngine`], so the ONNX Runtime
//! engine can be replaced, for example by a scripted engine in tests.

use crate::core::batch::{Tensor3D, Tensor4D};
use crate::core::errors::CaptchaResult;
use image::DynamicImage;
use std::fmt::Debug;

/// Trait for turning an image into a model input tensor.
pub trait Preprocessor: Send + Sync + Debug {
    /// Converts one image into a `[1, C, H, W]` tensor.
    fn preprocess(&self, image: &DynamicImage) -> CaptchaResult<Tensor4D>;

    /// The `[C, H, W]` shape every output tensor has.
    fn output_shape(&self) -> [usize; 3];

    /// Human readable description used in logs.
    fn preprocessing_info(&self) -> String;
}

/// Trait for model inference.
///
/// Implementations map a `[batch, C, H, W]` tensor to `[batch, sequence, classes]`
/// logits and must be deterministic for a given input.
pub trait InferenceEngine: Send + Sync + Debug {
    /// Perform inference on a preprocessed tensor.
    fn infer(&self, input: &Tensor4D) -> CaptchaResult<Tensor3D>;

    /// String describing the inference engine (model name, backend).
    fn engine_info(&self) -> String;

    /// The declared input shape, with `-1` for dynamic dimensions, if known.
    fn declared_input_shape(&self) -> Option<Vec<i64>> {
        None
    }

    /// The declared output shape, with `-1` for dynamic dimensions, if known.
    fn declared_output_shape(&self) -> Option<Vec<i64>> {
        None
    }
}
