//! ONNX Runtime inference for recognition models.
//!
//! [`OrtInfer`] owns a pool of sessions and implements
//! [`InferenceEngine`](crate::core::traits::InferenceEngine) so the solver can
//! drive it like any other engine.

pub mod ort_infer;

pub use ort_infer::OrtInfer;
