//! ONNX Runtime inference engine with a round-robin session pool.

use crate::core::{
    batch::{Tensor3D, Tensor4D},
    errors::{CaptchaError, CaptchaResult},
    traits::InferenceEngine,
};
use ort::{session::Session, value::ValueType};
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;

#[path = "ort_infer_builders.rs"]
mod ort_infer_builders;
#[path = "ort_infer_config.rs"]
mod ort_infer_config;
#[path = "ort_infer_execution.rs"]
mod ort_infer_execution;
#[cfg(test)]
#[path = "ort_infer_tests.rs"]
mod ort_infer_tests;

pub struct OrtInfer {
    pub(super) sessions: Vec<Mutex<Session>>,
    pub(super) next_idx: AtomicUsize,
    pub(super) input_name: String,
    pub(super) output_name: String,
    pub(super) model_path: std::path::PathBuf,
    pub(super) model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("sessions", &self.sessions.len())
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OrtInfer {
    /// Attempts to retrieve the primary input tensor shape from the first session.
    ///
    /// Dynamic dimensions (e.g., -1) are returned as-is.
    pub fn primary_input_shape(&self) -> Option<Vec<i64>> {
        let session_mutex = self.sessions.first()?;
        let session_guard = session_mutex.lock().ok()?;
        let input = session_guard
            .inputs
            .iter()
            .find(|input| input.name == self.input_name)?;
        match &input.input_type {
            ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
            _ => None,
        }
    }

    /// Attempts to retrieve the shape of the output tensor read by inference.
    pub fn primary_output_shape(&self) -> Option<Vec<i64>> {
        let session_guard = self.sessions.first()?.lock().ok()?;
        let output = session_guard
            .outputs
            .iter()
            .find(|output| output.name == self.output_name)?;
        match &output.output_type {
            ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
            _ => None,
        }
    }

    /// Number of sessions in the pool.
    pub fn pool_size(&self) -> usize {
        self.sessions.len()
    }
}

impl InferenceEngine for OrtInfer {
    fn infer(&self, input: &Tensor4D) -> CaptchaResult<Tensor3D> {
        self.infer_3d(input)
    }

    fn engine_info(&self) -> String {
        format!(
            "onnxruntime model '{}' ({} session{}, {} -> {})",
            self.model_name,
            self.sessions.len(),
            if self.sessions.len() == 1 { "" } else { "s" },
            self.input_name,
            self.output_name
        )
    }

    fn declared_input_shape(&self) -> Option<Vec<i64>> {
        self.primary_input_shape()
    }

    fn declared_output_shape(&self) -> Option<Vec<i64>> {
        self.primary_output_shape()
    }
}

/// Checks a `[C, H, W]` shape against a declared `[N, C, H, W]` input shape.
///
/// Non-positive declared dimensions are dynamic and match anything.
pub(crate) fn input_shape_compatible(declared: &[i64], expected: [usize; 3]) -> bool {
    declared.len() == 4
        && declared[1..]
            .iter()
            .zip(expected)
            .all(|(&d, e)| d <= 0 || d as usize == e)
}

