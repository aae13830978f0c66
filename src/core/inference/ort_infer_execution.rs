use super::*;
use crate::core::errors::SimpleError;
use ndarray::ArrayView3;
use ort::value::TensorRef;
use std::sync::atomic::Ordering;

impl OrtInfer {
    /// Returns the model path associated with this inference engine.
    pub fn model_path(&self) -> &std::path::Path {
        &self.model_path
    }

    /// Returns the model name associated with this inference engine.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Returns the name of the input tensor fed by [`OrtInfer::infer_3d`].
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Returns the name of the output tensor read by [`OrtInfer::infer_3d`].
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    fn run_inference_with_processor<T>(
        &self,
        x: &Tensor4D,
        processor: impl FnOnce(&[i64], &[f32]) -> CaptchaResult<T>,
    ) -> CaptchaResult<T> {
        let input_shape = x.shape().to_vec();

        let input_tensor = TensorRef::from_array_view(x.view()).map_err(|e| {
            CaptchaError::inference_error(
                &self.model_name,
                &format!("Failed to convert input tensor with shape {:?}", input_shape),
                e,
            )
        })?;

        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let idx = self.next_idx.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session_guard = self.sessions[idx].lock().map_err(|_| {
            CaptchaError::inference_error(
                &self.model_name,
                &format!(
                    "Failed to acquire session lock for session {}/{}",
                    idx,
                    self.sessions.len()
                ),
                SimpleError::new("Session lock poisoned"),
            )
        })?;

        let outputs = session_guard.run(inputs).map_err(|e| {
            CaptchaError::inference_error(
                &self.model_name,
                &format!(
                    "forward pass failed for input '{}' with shape {:?}",
                    self.input_name, input_shape
                ),
                e,
            )
        })?;

        // The output name was validated against the graph when the engine was built.
        let output = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                CaptchaError::inference_error(
                    &self.model_name,
                    &format!("Failed to extract output tensor '{}' as f32", self.output_name),
                    e,
                )
            })?;
        let (output_shape, output_data) = output;

        processor(output_shape, output_data)
    }

    /// Runs the model and returns its `[batch, sequence, classes]` output.
    pub fn infer_3d(&self, x: &Tensor4D) -> CaptchaResult<Tensor3D> {
        let span = tracing::debug_span!("infer", model = %self.model_name);
        let _guard = span.enter();

        let result = self.run_inference_with_processor(x, |output_shape, output_data| {
            if output_shape.len() != 3 || output_shape.iter().any(|&d| d < 0) {
                return Err(CaptchaError::tensor_operation_error(
                    "output_validation",
                    &[3],
                    &[output_shape.len()],
                    &format!(
                        "Model '{}': expected a 3D output tensor, got shape {:?}",
                        self.model_name, output_shape
                    ),
                    SimpleError::new("Invalid output tensor dimensions"),
                ));
            }

            let batch_size_out = output_shape[0] as usize;
            let seq_len = output_shape[1] as usize;
            let num_classes = output_shape[2] as usize;
            let expected_len = batch_size_out * seq_len * num_classes;

            if output_data.len() != expected_len {
                return Err(CaptchaError::tensor_operation_error(
                    "output_data_validation",
                    &[expected_len],
                    &[output_data.len()],
                    &format!(
                        "Model '{}': output data size mismatch for shape {:?}",
                        self.model_name, output_shape
                    ),
                    SimpleError::new("Output tensor data size mismatch"),
                ));
            }

            let array_view =
                ArrayView3::from_shape((batch_size_out, seq_len, num_classes), output_data)?;
            Ok(array_view.to_owned())
        })?;

        tracing::debug!(input = ?x.shape(), output = ?result.shape(), "inference complete");
        Ok(result)
    }
}
