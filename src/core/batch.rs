//! Tensor type aliases shared by the processors and the inference engine.

/// A 3-D f32 tensor, used for `[batch, sequence, classes]` model output.
pub type Tensor3D = ndarray::Array3<f32>;

/// A 4-D f32 tensor, used for `[batch, channels, height, width]` model input.
pub type Tensor4D = ndarray::Array4<f32>;
