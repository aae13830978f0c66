//! Turning raw model logits into text.
//!
//! [`SequenceDecoder`] applies a softmax along the class axis and hands the
//! resulting probabilities to the [`Tokenizer`].

use super::tokenizer::{DecodedText, Tokenizer};
use crate::core::batch::Tensor3D;
use crate::core::errors::{CaptchaError, CaptchaResult};
use ndarray::Axis;

/// Softmax along the last axis, in place.
///
/// The row maximum is subtracted before exponentiation so large logits do not
/// overflow. A masked `-inf` logit gets probability 0. Rows containing NaN or
/// `+inf`, and rows that are entirely `-inf`, are left untouched for the
/// decoder to reject.
pub fn softmax_last_axis(logits: &mut Tensor3D) {
    for mut row in logits.lanes_mut(Axis(2)) {
        if row.iter().any(|v| v.is_nan() || *v == f32::INFINITY) {
            continue;
        }
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if max == f32::NEG_INFINITY {
            continue;
        }
        row.mapv_inplace(|v| (v - max).exp());
        let sum: f32 = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        }
    }
}

/// Decodes recognition logits into text with confidence.
#[derive(Debug, Clone, Default)]
pub struct SequenceDecoder {
    tokenizer: Tokenizer,
}

impl SequenceDecoder {
    /// Creates a decoder around `tokenizer`.
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    /// The tokenizer used for id-to-character mapping.
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Decodes every batch item of a `[batch, sequence, classes]` logit tensor.
    pub fn decode_batch(&self, logits: &Tensor3D) -> CaptchaResult<Vec<DecodedText>> {
        let mut probabilities = logits.clone();
        softmax_last_axis(&mut probabilities);
        self.tokenizer.decode(&probabilities)
    }

    /// Decodes a single-item logit tensor.
    pub fn decode(&self, logits: &Tensor3D) -> CaptchaResult<DecodedText> {
        let batch = logits.shape()[0];
        if batch != 1 {
            return Err(CaptchaError::decode_failure(
                0,
                format!("expected a batch of 1, got {batch}"),
            ));
        }
        self.decode_batch(logits)?
            .pop()
            .ok_or_else(|| CaptchaError::decode_failure(0, "decoder produced no result"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::tokenizer::Charset;
    use ndarray::{Array3, array};

    fn abc_decoder() -> SequenceDecoder {
        SequenceDecoder::new(Tokenizer::new(Charset::new("abc").unwrap()))
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let mut logits = array![[[1.0f32, 2.0, 3.0], [1000.0, 1000.0, -1000.0]]];
        softmax_last_axis(&mut logits);
        for row in logits.lanes(Axis(2)) {
            assert!((row.sum() - 1.0).abs() < 1e-6);
            assert!(row.iter().all(|p| p.is_finite()));
        }
        assert!(logits[[0, 0, 2]] > logits[[0, 0, 1]]);
        assert!((logits[[0, 1, 0]] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_logits() {
        let decoder = abc_decoder();
        let mut logits = Array3::<f32>::from_elem((1, 4, 4), -10.0);
        logits[[0, 0, 2]] = 10.0;
        logits[[0, 1, 3]] = 10.0;
        logits[[0, 2, 0]] = 10.0;
        logits[[0, 3, 1]] = 10.0;

        let decoded = decoder.decode(&logits).unwrap();
        assert_eq!(decoded.text, "bc");
        assert!(decoded.confidence > 0.99);
        assert_eq!(decoded.char_probabilities.len(), 2);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let decoder = abc_decoder();
        let logits = Array3::from_shape_fn((1, 6, 4), |(_, s, c)| ((s * 7 + c * 3) % 5) as f32);
        let first = decoder.decode(&logits).unwrap();
        for _ in 0..5 {
            assert_eq!(decoder.decode(&logits).unwrap(), first);
        }
    }

    #[test]
    fn test_decode_requires_single_item() {
        let decoder = abc_decoder();
        let logits = Array3::<f32>::zeros((2, 3, 4));
        assert!(matches!(
            decoder.decode(&logits),
            Err(CaptchaError::Decode { .. })
        ));
        assert_eq!(decoder.decode_batch(&logits).unwrap().len(), 2);
    }

    #[test]
    fn test_non_finite_logits_fail_decode() {
        let decoder = abc_decoder();
        for bad in [f32::INFINITY, f32::NAN] {
            let mut logits = Array3::<f32>::zeros((1, 2, 4));
            logits[[0, 0, 1]] = bad;
            assert!(matches!(
                decoder.decode(&logits),
                Err(CaptchaError::Decode { position: Some(0), .. })
            ));
        }

        let mut logits = Array3::<f32>::zeros((1, 2, 4));
        logits
            .slice_mut(ndarray::s![0, 0, ..])
            .fill(f32::NEG_INFINITY);
        assert!(matches!(
            decoder.decode(&logits),
            Err(CaptchaError::Decode { position: Some(0), .. })
        ));
    }

    #[test]
    fn test_masked_logits_decode_normally() {
        let decoder = abc_decoder();
        let logits = array![[
            [0.0f32, 5.0, 0.0, f32::NEG_INFINITY],
            [5.0, 0.0, 0.0, 0.0]
        ]];
        let decoded = decoder.decode(&logits).unwrap();
        assert_eq!(decoded.text, "a");
        assert!(decoded.confidence > 0.98);

        let mut probabilities = logits.clone();
        softmax_last_axis(&mut probabilities);
        assert_eq!(probabilities[[0, 0, 3]], 0.0);
        assert!((probabilities.slice(ndarray::s![0, 0, ..]).sum() - 1.0).abs() < 1e-6);
    }
}
