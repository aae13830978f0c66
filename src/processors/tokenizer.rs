//! Character set and token mapping for sequence recognition models.
//!
//! Token layout for a charset of `n` characters:
//!
//! | id        | meaning                         |
//! |-----------|---------------------------------|
//! | `0`       | END                             |
//! | `1..=n`   | charset character `id - 1`      |
//! | `n + 1`   | START                           |
//! | `n + 2`   | PAD                             |
//!
//! Recognition heads only predict END and the characters, so their class axis
//! has `n + 1` entries. The decoder also accepts the full `n + 3` vocabulary.

use crate::core::batch::Tensor3D;
use crate::core::constants::DEFAULT_CHARSET;
use crate::core::errors::{CaptchaError, CaptchaResult};
use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token id of the END marker.
pub const END_TOKEN: usize = 0;

/// An ordered set of unique characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    chars: Vec<char>,
    index: HashMap<char, usize>,
}

impl Charset {
    /// Builds a charset from a string, rejecting empty input and repeated characters.
    pub fn new(characters: &str) -> CaptchaResult<Self> {
        if characters.is_empty() {
            return Err(CaptchaError::config_error("charset must not be empty"));
        }
        let chars: Vec<char> = characters.chars().collect();
        let mut index = HashMap::with_capacity(chars.len());
        for (i, &c) in chars.iter().enumerate() {
            if let Some(first) = index.insert(c, i) {
                return Err(CaptchaError::config_error_with_context(
                    "charset",
                    characters,
                    &format!("character {c:?} appears at positions {first} and {i}"),
                ));
            }
        }
        Ok(Self { chars, index })
    }

    /// Number of characters.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Always false; construction rejects empty charsets.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Character at `position`.
    pub fn get(&self, position: usize) -> Option<char> {
        self.chars.get(position).copied()
    }

    /// Position of `c`, if present.
    pub fn position(&self, c: char) -> Option<usize> {
        self.index.get(&c).copied()
    }

    /// The characters in order.
    pub fn chars(&self) -> &[char] {
        &self.chars
    }
}

impl Default for Charset {
    fn default() -> Self {
        let chars: Vec<char> = DEFAULT_CHARSET.chars().collect();
        let index = chars.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        Self { chars, index }
    }
}

/// How per-character probabilities are combined into one confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceReduction {
    /// Product of the probabilities.
    #[default]
    Product,
    /// Geometric mean, which does not penalize long strings.
    GeometricMean,
    /// Arithmetic mean.
    Mean,
}

impl ConfidenceReduction {
    /// Reduces `probabilities` to a single score. Empty input scores 0.0.
    pub fn reduce(self, probabilities: &[f32]) -> f32 {
        if probabilities.is_empty() {
            return 0.0;
        }
        match self {
            Self::Product => probabilities.iter().product(),
            Self::GeometricMean => {
                if probabilities.iter().any(|&p| p <= 0.0) {
                    return 0.0;
                }
                let log_sum: f32 = probabilities.iter().map(|p| p.ln()).sum();
                (log_sum / probabilities.len() as f32).exp()
            }
            Self::Mean => probabilities.iter().sum::<f32>() / probabilities.len() as f32,
        }
    }
}

/// Text decoded from one batch item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedText {
    /// The recognized string, END excluded.
    pub text: String,
    /// Reduction of `char_probabilities`; 0.0 when `text` is empty.
    pub confidence: f32,
    /// Max probability at each emitted character position.
    pub char_probabilities: Vec<f32>,
    /// Probability of the END token, when the sequence was terminated by END.
    pub end_probability: Option<f32>,
}

/// Maps between characters and token ids.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    charset: Charset,
    reduction: ConfidenceReduction,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(Charset::default())
    }
}

impl Tokenizer {
    /// Creates a tokenizer using the product confidence reduction.
    pub fn new(charset: Charset) -> Self {
        Self {
            charset,
            reduction: ConfidenceReduction::default(),
        }
    }

    /// Sets the confidence reduction.
    pub fn with_reduction(mut self, reduction: ConfidenceReduction) -> Self {
        self.reduction = reduction;
        self
    }

    /// The charset.
    pub fn charset(&self) -> &Charset {
        &self.charset
    }

    /// The confidence reduction.
    pub fn reduction(&self) -> ConfidenceReduction {
        self.reduction
    }

    /// Id of the END token.
    pub fn end_id(&self) -> usize {
        END_TOKEN
    }

    /// Id of the START token.
    pub fn start_id(&self) -> usize {
        self.charset.len() + 1
    }

    /// Id of the PAD token.
    pub fn pad_id(&self) -> usize {
        self.charset.len() + 2
    }

    /// Number of ids including START and PAD.
    pub fn vocabulary_size(&self) -> usize {
        self.charset.len() + 3
    }

    /// Number of classes a recognition head predicts (END plus characters).
    pub fn num_classes(&self) -> usize {
        self.charset.len() + 1
    }

    /// Character for a token id, or `None` for special and out-of-range ids.
    pub fn id_to_char(&self, id: usize) -> Option<char> {
        if id == END_TOKEN {
            return None;
        }
        self.charset.get(id - 1)
    }

    /// Maps each character to its token id.
    pub fn encode(&self, text: &str) -> CaptchaResult<Vec<usize>> {
        text.chars()
            .enumerate()
            .map(|(position, character)| {
                self.charset
                    .position(character)
                    .map(|p| p + 1)
                    .ok_or(CaptchaError::UnknownCharacter {
                        character,
                        position,
                    })
            })
            .collect()
    }

    /// Encodes `text` and appends the END token.
    pub fn encode_with_end(&self, text: &str) -> CaptchaResult<Vec<usize>> {
        let mut ids = self.encode(text)?;
        ids.push(END_TOKEN);
        Ok(ids)
    }

    /// Decodes a `[batch, sequence, classes]` probability tensor.
    ///
    /// The class axis must have `num_classes()` or `vocabulary_size()` entries.
    pub fn decode(&self, probabilities: &Tensor3D) -> CaptchaResult<Vec<DecodedText>> {
        let classes = probabilities.shape()[2];
        if classes != self.num_classes() && classes != self.vocabulary_size() {
            return Err(CaptchaError::decode_failure(
                0,
                format!(
                    "class axis has {} entries, expected {} or {} for a {}-character charset",
                    classes,
                    self.num_classes(),
                    self.vocabulary_size(),
                    self.charset.len()
                ),
            ));
        }

        probabilities
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(batch_index, sequence)| self.decode_sequence(batch_index, sequence))
            .collect()
    }

    /// Decodes one `[sequence, classes]` matrix.
    ///
    /// Positions after the first END are never inspected.
    pub fn decode_sequence(
        &self,
        batch_index: usize,
        sequence: ArrayView2<'_, f32>,
    ) -> CaptchaResult<DecodedText> {
        let mut text = String::new();
        let mut char_probabilities = Vec::new();
        let mut end_probability = None;

        for (position, row) in sequence.outer_iter().enumerate() {
            let (id, probability) = argmax(row).ok_or_else(|| {
                CaptchaError::decode_failure_at(
                    batch_index,
                    position,
                    "empty or non-finite probability row",
                )
            })?;

            if id == END_TOKEN {
                end_probability = Some(probability);
                break;
            }
            match self.id_to_char(id) {
                Some(c) => {
                    text.push(c);
                    char_probabilities.push(probability);
                }
                None => {
                    let kind = if id == self.start_id() {
                        "START"
                    } else if id == self.pad_id() {
                        "PAD"
                    } else {
                        "out-of-range"
                    };
                    return Err(CaptchaError::decode_failure_at(
                        batch_index,
                        position,
                        format!("{kind} token {id} predicted before END"),
                    ));
                }
            }
        }

        let confidence = self.reduction.reduce(&char_probabilities);
        tracing::debug!(
            batch_index,
            text = %text,
            confidence,
            terminated = end_probability.is_some(),
            "decoded sequence"
        );

        Ok(DecodedText {
            text,
            confidence,
            char_probabilities,
            end_probability,
        })
    }
}

/// Index and value of the first maximum in `row`.
///
/// Returns `None` for an empty row or one containing a non-finite value.
fn argmax(row: ArrayView1<'_, f32>) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &value) in row.iter().enumerate() {
        if !value.is_finite() {
            return None;
        }
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((i, value)),
        }
    }
    best
}
