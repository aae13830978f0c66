//! Scripted engines and sources for pipeline tests.

use super::monitor::ImageSource;
use crate::core::batch::{Tensor3D, Tensor4D};
use crate::core::errors::{CaptchaError, CaptchaResult, SimpleError};
use crate::core::traits::InferenceEngine;
use crate::processors::Tokenizer;
use image::DynamicImage;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Engine that returns logits spelling a fixed token sequence.
#[derive(Debug)]
pub(crate) struct ScriptedEngine {
    ids: Vec<usize>,
    seq_len: usize,
    probability: f32,
    classes: usize,
    fail: bool,
    declared_input: Option<Vec<i64>>,
    declared_output: Option<Vec<i64>>,
    calls: AtomicUsize,
    last_input_shape: Mutex<Option<Vec<usize>>>,
}

impl ScriptedEngine {
    /// Every position peaks at the scripted token with softmax mass `probability`;
    /// positions after the text are END.
    pub(crate) fn for_text(
        tokenizer: &Tokenizer,
        text: &str,
        seq_len: usize,
        probability: f32,
    ) -> Self {
        let ids = tokenizer.encode_with_end(text).unwrap();
        assert!(ids.len() <= seq_len);
        Self {
            ids,
            seq_len,
            probability,
            classes: tokenizer.num_classes(),
            fail: false,
            declared_input: None,
            declared_output: None,
            calls: AtomicUsize::new(0),
            last_input_shape: Mutex::new(None),
        }
    }

    pub(crate) fn failing() -> Self {
        let mut engine = Self::for_text(&Tokenizer::default(), "", 1, 0.9);
        engine.fail = true;
        engine
    }

    pub(crate) fn set_logits_classes(&mut self, classes: usize) {
        self.classes = classes;
    }

    pub(crate) fn with_declared_input_shape(mut self, shape: Vec<i64>) -> Self {
        self.declared_input = Some(shape);
        self
    }

    pub(crate) fn with_declared_output_shape(mut self, shape: Vec<i64>) -> Self {
        self.declared_output = Some(shape);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_input_shape(&self) -> Option<Vec<usize>> {
        self.last_input_shape.lock().unwrap().clone()
    }

    fn logits(&self) -> Tensor3D {
        // Softmax of [t, 0, 0, ...] gives the peak e^t / (e^t + classes - 1).
        let p = self.probability;
        let peak = (p * (self.classes as f32 - 1.0) / (1.0 - p)).ln();
        let mut logits = Tensor3D::zeros((1, self.seq_len, self.classes));
        for position in 0..self.seq_len {
            let id = self.ids.get(position).copied().unwrap_or(0);
            logits[[0, position, id]] = peak;
        }
        logits
    }
}

impl InferenceEngine for ScriptedEngine {
    fn infer(&self, input: &Tensor4D) -> CaptchaResult<Tensor3D> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input_shape.lock().unwrap() = Some(input.shape().to_vec());
        if self.fail {
            return Err(CaptchaError::inference_error(
                "scripted",
                "forward pass failed",
                SimpleError::new("scripted failure"),
            ));
        }
        Ok(self.logits())
    }

    fn engine_info(&self) -> String {
        "ScriptedEngine".to_string()
    }

    fn declared_input_shape(&self) -> Option<Vec<i64>> {
        self.declared_input.clone()
    }

    fn declared_output_shape(&self) -> Option<Vec<i64>> {
        self.declared_output.clone()
    }
}

/// One scripted poll result.
pub(crate) enum Poll {
    Image(DynamicImage),
    Nothing,
    Error(&'static str),
}

/// Source that replays a fixed list of poll results, then reports nothing.
pub(crate) struct ScriptedSource {
    script: VecDeque<Poll>,
}

impl ScriptedSource {
    pub(crate) fn new(script: impl IntoIterator<Item = Poll>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl ImageSource for ScriptedSource {
    fn name(&self) -> String {
        "scripted".to_string()
    }

    fn poll(&mut self) -> CaptchaResult<Option<DynamicImage>> {
        match self.script.pop_front() {
            Some(Poll::Image(image)) => Ok(Some(image)),
            Some(Poll::Error(message)) => Err(CaptchaError::monitor_error(message)),
            Some(Poll::Nothing) | None => Ok(None),
        }
    }
}
