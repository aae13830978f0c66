//! The CAPTCHA solver: preprocessing, inference and decoding in one object.
//!
//! A [`CaptchaSolver`] is built once, validated up front, and immutable
//! afterwards. It can be shared between threads; concurrent calls to
//! [`CaptchaSolver::solve`] are serialized per ONNX session.

use crate::core::config::{ConfigValidator, OrtSessionConfig, SolverConfig};
use crate::core::errors::{CaptchaError, CaptchaResult};
use crate::core::inference::{OrtInfer, ort_infer::input_shape_compatible};
use crate::core::traits::{InferenceEngine, Preprocessor};
use crate::processors::{
    CaptchaPreprocessor, Charset, ConfidenceReduction, DecodedText, SequenceDecoder, Tokenizer,
};
use crate::utils::{load_image, load_images};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, warn};

/// Solves CAPTCHA images with a recognition model.
#[derive(Debug)]
pub struct CaptchaSolver<E: InferenceEngine = OrtInfer> {
    preprocessor: CaptchaPreprocessor,
    engine: E,
    decoder: SequenceDecoder,
    min_confidence: Option<f32>,
    parallel_threshold: usize,
}

impl CaptchaSolver<OrtInfer> {
    /// Returns a builder with default configuration.
    pub fn builder() -> CaptchaSolverBuilder {
        CaptchaSolverBuilder::new()
    }

    /// Builds a solver backed by ONNX Runtime.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an invalid configuration and
    /// `ModelUnavailable` if the model cannot be loaded or does not match the
    /// configured input shape and charset.
    pub fn from_config(config: &SolverConfig) -> CaptchaResult<Self> {
        // Cheap checks first so a bad config never touches the model file.
        config.validate()?;
        Charset::new(&config.charset)?;
        let engine = OrtInfer::from_config(config)?;
        Self::with_engine(config, engine)
    }
}

impl<E: InferenceEngine> CaptchaSolver<E> {
    /// Builds a solver around an already constructed engine.
    pub fn with_engine(config: &SolverConfig, engine: E) -> CaptchaResult<Self> {
        config.validate()?;
        let charset = Charset::new(&config.charset)?;
        let tokenizer = Tokenizer::new(charset).with_reduction(config.confidence_reduction);
        let (height, width) = config.target_size();
        let preprocessor = CaptchaPreprocessor::new(height, width)?;

        Self::check_engine_contract(config, &engine, &preprocessor, &tokenizer)?;

        debug!(
            engine = %engine.engine_info(),
            preprocessing = %preprocessor.preprocessing_info(),
            charset_len = tokenizer.charset().len(),
            "captcha solver ready"
        );

        Ok(Self {
            preprocessor,
            engine,
            decoder: SequenceDecoder::new(tokenizer),
            min_confidence: config.min_confidence,
            parallel_threshold: config.parallel_threshold,
        })
    }

    fn check_engine_contract(
        config: &SolverConfig,
        engine: &E,
        preprocessor: &CaptchaPreprocessor,
        tokenizer: &Tokenizer,
    ) -> CaptchaResult<()> {
        let expected = preprocessor.output_shape();
        if let Some(declared) = engine.declared_input_shape()
            && !input_shape_compatible(&declared, expected)
        {
            return Err(CaptchaError::model_unavailable(
                &config.model_path,
                format!(
                    "model input shape {declared:?} is incompatible with [N, {}, {}, {}]",
                    expected[0], expected[1], expected[2]
                ),
                Some("set input_shape to match the model"),
                None::<std::io::Error>,
            ));
        }

        if let Some(classes) = engine
            .declared_output_shape()
            .and_then(|shape| shape.last().copied())
            .filter(|&classes| classes > 0)
        {
            let classes = classes as usize;
            if classes != tokenizer.num_classes() && classes != tokenizer.vocabulary_size() {
                return Err(CaptchaError::model_unavailable(
                    &config.model_path,
                    format!(
                        "model predicts {classes} classes but a {}-character charset needs {} or {}",
                        tokenizer.charset().len(),
                        tokenizer.num_classes(),
                        tokenizer.vocabulary_size()
                    ),
                    Some("configure the charset the model was trained with"),
                    None::<std::io::Error>,
                ));
            }
        }
        Ok(())
    }

    /// Recognizes the text in `image`.
    ///
    /// Runs on the calling thread. Failures are specific to this request; the
    /// solver stays usable.
    pub fn solve(&self, image: &DynamicImage) -> CaptchaResult<DecodedText> {
        let start = Instant::now();
        let tensor = self.preprocessor.preprocess(image)?;
        let logits = self.engine.infer(&tensor)?;
        let decoded = self.decoder.decode(&logits)?;

        debug!(
            text = %decoded.text,
            confidence = decoded.confidence,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "solved captcha"
        );

        if let Some(threshold) = self.min_confidence
            && decoded.confidence < threshold
        {
            return Err(CaptchaError::LowConfidence {
                text: decoded.text,
                confidence: decoded.confidence,
                threshold,
            });
        }
        Ok(decoded)
    }

    /// Like [`solve`](Self::solve), but logs failures and returns `None`.
    ///
    /// Decode failures are logged at error level since they indicate a model
    /// and charset mismatch; everything else is logged as a warning.
    pub fn try_solve(&self, image: &DynamicImage) -> Option<DecodedText> {
        match self.solve(image) {
            Ok(decoded) => Some(decoded),
            Err(e @ CaptchaError::Decode { .. }) => {
                error!(
                    error = ?e,
                    width = image.width(),
                    height = image.height(),
                    engine = %self.engine.engine_info(),
                    "failed to decode model output"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "captcha could not be solved");
                None
            }
        }
    }

    /// Loads the image at `path` and solves it.
    pub fn solve_path(&self, path: &Path) -> CaptchaResult<DecodedText> {
        let image = load_image(path)?;
        self.solve(&image)
    }

    /// Solves several image files, one result per path in input order.
    ///
    /// Images are loaded with [`load_images`]; batches larger than the configured
    /// parallel threshold are loaded and solved with rayon.
    pub fn solve_paths<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Vec<CaptchaResult<DecodedText>> {
        let images = load_images(paths, Some(self.parallel_threshold));
        let solve = |loaded: CaptchaResult<DynamicImage>| loaded.and_then(|image| self.solve(&image));
        if images.len() > self.parallel_threshold {
            use rayon::prelude::*;
            images.into_par_iter().map(solve).collect()
        } else {
            images.into_iter().map(solve).collect()
        }
    }

    /// The tokenizer used for decoding.
    pub fn tokenizer(&self) -> &Tokenizer {
        self.decoder.tokenizer()
    }

    /// The inference engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The configured confidence floor.
    pub fn min_confidence(&self) -> Option<f32> {
        self.min_confidence
    }
}

/// Builder for [`CaptchaSolver`].
#[derive(Debug, Clone, Default)]
pub struct CaptchaSolverBuilder {
    config: SolverConfig,
}

impl CaptchaSolverBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    pub fn config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the model path.
    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.model_path = path.into();
        self
    }

    /// Sets the model name used in logs and errors.
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.config.model_name = Some(name.into());
        self
    }

    /// Sets the charset.
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.config.charset = charset.into();
        self
    }

    /// Sets the model input shape as (channels, height, width).
    pub fn input_shape(mut self, shape: [usize; 3]) -> Self {
        self.config.input_shape = shape;
        self
    }

    /// Sets the number of ONNX sessions.
    pub fn session_pool_size(mut self, size: usize) -> Self {
        self.config.session_pool_size = size;
        self
    }

    /// Sets ONNX Runtime session options.
    pub fn ort_session(mut self, ort_session: OrtSessionConfig) -> Self {
        self.config.ort_session = Some(ort_session);
        self
    }

    /// Sets how character probabilities are combined.
    pub fn confidence_reduction(mut self, reduction: ConfidenceReduction) -> Self {
        self.config.confidence_reduction = reduction;
        self
    }

    /// Rejects results below `threshold`.
    pub fn min_confidence(mut self, threshold: f32) -> Self {
        self.config.min_confidence = Some(threshold);
        self
    }

    /// Sets the batch size above which files are solved in parallel.
    pub fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.config.parallel_threshold = threshold;
        self
    }

    /// The configuration accumulated so far.
    pub fn get_config(&self) -> &SolverConfig {
        &self.config
    }

    /// Builds a solver backed by ONNX Runtime.
    pub fn build(self) -> CaptchaResult<CaptchaSolver<OrtInfer>> {
        CaptchaSolver::from_config(&self.config)
    }

    /// Builds a solver around `engine`.
    pub fn build_with_engine<E: InferenceEngine>(self, engine: E) -> CaptchaResult<CaptchaSolver<E>> {
        CaptchaSolver::with_engine(&self.config, engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::ScriptedEngine;
    use image::{Rgb, RgbImage};

    fn captcha_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(160, 60, |x, y| {
            if (x / 10 + y / 10) % 2 == 0 {
                Rgb([20, 20, 20])
            } else {
                Rgb([230, 230, 230])
            }
        }))
    }

    #[test]
    fn test_end_to_end_with_scripted_engine() {
        let tokenizer = Tokenizer::default();
        let engine = ScriptedEngine::for_text(&tokenizer, "abc123", 26, 0.9);
        let solver = CaptchaSolver::builder().build_with_engine(engine).unwrap();

        let decoded = solver.solve(&captcha_image()).unwrap();
        assert_eq!(decoded.text, "abc123");
        assert!(decoded.confidence > 0.5);
        assert_eq!(decoded.char_probabilities.len(), 6);
        assert_eq!(solver.engine().calls(), 1);
        assert_eq!(solver.engine().last_input_shape(), Some(vec![1, 3, 32, 128]));
    }

    #[test]
    fn test_solve_is_deterministic() {
        let tokenizer = Tokenizer::default();
        let engine = ScriptedEngine::for_text(&tokenizer, "Xy9!", 26, 0.8);
        let solver = CaptchaSolver::builder().build_with_engine(engine).unwrap();
        let image = captcha_image();
        let first = solver.solve(&image).unwrap();
        for _ in 0..3 {
            assert_eq!(solver.solve(&image).unwrap(), first);
        }
    }

    #[test]
    fn test_min_confidence_rejects_low_scores() {
        let tokenizer = Tokenizer::default();
        let engine = ScriptedEngine::for_text(&tokenizer, "abc123", 26, 0.9);
        let solver = CaptchaSolver::builder()
            .min_confidence(0.99)
            .build_with_engine(engine)
            .unwrap();

        assert!(matches!(
            solver.solve(&captcha_image()),
            Err(CaptchaError::LowConfidence { .. })
        ));
        assert!(solver.try_solve(&captcha_image()).is_none());
    }

    #[test]
    fn test_engine_failure_is_per_request() {
        let solver = CaptchaSolver::builder()
            .build_with_engine(ScriptedEngine::failing())
            .unwrap();
        let err = solver.solve(&captcha_image()).unwrap_err();
        assert!(matches!(err, CaptchaError::Inference { .. }));
        assert!(err.is_per_request());
        assert!(solver.try_solve(&captcha_image()).is_none());
    }

    #[test]
    fn test_zero_sized_image_is_unsupported() {
        let tokenizer = Tokenizer::default();
        let solver = CaptchaSolver::builder()
            .build_with_engine(ScriptedEngine::for_text(&tokenizer, "a", 4, 0.9))
            .unwrap();
        assert!(matches!(
            solver.solve(&DynamicImage::new_rgb8(0, 0)),
            Err(CaptchaError::UnsupportedImage { .. })
        ));
        assert_eq!(solver.engine().calls(), 0);
    }

    #[test]
    fn test_decode_failure_surfaces_from_solve() {
        let tokenizer = Tokenizer::default();
        let mut engine = ScriptedEngine::for_text(&tokenizer, "ab", 6, 0.9);
        engine.set_logits_classes(tokenizer.num_classes() + 1);
        let solver = CaptchaSolver::builder().build_with_engine(engine).unwrap();
        assert!(matches!(
            solver.solve(&captcha_image()),
            Err(CaptchaError::Decode { .. })
        ));
        assert!(solver.try_solve(&captcha_image()).is_none());
    }

    #[test]
    fn test_build_rejects_incompatible_engine() {
        let tokenizer = Tokenizer::default();
        let engine = ScriptedEngine::for_text(&tokenizer, "a", 4, 0.9)
            .with_declared_input_shape(vec![1, 3, 48, 320]);
        let err = CaptchaSolver::builder()
            .build_with_engine(engine)
            .unwrap_err();
        assert!(err.is_model_unavailable());

        let engine = ScriptedEngine::for_text(&tokenizer, "a", 4, 0.9)
            .with_declared_output_shape(vec![1, 26, 96]);
        let err = CaptchaSolver::builder()
            .build_with_engine(engine)
            .unwrap_err();
        assert!(err.is_model_unavailable());

        let engine = ScriptedEngine::for_text(&tokenizer, "a", 4, 0.9)
            .with_declared_input_shape(vec![-1, 3, 32, 128])
            .with_declared_output_shape(vec![-1, -1, 95]);
        assert!(CaptchaSolver::builder().build_with_engine(engine).is_ok());
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let tokenizer = Tokenizer::default();
        let err = CaptchaSolver::builder()
            .charset("aab")
            .build_with_engine(ScriptedEngine::for_text(&tokenizer, "a", 4, 0.9))
            .unwrap_err();
        assert!(matches!(err, CaptchaError::ConfigError { .. }));

        let err = CaptchaSolver::builder()
            .min_confidence(2.0)
            .build_with_engine(ScriptedEngine::for_text(&tokenizer, "a", 4, 0.9))
            .unwrap_err();
        assert!(matches!(err, CaptchaError::ConfigError { .. }));
    }

    #[test]
    fn test_missing_model_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let err = CaptchaSolver::builder()
            .model_path(dir.path().join("captcha.onnx"))
            .build()
            .unwrap_err();
        assert!(err.is_model_unavailable());

        let empty = dir.path().join("empty.onnx");
        std::fs::write(&empty, b"").unwrap();
        let err = CaptchaSolver::builder().model_path(&empty).build().unwrap_err();
        assert!(err.is_model_unavailable());
    }

    #[test]
    fn test_solve_paths_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..5 {
            let path = dir.path().join(format!("{i}.png"));
            if i != 2 {
                RgbImage::from_pixel(90, 30, Rgb([i * 40, 0, 0]))
                    .save(&path)
                    .unwrap();
            }
            paths.push(path);
        }

        let tokenizer = Tokenizer::default();
        let solver = CaptchaSolver::builder()
            .parallel_threshold(1)
            .build_with_engine(ScriptedEngine::for_text(&tokenizer, "q7", 8, 0.95))
            .unwrap();
        let results = solver.solve_paths(&paths);
        assert_eq!(results.len(), 5);
        for (i, result) in results.iter().enumerate() {
            if i == 2 {
                assert!(matches!(result, Err(CaptchaError::ImageLoad(_))));
            } else {
                assert_eq!(result.as_ref().unwrap().text, "q7");
            }
        }
    }
}
