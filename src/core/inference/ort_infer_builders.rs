use super::*;
use crate::core::config::{OrtSessionConfig, SolverConfig};
use ort::logging::LogLevel;
use std::path::Path;

impl OrtInfer {
    /// Loads a model with default ONNX Runtime settings and a single session.
    ///
    /// The input and output names default to the first declared input and output.
    pub fn new(model_path: impl AsRef<Path>) -> CaptchaResult<Self> {
        Self::from_config(&SolverConfig::new(model_path.as_ref()))
    }

    /// Loads a model as described by `config`, building `session_pool_size` sessions.
    ///
    /// Fails with [`CaptchaError::ModelUnavailable`] if the file is missing or
    /// empty, ONNX Runtime cannot load it, or the graph does not have a rank-4
    /// input and a rank-3 output.
    pub fn from_config(config: &SolverConfig) -> CaptchaResult<Self> {
        let path = config.model_path.as_path();
        Self::check_artifact(path)?;

        let pool_size = config.session_pool_size.max(1);
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            sessions.push(Self::build_session(path, config.ort_session.as_ref())?);
        }

        let (input_name, output_name) = Self::check_structure(
            &sessions[0],
            path,
            config.input_name.as_deref(),
            config.output_name.as_deref(),
        )?;
        let model_name = config.resolved_model_name();

        tracing::info!(
            model = %model_name,
            path = %path.display(),
            sessions = pool_size,
            input = %input_name,
            output = %output_name,
            "loaded recognition model"
        );

        Ok(OrtInfer {
            sessions: sessions.into_iter().map(Mutex::new).collect(),
            next_idx: AtomicUsize::new(0),
            input_name,
            output_name,
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    /// Rejects artifacts that cannot possibly be a model before ONNX Runtime sees them.
    fn check_artifact(path: &Path) -> CaptchaResult<()> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            CaptchaError::model_unavailable(
                path,
                "model file not found",
                Some("check the configured model_path"),
                Some(e),
            )
        })?;
        if !metadata.is_file() {
            return Err(CaptchaError::model_unavailable(
                path,
                "model path is not a file",
                None,
                None::<std::io::Error>,
            ));
        }
        if metadata.len() == 0 {
            return Err(CaptchaError::model_unavailable(
                path,
                "model file is empty",
                Some("re-download or re-export the model"),
                None::<std::io::Error>,
            ));
        }
        Ok(())
    }

    fn build_session(path: &Path, ort_config: Option<&OrtSessionConfig>) -> CaptchaResult<Session> {
        let unavailable = |reason: &str, e: ort::Error| {
            CaptchaError::model_unavailable(
                path,
                reason,
                Some("check device/EP configuration and model file"),
                Some(e),
            )
        };

        let builder = Session::builder()
            .map_err(|e| unavailable("failed to initialize ONNX Runtime", e))?;
        let builder = match ort_config {
            Some(cfg) => Self::apply_ort_config(builder, cfg),
            // Keep ONNX Runtime quiet unless configured otherwise.
            None => builder.with_log_level(LogLevel::Error),
        }
        .map_err(|e| unavailable("invalid ONNX Runtime session options", e))?;

        builder
            .commit_from_file(path)
            .map_err(|e| unavailable("failed to create ONNX session", e))
    }

    /// Validates the graph signature and resolves the input and output names.
    fn check_structure(
        session: &Session,
        path: &Path,
        input_name: Option<&str>,
        output_name: Option<&str>,
    ) -> CaptchaResult<(String, String)> {
        let structural = |reason: String| {
            CaptchaError::model_unavailable(
                path,
                reason,
                Some("export the recognizer with an image input and a sequence output"),
                None::<std::io::Error>,
            )
        };

        let input = match input_name {
            Some(name) => session.inputs.iter().find(|i| i.name == name),
            None => session.inputs.first(),
        }
        .ok_or_else(|| structural(format!("model has no input named {input_name:?}")))?;
        match &input.input_type {
            ValueType::Tensor { shape, .. } if shape.len() == 4 => {}
            other => {
                return Err(structural(format!(
                    "input '{}' must be a rank-4 tensor, found {other:?}",
                    input.name
                )));
            }
        }

        let output = match output_name {
            Some(name) => session.outputs.iter().find(|o| o.name == name),
            None => session.outputs.first(),
        }
        .ok_or_else(|| structural(format!("model has no output named {output_name:?}")))?;
        match &output.output_type {
            ValueType::Tensor { shape, .. } if shape.len() == 3 => {}
            other => {
                return Err(structural(format!(
                    "output '{}' must be a rank-3 tensor, found {other:?}",
                    output.name
                )));
            }
        }

        Ok((input.name.clone(), output.name.clone()))
    }
}
