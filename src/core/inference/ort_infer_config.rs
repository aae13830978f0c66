use super::*;
use crate::core::config::{OrtExecutionProvider, OrtGraphOptimizationLevel, OrtSessionConfig};
use ort::execution_providers::ExecutionProviderDispatch;
use ort::logging::LogLevel;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};

/// Maps the configured severity (0 = verbose .. 4 = fatal) onto ONNX Runtime's levels.
fn log_level(severity: Option<i32>) -> LogLevel {
    match severity.unwrap_or(3) {
        i32::MIN..=0 => LogLevel::Verbose,
        1 => LogLevel::Info,
        2 => LogLevel::Warning,
        3 => LogLevel::Error,
        _ => LogLevel::Fatal,
    }
}

fn optimization_level(level: OrtGraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        OrtGraphOptimizationLevel::DisableAll => GraphOptimizationLevel::Disable,
        OrtGraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        OrtGraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        OrtGraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
    }
}

#[cfg(not(all(
    feature = "cuda",
    feature = "tensorrt",
    feature = "directml",
    feature = "coreml"
)))]
fn feature_missing(provider: &str, feature: &str) -> ort::Error {
    ort::Error::new(format!(
        "{provider} execution provider requested but the '{feature}' feature is not enabled"
    ))
}

fn dispatch(provider: &OrtExecutionProvider) -> Result<ExecutionProviderDispatch, ort::Error> {
    use ort::execution_providers as ep;

    match provider {
        OrtExecutionProvider::CPU => Ok(ep::CPUExecutionProvider::default().build()),

        #[cfg(feature = "cuda")]
        OrtExecutionProvider::CUDA {
            device_id,
            gpu_mem_limit,
        } => {
            let mut cuda = ep::CUDAExecutionProvider::default();
            if let Some(id) = device_id {
                cuda = cuda.with_device_id(*id);
            }
            if let Some(limit) = gpu_mem_limit {
                cuda = cuda.with_memory_limit(*limit);
            }
            Ok(cuda.build())
        }
        #[cfg(not(feature = "cuda"))]
        OrtExecutionProvider::CUDA { .. } => Err(feature_missing("CUDA", "cuda")),

        #[cfg(feature = "tensorrt")]
        OrtExecutionProvider::TensorRT {
            device_id,
            fp16_enable,
        } => {
            let mut trt = ep::TensorRTExecutionProvider::default();
            if let Some(id) = device_id {
                trt = trt.with_device_id(*id);
            }
            if let Some(fp16) = fp16_enable {
                trt = trt.with_fp16(*fp16);
            }
            Ok(trt.build())
        }
        #[cfg(not(feature = "tensorrt"))]
        OrtExecutionProvider::TensorRT { .. } => Err(feature_missing("TensorRT", "tensorrt")),

        #[cfg(feature = "directml")]
        OrtExecutionProvider::DirectML { device_id } => {
            let mut dml = ep::DirectMLExecutionProvider::default();
            if let Some(id) = device_id {
                dml = dml.with_device_id(*id);
            }
            Ok(dml.build())
        }
        #[cfg(not(feature = "directml"))]
        OrtExecutionProvider::DirectML { .. } => Err(feature_missing("DirectML", "directml")),

        #[cfg(feature = "coreml")]
        OrtExecutionProvider::CoreML { ane_only } => {
            let mut coreml = ep::CoreMLExecutionProvider::default();
            if *ane_only == Some(true) {
                coreml = coreml
                    .with_compute_units(ep::coreml::CoreMLComputeUnits::CPUAndNeuralEngine);
            }
            Ok(coreml.build())
        }
        #[cfg(not(feature = "coreml"))]
        OrtExecutionProvider::CoreML { .. } => Err(feature_missing("CoreML", "coreml")),
    }
}

impl OrtInfer {
    /// Applies thread counts, graph optimization, logging and execution
    /// providers to a session builder.
    ///
    /// Providers are registered in the configured order; ONNX Runtime falls
    /// back along that list when a node is unsupported.
    pub(super) fn apply_ort_config(
        mut builder: SessionBuilder,
        cfg: &OrtSessionConfig,
    ) -> Result<SessionBuilder, ort::Error> {
        if let Some(threads) = cfg.intra_threads {
            builder = builder.with_intra_threads(threads)?;
        }
        if let Some(threads) = cfg.inter_threads {
            builder = builder.with_inter_threads(threads)?;
        }
        if let Some(level) = cfg.optimization_level {
            builder = builder.with_optimization_level(optimization_level(level))?;
        }
        builder = builder.with_log_level(log_level(cfg.log_severity_level))?;

        let providers = cfg
            .execution_providers
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(dispatch)
            .collect::<Result<Vec<_>, _>>()?;
        if !providers.is_empty() {
            builder = builder.with_execution_providers(providers)?;
        }
        Ok(builder)
    }
}
