//! Command-line arguments for `captcha-solver`.

use clap::{Parser, Subcommand};
use oar_captcha::core::config::{OrtExecutionProvider, OrtSessionConfig, SolverConfig};
use oar_captcha::utils::Region;
use std::error::Error;
use std::path::PathBuf;

/// Solve CAPTCHA images with an ONNX recognition model.
#[derive(Debug, Parser)]
#[command(name = "captcha-solver", version)]
#[command(about = "Recognizes the text in CAPTCHA images")]
pub struct Cli {
    /// JSON solver configuration; command-line options override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the ONNX recognition model
    #[arg(short, long, global = true)]
    pub model: Option<PathBuf>,

    /// Device to use for inference (e.g., 'cpu', 'cuda', 'cuda:0')
    #[arg(long, global = true)]
    pub device: Option<String>,

    /// Reject results whose confidence is below this value
    #[arg(long, global = true)]
    pub min_confidence: Option<f32>,

    /// Print one JSON object per result instead of plain text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Solve one or more image files
    Solve {
        /// Paths to input images
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Crop each image to X1,Y1,X2,Y2 before solving
        #[arg(long, value_name = "X1,Y1,X2,Y2")]
        crop: Option<Region>,
    },
    /// Solve an image file every time it changes, until Enter is pressed
    Watch {
        /// Image file to watch
        file: PathBuf,

        /// Milliseconds between checks of the file
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Crop each capture to X1,Y1,X2,Y2 before solving
        #[arg(long, value_name = "X1,Y1,X2,Y2")]
        crop: Option<Region>,
    },
}

impl Cli {
    /// Builds the solver configuration from the config file and overrides.
    pub fn solver_config(&self) -> Result<SolverConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => SolverConfig::from_json_file(path)?,
            None => SolverConfig::default(),
        };

        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(device) = &self.device {
            let provider = OrtExecutionProvider::parse_device(device)
                .ok_or_else(|| format!("unknown device '{device}'"))?;
            let mut providers = vec![provider];
            if providers[0] != OrtExecutionProvider::CPU {
                providers.push(OrtExecutionProvider::CPU);
            }
            let session = config.ort_session.take().unwrap_or_else(OrtSessionConfig::new);
            config.ort_session = Some(session.with_execution_providers(providers));
        }
        if let Some(threshold) = self.min_confidence {
            config.min_confidence = Some(threshold);
        }
        Ok(config)
    }
}
