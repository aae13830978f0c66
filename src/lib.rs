//! # OAR Captcha
//!
//! A Rust library that reads the text in CAPTCHA images using an ONNX
//! sequence recognition model.
//!
//! ## Features
//!
//! - Image to tensor preprocessing (RGB conversion, bicubic stretch, normalization)
//! - ONNX Runtime inference with a session pool and configurable execution providers
//! - Greedy decoding with per-character probabilities and a sequence confidence
//! - Startup validation of the model, charset and input shape
//! - A background monitor that solves images as they appear
//!
//! ## Modules
//!
//! * [`core`] - Configuration, errors, the inference engine and shared traits
//! * [`pipeline`] - The solver, the monitor and image sources
//! * [`processors`] - Preprocessing, tokenizer and decoding
//! * [`utils`] - Image loading, region cropping and logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oar_captcha::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let solver = CaptchaSolver::builder()
//!     .model_path("models/captcha.onnx")
//!     .min_confidence(0.5)
//!     .build()?;
//!
//! let image = load_image(Path::new("captcha.png"))?;
//! let decoded = solver.solve(&image)?;
//! println!("{} ({:.3})", decoded.text, decoded.confidence);
//! # Ok(())
//! # }
//! ```
//!
//! ### JSON Configuration
//!
//! ```rust,no_run
//! use oar_captcha::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config: SolverConfig = serde_json::from_str(r#"
//! {
//!   "model_path": "models/captcha.onnx",
//!   "input_shape": [3, 32, 128],
//!   "session_pool_size": 2,
//!   "confidence_reduction": "geometric_mean",
//!   "ort_session": { "intra_threads": 2, "execution_providers": ["CPU"] }
//! }
//! "#)?;
//!
//! let solver = CaptchaSolver::from_config(&config)?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use oar_captcha::prelude::*;
/// ```
pub mod prelude {
    pub use crate::pipeline::{
        CaptchaSolver, FileSource, ImageSource, Monitor, MonitorEvent, MonitorState,
    };

    pub use crate::core::{CaptchaError, CaptchaResult, MonitorConfig, SolverConfig};

    pub use crate::processors::DecodedText;

    pub use crate::utils::{Region, crop_region, load_image, load_images};
}
