//! Error types for the solving pipeline.
//!
//! # Usage
//!
//! ```rust
//! use oar_captcha::core::errors::{CaptchaError, ProcessingStage, SimpleError};
//!
//! let error = CaptchaError::processing_error(
//!     ProcessingStage::Cropping,
//!     "region 5x5 at (0, 0)",
//!     SimpleError::new("selection must be larger than 10 pixels on each side"),
//! );
//! assert!(error.is_per_request());
//!
//! let config_error = CaptchaError::config_error("charset must not be empty");
//! assert!(!config_error.is_per_request());
//! ```

pub mod constructors;
pub mod types;

pub use types::{CaptchaError, ProcessingStage, SimpleError};

/// Convenient result alias for solver operations.
pub type CaptchaResult<T> = Result<T, CaptchaError>;
