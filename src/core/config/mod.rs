//! Configuration management for the solving pipeline.
//!
//! This module provides configuration types, validation traits, and the ONNX
//! Runtime session options.

pub mod errors;
pub mod onnx;
pub mod solver;

pub use errors::{ConfigError, ConfigValidator};
pub use onnx::*;
pub use solver::{MonitorConfig, SolverConfig};
