//! Utility functions for the solving pipeline.
//!
//! This module provides image loading, region cropping, and logging setup.

pub mod image;
pub mod region;

pub use self::image::{load_image, load_images};
pub use region::{Region, crop_region};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
