//! Constants used throughout the solving pipeline.
//!
//! Defaults for the model input contract, the character set, and the
//! background monitor timings live here so every component agrees on them.

use std::time::Duration;

/// The default character set recognized by the model.
///
/// Ninety-four printable ASCII symbols: digits, lowercase letters, uppercase
/// letters, then punctuation. Character `i` of this string has token id `i + 1`.
pub const DEFAULT_CHARSET: &str = concat!(
    "0123456789",
    "abcdefghijklmnopqrstuvwxyz",
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
    "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~",
);

/// The default model input shape as (channels, height, width).
pub const DEFAULT_INPUT_SHAPE: [usize; 3] = [3, 32, 128];

/// Per-channel mean used to normalize pixels after scaling to [0, 1].
pub const DEFAULT_NORM_MEAN: [f32; 3] = [0.5, 0.5, 0.5];

/// Per-channel standard deviation used to normalize pixels after scaling to [0, 1].
pub const DEFAULT_NORM_STD: [f32; 3] = [0.5, 0.5, 0.5];

/// Name given to the model when none is configured and the file has no stem.
pub const DEFAULT_MODEL_NAME: &str = "captcha_recognizer";

/// Regions with a side of this many pixels or fewer are rejected when cropping.
pub const MIN_REGION_SIZE: u32 = 10;

/// How long the monitor waits between polls of its image source.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long the monitor backs off after its image source reports an error.
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(2);

/// The default threshold for parallel processing.
///
/// Batches of images larger than this are loaded and solved with rayon.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;
