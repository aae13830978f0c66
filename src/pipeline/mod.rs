//! The solving pipeline.
//!
//! * [`CaptchaSolver`] turns one image into text and a confidence.
//! * [`Monitor`] polls an [`ImageSource`] on a background thread and feeds
//!   new images to a shared solver.
//! * [`FileSource`] watches an image file for changes.

mod monitor;
mod solver;
mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use monitor::{ImageSource, Monitor, MonitorEvent, MonitorState};
pub use solver::{CaptchaSolver, CaptchaSolverBuilder};
pub use source::FileSource;
