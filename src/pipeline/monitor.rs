//! Background polling of an image source.
//!
//! A [`Monitor`] owns at most one worker thread. The worker polls an
//! [`ImageSource`], solves every image that differs from the previous one and
//! reports a [`MonitorEvent`] to a callback. The only state shared with the
//! worker is an atomic running flag.

use super::solver::CaptchaSolver;
use crate::core::config::{ConfigValidator, MonitorConfig};
use crate::core::errors::{CaptchaError, CaptchaResult};
use crate::core::traits::InferenceEngine;
use crate::processors::DecodedText;
use image::DynamicImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Somewhere new CAPTCHA images come from.
pub trait ImageSource: Send + 'static {
    /// Human readable name for logs.
    fn name(&self) -> String;

    /// Returns the current image, or `None` if nothing is available right now.
    fn poll(&mut self) -> CaptchaResult<Option<DynamicImage>>;
}

/// What the monitor observed on one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// A new image was solved.
    Solved(DecodedText),
    /// A new image was seen but could not be solved.
    Unsolved,
    /// The source failed to produce an image.
    SourceError(String),
}

/// Whether a monitor currently owns a running worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
}

/// Start/stop controller for the polling worker.
#[derive(Debug)]
pub struct Monitor {
    config: MonitorConfig,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Creates an idle monitor.
    pub fn new(config: MonitorConfig) -> CaptchaResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        })
    }

    /// The current state.
    pub fn state(&self) -> MonitorState {
        if self.is_running() {
            MonitorState::Running
        } else {
            MonitorState::Idle
        }
    }

    /// Returns true while a worker is running.
    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.running.load(Ordering::Acquire)
    }

    /// Spawns the worker thread.
    ///
    /// Fails if the monitor is already running.
    pub fn start<E, S, F>(
        &mut self,
        solver: Arc<CaptchaSolver<E>>,
        source: S,
        callback: F,
    ) -> CaptchaResult<()>
    where
        E: InferenceEngine + 'static,
        S: ImageSource,
        F: FnMut(MonitorEvent) + Send + 'static,
    {
        if self.is_running() {
            return Err(CaptchaError::monitor_error("monitor is already running"));
        }
        // A worker that exited on its own still needs joining.
        self.join_worker()?;

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let config = self.config.clone();
        let name = source.name();

        let spawned = thread::Builder::new()
            .name("captcha-monitor".to_string())
            .spawn(move || poll_loop(solver, source, callback, running, config));
        match spawned {
            Ok(handle) => {
                info!(
                    source = %name,
                    poll_interval_ms = self.config.poll_interval_ms,
                    "monitor started"
                );
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(e.into())
            }
        }
    }

    /// Stops the worker and waits for it to exit.
    ///
    /// A solve already in progress finishes first. Stopping an idle monitor is a no-op.
    pub fn stop(&mut self) -> CaptchaResult<()> {
        self.running.store(false, Ordering::Release);
        if self.handle.is_some() {
            self.join_worker()?;
            info!("monitor stopped");
        }
        Ok(())
    }

    fn join_worker(&mut self) -> CaptchaResult<()> {
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            handle
                .join()
                .map_err(|_| CaptchaError::monitor_error("monitor worker panicked"))?;
        }
        Ok(())
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "failed to stop monitor");
        }
    }
}

fn poll_loop<E, S, F>(
    solver: Arc<CaptchaSolver<E>>,
    mut source: S,
    mut callback: F,
    running: Arc<AtomicBool>,
    config: MonitorConfig,
) where
    E: InferenceEngine,
    S: ImageSource,
    F: FnMut(MonitorEvent),
{
    let mut last_seen: Option<DynamicImage> = None;

    while running.load(Ordering::Acquire) {
        let wait = match source.poll() {
            Ok(Some(image)) => {
                if last_seen.as_ref() == Some(&image) {
                    debug!("image unchanged, skipping");
                } else {
                    let event = match solver.try_solve(&image) {
                        Some(decoded) => MonitorEvent::Solved(decoded),
                        None => MonitorEvent::Unsolved,
                    };
                    // Remembered even when unsolved so a bad image is not retried every tick.
                    last_seen = Some(image);
                    callback(event);
                }
                config.poll_interval()
            }
            Ok(None) => config.poll_interval(),
            Err(e) => {
                warn!(source = %source.name(), error = %e, "image source failed");
                callback(MonitorEvent::SourceError(e.to_string()));
                config.error_backoff()
            }
        };

        if running.load(Ordering::Acquire) {
            thread::park_timeout(wait);
        }
    }
}
