//! `captcha-solver`: solve CAPTCHA images from the command line.
//!
//! # Usage
//!
//! ```bash
//! captcha-solver --model captcha.onnx solve image1.png image2.png
//! captcha-solver --model captcha.onnx --json solve screen.png --crop 100,200,260,250
//! captcha-solver --config solver.json watch capture.png --interval-ms 500
//! ```
//!
//! Logging is controlled with `RUST_LOG`, e.g. `RUST_LOG=oar_captcha=debug`.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use oar_captcha::core::{CaptchaResult, MonitorConfig};
use oar_captcha::pipeline::{CaptchaSolver, FileSource, Monitor, MonitorEvent};
use oar_captcha::processors::DecodedText;
use oar_captcha::utils::{Region, crop_region, init_tracing, load_image};
use serde::Serialize;
use std::error::Error;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// One line of `--json` output.
#[derive(Serialize)]
struct JsonResult<'a> {
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn print_result(source: &str, result: &CaptchaResult<DecodedText>, json: bool) {
    if json {
        let line = JsonResult {
            source,
            text: result.as_ref().ok().map(|d| d.text.as_str()),
            confidence: result.as_ref().ok().map(|d| d.confidence),
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        match serde_json::to_string(&line) {
            Ok(line) => println!("{line}"),
            Err(e) => error!(error = %e, "failed to serialize result"),
        }
        return;
    }
    match result {
        Ok(decoded) => println!("{source}: {} (confidence: {:.3})", decoded.text, decoded.confidence),
        Err(e) => println!("{source}: error: {e}"),
    }
}

fn solve_one(
    solver: &CaptchaSolver,
    path: &Path,
    crop: Option<Region>,
) -> CaptchaResult<DecodedText> {
    let image = load_image(path)?;
    match crop {
        Some(region) => solver.solve(&crop_region(&image, region)?),
        None => solver.solve(&image),
    }
}

fn run_solve(solver: &CaptchaSolver, images: &[PathBuf], crop: Option<Region>, json: bool) {
    let results = match crop {
        None => solver.solve_paths(images),
        Some(region) => images
            .iter()
            .map(|path| solve_one(solver, path, Some(region)))
            .collect(),
    };

    let solved = results.iter().filter(|r| r.is_ok()).count();
    for (path, result) in images.iter().zip(&results) {
        print_result(&path.display().to_string(), result, json);
    }
    info!(solved, total = images.len(), "done");
}

fn run_watch(
    solver: CaptchaSolver,
    file: PathBuf,
    interval_ms: u64,
    crop: Option<Region>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let mut source = FileSource::new(&file);
    if let Some(region) = crop {
        source = source.with_region(region);
    }
    let config = MonitorConfig::default().with_poll_interval(Duration::from_millis(interval_ms));
    let mut monitor = Monitor::new(config)?;

    let name = file.display().to_string();
    monitor.start(Arc::new(solver), source, move |event| match event {
        MonitorEvent::Solved(decoded) => print_result(&name, &Ok(decoded), json),
        MonitorEvent::Unsolved => info!(source = %name, "image could not be solved"),
        MonitorEvent::SourceError(_) => {}
    })?;

    println!("Watching {}. Press Enter to stop.", file.display());
    if !wait_for_enter(std::io::stdin().lock())? {
        // No terminal to read from; run until the process is killed.
        info!("stdin closed, watching until terminated");
        loop {
            std::thread::park();
        }
    }
    monitor.stop()?;
    Ok(())
}

/// Blocks until a line is read. Returns false if the input is already at EOF.
fn wait_for_enter(mut input: impl BufRead) -> std::io::Result<bool> {
    let mut line = String::new();
    Ok(input.read_line(&mut line)? > 0)
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();

    let config = cli.solver_config()?;
    let solver = CaptchaSolver::from_config(&config).inspect_err(|e| {
        error!(error = %e, "failed to build solver");
    })?;

    match cli.command {
        Command::Solve { images, crop } => {
            run_solve(&solver, &images, crop, cli.json);
            Ok(())
        }
        Command::Watch {
            file,
            interval_ms,
            crop,
        } => run_watch(solver, file, interval_ms, crop, cli.json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_wait_for_enter_distinguishes_eof() {
        assert!(wait_for_enter(Cursor::new(b"\n".to_vec())).unwrap());
        assert!(wait_for_enter(Cursor::new(b"stop\n".to_vec())).unwrap());
        assert!(!wait_for_enter(Cursor::new(Vec::new())).unwrap());
    }
}
