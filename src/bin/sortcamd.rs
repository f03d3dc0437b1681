//! sortcamd - waste sorting overlay daemon
//!
//! This daemon:
//! 1. Acquires frames from the configured camera source
//! 2. Runs model inference and decodes the raw detection tensor
//! 3. Maps detected labels to waste categories
//! 4. Drives the two-mode display controller (placeholder vs. annotated frame)
//!
//! Rendering here is a logging surface; a real deployment plugs its painter
//! into the same `RenderSurface` seam.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use sortcam::{
    open_source, Decoder, DetectionLoop, InferenceBackend, LoopConfig, PresentationController,
    PresenterConfig, RenderRequest, RenderSurface, SortcamConfig, StubBackend,
};

#[derive(Debug, Parser)]
#[command(name = "sortcamd", about = "camera-driven waste sorting overlay daemon")]
struct Args {
    /// Path to a JSON config file.
    #[arg(long, env = "SORTCAM_CONFIG")]
    config: Option<PathBuf>,

    /// Camera source URL (overrides config).
    #[arg(long)]
    camera_url: Option<String>,

    /// Initial confidence threshold in [0, 1] (overrides config).
    #[arg(long)]
    threshold: Option<f32>,

    /// ONNX model path (overrides config; needs the backend-tract feature).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Disable the FPS overlay text.
    #[arg(long)]
    hide_fps: bool,
}

/// Render surface that narrates display changes to the log.
struct LogSurface;

impl RenderSurface for LogSurface {
    fn show_placeholder(&mut self) {
        log::info!("display: placeholder loop playing");
    }

    fn show_detection(&mut self, request: RenderRequest) {
        let b = request.bbox;
        match request.fps_text {
            Some(fps) => log::info!(
                "display: this is {} box=({},{} {}x{}) [{}]",
                request.category_text,
                b.x,
                b.y,
                b.w,
                b.h,
                fps
            ),
            None => log::info!(
                "display: this is {} box=({},{} {}x{})",
                request.category_text,
                b.x,
                b.y,
                b.w,
                b.h
            ),
        }
    }
}

fn build_backend(cfg: &SortcamConfig) -> Result<Box<dyn InferenceBackend>> {
    match &cfg.model.path {
        Some(path) => {
            #[cfg(feature = "backend-tract")]
            {
                let backend = sortcam::TractBackend::new(path, cfg.model.reference_size)?;
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                Err(anyhow!(
                    "model path {} configured, but sortcamd was built without the backend-tract feature",
                    path.display()
                ))
            }
        }
        None => {
            log::warn!("no model configured, using the stub inference backend");
            Ok(Box::new(StubBackend::new(cfg.model.reference_size)))
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Some(path) = &args.config {
        std::env::set_var("SORTCAM_CONFIG", path);
    }

    let mut cfg = SortcamConfig::load()?;
    if let Some(url) = args.camera_url {
        cfg.camera.url = url;
    }
    if let Some(threshold) = args.threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!("--threshold must be in [0, 1]"));
        }
        cfg.threshold = threshold;
    }
    if let Some(model) = args.model {
        cfg.model.path = Some(model);
    }

    let class_names = cfg.class_names()?;
    log::info!(
        "sortcamd starting: camera={} classes={} threshold={:.2}",
        cfg.camera.url,
        class_names.len(),
        cfg.threshold
    );

    let source = open_source(&cfg.camera)?;
    let backend = build_backend(&cfg)?;
    let decoder = Decoder::new(class_names);
    let loop_config = LoopConfig {
        cycle_interval: cfg.cycle_interval,
        channel_capacity: cfg.channel_capacity,
    };

    let mut handle =
        DetectionLoop::new(source, backend, decoder, loop_config).spawn(cfg.threshold);
    let events = handle
        .take_events()
        .ok_or_else(|| anyhow!("event receiver already taken"))?;

    let stop = handle.stop_trigger();
    ctrlc::set_handler(move || {
        log::info!("shutdown requested");
        stop.trigger();
    })?;

    let presenter_config = PresenterConfig {
        no_detection_timeout: cfg.no_detection_timeout,
        show_fps: cfg.show_fps && !args.hide_fps,
    };
    let mut controller =
        PresentationController::new(LogSurface, cfg.category_table(), presenter_config);

    // Runs until the worker exits and drops its channel end.
    controller.run(&events);

    handle.stop()?;
    log::info!("sortcamd stopped");
    Ok(())
}
