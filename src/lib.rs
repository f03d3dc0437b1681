//! sortcam - camera-driven waste sorting overlay.
//!
//! A camera feed is periodically analyzed by an object-detection model;
//! when a recognized object maps to an actionable waste category the
//! original frame is annotated and shown, otherwise a looping placeholder
//! keeps playing.
//!
//! # Module Structure
//!
//! - `frame`: shared RGB frame container
//! - `ingest`: frame sources (`FrameSource` seam, synthetic `stub://` source)
//! - `infer`: inference backends (`InferenceBackend` seam, stub + optional tract)
//! - `detect`: raw `[1, N, D]` tensor view and detection decoding
//! - `category`: label to waste-category mapping
//! - `detector`: the worker loop tying acquisition, inference and decode together
//! - `present`: the debounced two-mode display controller
//!
//! The worker and the presenter communicate over a bounded channel, one
//! direction only: a slow display never stalls frame acquisition.

pub mod category;
pub mod config;
pub mod detect;
pub mod detector;
pub mod frame;
pub mod infer;
pub mod ingest;
pub mod present;

pub use category::{Category, CategoryTable};
pub use config::SortcamConfig;
pub use detect::{BoundingBox, Decoder, Detection, OutputView, Scale};
pub use detector::{
    DetectionEvent, DetectionLoop, DetectorHandle, LoopConfig, StopTrigger, ThresholdHandle,
};
pub use frame::Frame;
pub use infer::{InferenceBackend, RawOutput, StubBackend};
pub use ingest::{open_source, CameraConfig, FrameSource, SyntheticSource};
pub use present::{
    DisplayMode, PresentationController, PresenterConfig, RenderRequest, RenderSurface,
};

#[cfg(feature = "backend-tract")]
pub use infer::TractBackend;
