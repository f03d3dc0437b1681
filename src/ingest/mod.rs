//! Frame acquisition sources.
//!
//! The detection loop pulls frames through the `FrameSource` seam. A
//! synthetic source (for `stub://` URLs) ships with the crate for tests and
//! development; real camera transports live behind the same trait and are
//! out of scope here.

mod synthetic;

pub use synthetic::SyntheticSource;

use anyhow::{bail, Result};

use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Source URL (e.g. `stub://bench_camera`).
    pub url: String,
    /// Frame width for synthetic sources.
    pub width: u32,
    /// Frame height for synthetic sources.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            url: "stub://camera".to_string(),
            width: 1280,
            height: 960,
        }
    }
}

/// A stream of frames at an external cadence.
pub trait FrameSource: Send {
    /// Try to acquire the next frame.
    ///
    /// `Ok(None)` means no frame was available this instant; the caller
    /// retries immediately on the next cycle, with no backoff.
    fn try_next_frame(&mut self) -> Result<Option<Frame>>;

    /// Frames produced so far.
    fn frames_captured(&self) -> u64;
}

/// Build a source from config. Only `stub://` URLs are supported without a
/// real camera transport compiled in.
pub fn open_source(config: &CameraConfig) -> Result<Box<dyn FrameSource>> {
    if config.url.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(config.clone())));
    }
    bail!(
        "no camera transport available for '{}' (only stub:// sources are built in)",
        config.url
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_source_accepts_stub_urls() {
        let config = CameraConfig {
            url: "stub://test".to_string(),
            ..CameraConfig::default()
        };
        assert!(open_source(&config).is_ok());
    }

    #[test]
    fn open_source_rejects_unknown_transports() {
        let config = CameraConfig {
            url: "rtsp://camera-1".to_string(),
            ..CameraConfig::default()
        };
        assert!(open_source(&config).is_err());
    }
}
