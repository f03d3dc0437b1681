use anyhow::{anyhow, Result};

use crate::frame::Frame;
use crate::ingest::{CameraConfig, FrameSource};

/// Deterministic pattern source for `stub://` URLs.
///
/// Generates frames whose pixels vary with the frame counter, which is
/// enough to exercise the capture-to-present pipeline without hardware.
pub struct SyntheticSource {
    config: CameraConfig,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(config: CameraConfig) -> Self {
        log::info!("SyntheticSource: serving {} (synthetic)", config.url);
        Self {
            config,
            frame_count: 0,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn try_next_frame(&mut self) -> Result<Option<Frame>> {
        self.frame_count += 1;

        let pixel_count = (self.config.width as usize)
            .checked_mul(self.config.height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count) % 256) as u8;
        }

        let frame = Frame::new(pixels, self.config.width, self.config.height)?;
        Ok(Some(frame))
    }

    fn frames_captured(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraConfig {
        CameraConfig {
            url: "stub://test".to_string(),
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn synthetic_source_produces_frames() -> Result<()> {
        let mut source = SyntheticSource::new(stub_config());

        let frame = source.try_next_frame()?.expect("synthetic frame");
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 48);
        assert_eq!(source.frames_captured(), 1);

        Ok(())
    }

    #[test]
    fn synthetic_source_rejects_overflowing_dimensions() {
        let mut source = SyntheticSource::new(CameraConfig {
            url: "stub://test".to_string(),
            width: u32::MAX,
            height: u32::MAX,
        });
        assert!(source.try_next_frame().is_err());
    }

    #[test]
    fn synthetic_frames_vary_across_captures() -> Result<()> {
        let mut source = SyntheticSource::new(stub_config());

        let first = source.try_next_frame()?.expect("first frame");
        let second = source.try_next_frame()?.expect("second frame");
        assert_ne!(first.pixels(), second.pixels());

        Ok(())
    }
}
