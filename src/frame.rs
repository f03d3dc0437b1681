//! Frame container shared between the capture worker and the presenter.
//!
//! Frames cross a thread boundary once per detection cycle, so the pixel
//! buffer is reference-counted: cloning a `Frame` is a pointer copy, not a
//! pixel copy.

use std::sync::Arc;

use anyhow::{anyhow, Result};

/// One captured frame, RGB24, tightly packed rows.
#[derive(Clone, Debug)]
pub struct Frame {
    pixels: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap a pixel buffer. The buffer must hold exactly `width * height`
    /// RGB triples.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels: Arc::new(pixels),
            width,
            height,
        })
    }

    /// Read-only pixel data, row-major RGB.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// True for degenerate frames (a failed capture can report 0x0).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_wrong_buffer_length() {
        assert!(Frame::new(vec![0u8; 11], 2, 2).is_err());
        assert!(Frame::new(vec![0u8; 12], 2, 2).is_ok());
    }

    #[test]
    fn frame_clone_shares_pixels() {
        let frame = Frame::new(vec![7u8; 12], 2, 2).unwrap();
        let copy = frame.clone();
        assert_eq!(copy.pixels().as_ptr(), frame.pixels().as_ptr());
    }

    #[test]
    fn zero_sized_frame_is_empty() {
        let frame = Frame::new(Vec::new(), 0, 0).unwrap();
        assert!(frame.is_empty());
    }
}
