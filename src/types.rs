//! Core data types for framecipher
//!
//! # Main Types
//!
//! - [`Frame`] - One decoded video frame as packed RGB24 bytes
//! - [`VideoInfo`] - Resolution, rate and length of an input stream
//!
//! # Pixel Layout
//!
//! Frames are row-major, three bytes per pixel (`R`, `G`, `B`), with no row
//! padding. A `width x height` frame therefore holds exactly
//! `width * height * 3` bytes; constructors reject anything else.

use crate::error::{FrameCipherError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytes per pixel in packed RGB24.
pub const BYTES_PER_PIXEL: usize = 3;

/// A decoded frame. Owns its pixel buffer outright; `Clone` copies it.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Wrap `data` as a `width x height` RGB24 frame.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = Self::expected_len(width, height)?;
        if data.len() != expected {
            return Err(FrameCipherError::Frame(format!(
                "{}x{} frame needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// All-black frame.
    pub fn zeroed(width: u32, height: u32) -> Result<Self> {
        let len = Self::expected_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Byte length of a `width x height` RGB24 frame.
    pub fn expected_len(width: u32, height: u32) -> Result<usize> {
        if width == 0 || height == 0 {
            return Err(FrameCipherError::Frame(format!(
                "Frame dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| {
                FrameCipherError::Frame(format!("Frame size {}x{} overflows", width, height))
            })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Pixel at `(x, y)` as `[r, g, b]`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = &self.data[offset..offset + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2]])
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Properties of an input stream, as reported before a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame_count: u64,
}

impl VideoInfo {
    /// Stream length in seconds, or 0 when the rate is unknown.
    pub fn duration_secs(&self) -> f64 {
        if self.fps > 0.0 {
            self.frame_count as f64 / self.fps
        } else {
            0.0
        }
    }
}

impl fmt::Display for VideoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @ {} fps, {} frames ({:.2}s)",
            self.width,
            self.height,
            self.fps,
            self.frame_count,
            self.duration_secs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new_validates_length() {
        assert!(Frame::new(2, 2, vec![0; 12]).is_ok());
        assert!(matches!(
            Frame::new(2, 2, vec![0; 11]),
            Err(FrameCipherError::Frame(_))
        ));
        assert!(Frame::new(0, 2, vec![]).is_err());
    }

    #[test]
    fn test_zeroed_frame() {
        let frame = Frame::zeroed(4, 3).unwrap();
        assert_eq!(frame.pixel_count(), 12);
        assert_eq!(frame.byte_len(), 36);
        assert!(frame.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_clone_is_deep() {
        let original = Frame::zeroed(1, 1).unwrap();
        let mut copy = original.clone();
        copy.data[0] = 0xff;
        assert_eq!(original.data[0], 0);
        assert_ne!(original, copy);
    }

    #[test]
    fn test_pixel_lookup() {
        let frame = Frame::new(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(frame.pixel(0, 0), Some([1, 2, 3]));
        assert_eq!(frame.pixel(1, 0), Some([4, 5, 6]));
        assert_eq!(frame.pixel(2, 0), None);
    }

    #[test]
    fn test_debug_omits_pixels() {
        let frame = Frame::zeroed(2, 2).unwrap();
        assert_eq!(format!("{:?}", frame), "Frame { width: 2, height: 2, bytes: 12 }");
    }

    #[test]
    fn test_video_info_display() {
        let info = VideoInfo {
            width: 640,
            height: 480,
            fps: 25.0,
            frame_count: 50,
        };
        assert_eq!(info.duration_secs(), 2.0);
        assert_eq!(info.to_string(), "640x480 @ 25 fps, 50 frames (2.00s)");
    }
}
