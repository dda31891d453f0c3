//! Test data builders for creating test objects

use framecipher::Frame;
use std::path::Path;

/// Builder for creating test Frames
pub struct FrameBuilder {
    width: u32,
    height: u32,
    seed: u8,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            width: 4,
            height: 4,
            seed: 0,
        }
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Varies the pixel pattern so frames built with different seeds differ.
    pub fn seed(mut self, seed: u8) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Frame {
        let len = (self.width * self.height * 3) as usize;
        let data = (0..len)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(self.seed))
            .collect();
        Frame::new(self.width, self.height, data).unwrap()
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `count` distinct frames of one size.
pub fn frame_sequence(count: usize, width: u32, height: u32) -> Vec<Frame> {
    (0..count)
        .map(|i| FrameBuilder::new().size(width, height).seed(i as u8).build())
        .collect()
}

/// Write `frames` back to back as a raw RGB24 file.
pub fn write_raw_video(path: &Path, frames: &[Frame]) {
    let bytes: Vec<u8> = frames.iter().flat_map(|f| f.data.iter().copied()).collect();
    std::fs::write(path, bytes).unwrap();
}

/// Split a raw RGB24 file into frames.
pub fn read_raw_video(path: &Path, width: u32, height: u32) -> Vec<Frame> {
    let bytes = std::fs::read(path).unwrap();
    bytes
        .chunks((width * height * 3) as usize)
        .map(|chunk| Frame::new(width, height, chunk.to_vec()).unwrap())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_builder() {
        let frame = FrameBuilder::new().size(2, 3).seed(1).build();
        assert_eq!(frame.width, 2);
        assert_eq!(frame.height, 3);
        assert_eq!(frame.data.len(), 18);
        assert_ne!(frame, FrameBuilder::new().size(2, 3).seed(2).build());
    }
}
