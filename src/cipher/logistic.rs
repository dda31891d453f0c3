//! Logistic-map XOR cipher.
//!
//! Each frame gets a keystream from the logistic map `x <- r * x * (1 - x)`,
//! restarted at `x0` for every frame. Pixel `i` uses the `i`-th iterate
//! `x_i` as key `trunc(x_i * 256)`, narrowed to its low byte (so an iterate of
//! exactly 1.0 keys as 0), XORed into all three of its channels.
//! Applying the cipher twice restores the frame.

use crate::pipeline::Transform;
use crate::types::{Frame, BYTES_PER_PIXEL};

pub const DEFAULT_R: f32 = 3.999;
pub const DEFAULT_X0: f32 = 0.5;

/// Iterator over logistic-map key bytes.
#[derive(Debug, Clone)]
pub struct LogisticMap {
    x: f32,
    r: f32,
}

impl LogisticMap {
    pub fn new(r: f32, x0: f32) -> Self {
        Self { x: x0, r }
    }
}

impl Iterator for LogisticMap {
    type Item = u8;

    #[inline]
    fn next(&mut self) -> Option<u8> {
        self.x = self.r * self.x * (1.0 - self.x);
        // Truncate, then keep the low byte; `as u8` alone saturates 256 to 255.
        Some((self.x * 256.0) as i32 as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticXor {
    r: f32,
    x0: f32,
}

impl LogisticXor {
    pub fn new(r: f32, x0: f32) -> Self {
        Self { r, x0 }
    }

    /// Fresh keystream for one frame.
    pub fn keystream(&self) -> LogisticMap {
        LogisticMap::new(self.r, self.x0)
    }

    /// XOR packed RGB24 bytes in place. A trailing partial pixel is left alone.
    pub fn apply_to(&self, data: &mut [u8]) {
        for (pixel, key) in data.chunks_exact_mut(BYTES_PER_PIXEL).zip(self.keystream()) {
            for channel in pixel {
                *channel ^= key;
            }
        }
    }
}

impl Default for LogisticXor {
    fn default() -> Self {
        Self::new(DEFAULT_R, DEFAULT_X0)
    }
}

impl Transform<Frame> for LogisticXor {
    fn apply(&mut self, frame: &mut Frame) {
        self.apply_to(&mut frame.data);
    }

    fn name(&self) -> &str {
        "logistic-xor"
    }
}
