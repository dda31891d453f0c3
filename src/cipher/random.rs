//! Seeded random XOR cipher.
//!
//! Every byte of every transformed frame is XORed with the next byte from an
//! owned `StdRng`. The generator advances across frames, so decrypting needs
//! the same seed and the same sequence of transformed frames.

use crate::pipeline::Transform;
use crate::types::Frame;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fmt;

pub struct RandomXor {
    rng: StdRng,
    scratch: Vec<u8>,
}

impl RandomXor {
    /// Reproducible keystream.
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Keystream seeded from OS entropy. The output cannot be decrypted.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            scratch: Vec::new(),
        }
    }

    /// XOR `data` with the next `data.len()` keystream bytes.
    pub fn apply_to(&mut self, data: &mut [u8]) {
        self.scratch.resize(data.len(), 0);
        self.rng.fill_bytes(&mut self.scratch);
        for (byte, key) in data.iter_mut().zip(&self.scratch) {
            *byte ^= key;
        }
    }
}

impl Default for RandomXor {
    fn default() -> Self {
        Self::new()
    }
}

// Generator state stays out of logs.
impl fmt::Debug for RandomXor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomXor").finish_non_exhaustive()
    }
}

impl Transform<Frame> for RandomXor {
    fn apply(&mut self, frame: &mut Frame) {
        self.apply_to(&mut frame.data);
    }

    fn name(&self) -> &str {
        "random-xor"
    }
}
