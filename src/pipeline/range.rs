//! Range policy selecting which items receive the transform.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive index interval `[start, end]`, fixed before a run starts.
///
/// An inverted interval (`start > end`) is empty and matches nothing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexRange {
    pub start: u64,
    pub end: u64,
}

impl IndexRange {
    /// A range that never matches.
    pub const EMPTY: IndexRange = IndexRange { start: 1, end: 0 };

    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Matches every index.
    pub const fn all() -> Self {
        Self {
            start: 0,
            end: u64::MAX,
        }
    }

    /// Derive the range from a frame rate and a time window in seconds.
    ///
    /// Both bounds are truncated toward zero, so a window of 2.0s..4.0s at
    /// 29.97 fps selects frames 59..=119.
    pub fn from_time_window(fps: f64, start_secs: f64, end_secs: f64) -> Self {
        Self {
            start: seconds_to_index(fps, start_secs),
            end: seconds_to_index(fps, end_secs),
        }
    }

    #[inline]
    pub fn contains(&self, index: u64) -> bool {
        self.start <= index && index <= self.end
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Number of indices the range selects.
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start).saturating_add(1)
        }
    }
}

fn seconds_to_index(fps: f64, secs: f64) -> u64 {
    let idx = fps * secs;
    if idx.is_finite() && idx > 0.0 {
        // `as` saturates at u64::MAX for out-of-range floats.
        idx as u64
    } else {
        0
    }
}

impl Default for IndexRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexRange({}..={})", self.start, self.end)
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "[empty]")
        } else {
            write!(f, "[{}, {}]", self.start, self.end)
        }
    }
}
