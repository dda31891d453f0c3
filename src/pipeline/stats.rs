//! Run counters and the end-of-run report.

use crate::pipeline::range::IndexRange;
use crate::pipeline::state::RunState;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Which of the three stages a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Source,
    Transform,
    Sink,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [StageKind::Source, StageKind::Transform, StageKind::Sink];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Source => "source",
            StageKind::Transform => "transform",
            StageKind::Sink => "sink",
        }
    }

    /// Name given to the stage's OS thread.
    pub fn thread_name(&self) -> String {
        format!("framecipher-{}", self.as_str())
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live counters updated by the stages while a run is in progress.
///
/// All fields use relaxed atomics; values are for progress display only.
#[derive(Debug, Default)]
pub struct StageCounters {
    read: AtomicU64,
    transformed: AtomicU64,
    forwarded: AtomicU64,
    written: AtomicU64,
}

impl StageCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_read(&self) {
        self.read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forwarded(&self, transformed: bool) {
        if transformed {
            self.transformed.fetch_add(1, Ordering::Relaxed);
        }
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Progress {
        Progress {
            read: self.read.load(Ordering::Relaxed),
            transformed: self.transformed.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`StageCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub read: u64,
    pub transformed: u64,
    pub forwarded: u64,
    pub written: u64,
}

impl Progress {
    /// Items read by the source but not yet written by the sink.
    pub fn in_flight(&self) -> u64 {
        self.read.saturating_sub(self.written)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} read, {} transformed, {} written ({} in flight)",
            self.read,
            self.transformed,
            self.written,
            self.in_flight()
        )
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub frames_read: u64,
    pub frames_transformed: u64,
    pub frames_written: u64,
    pub range: IndexRange,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub state: RunState,
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl RunReport {
    /// Throughput over the whole run.
    pub fn frames_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            0.0
        } else {
            self.frames_written as f64 / secs
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} frames read, {} transformed in {}, {} written in {}ms ({:.1} fps)",
            self.state,
            self.frames_read,
            self.frames_transformed,
            self.range,
            self.frames_written,
            self.elapsed.as_millis(),
            self.frames_per_second()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let c = StageCounters::new();
        c.record_read();
        c.record_read();
        c.record_forwarded(true);
        c.record_forwarded(false);
        c.record_written();
        let p = c.snapshot();
        assert_eq!(p.read, 2);
        assert_eq!(p.transformed, 1);
        assert_eq!(p.forwarded, 2);
        assert_eq!(p.written, 1);
        assert_eq!(p.in_flight(), 1);
    }

    #[test]
    fn test_report_serializes_millis() {
        let report = RunReport {
            frames_read: 10,
            frames_transformed: 4,
            frames_written: 10,
            range: IndexRange::new(3, 6),
            elapsed: Duration::from_millis(1500),
            state: RunState::Completed,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["elapsed_ms"], 1500);
        assert_eq!(json["state"], "completed");
        assert_eq!(json["range"]["start"], 3);
        assert!((report.frames_per_second() - 6.666).abs() < 0.01);
    }

    #[test]
    fn test_stage_thread_names() {
        let names: Vec<_> = StageKind::ALL.iter().map(|s| s.thread_name()).collect();
        assert_eq!(
            names,
            vec![
                "framecipher-source",
                "framecipher-transform",
                "framecipher-sink"
            ]
        );
    }
}
