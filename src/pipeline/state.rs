//! Run state machine.
//!
//! ```text
//! NotStarted ──► Running ──► Draining ──► Completed
//!                   │            │
//!                   └────────────┴──► Failed | Cancelled
//! ```
//!
//! `Draining` begins once the source stage has exited. `Completed` requires
//! all three stages to have exited cleanly and both queues to be finished
//! and empty.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running,
    Draining,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    /// Check if this state transition is valid
    pub fn can_transition_to(&self, target: RunState) -> bool {
        use RunState::*;

        match (self, target) {
            (NotStarted, Running) => true,
            // Thread spawn failure before every stage is up.
            (NotStarted, Failed) => true,

            (Running, Draining) => true,
            (Running, Failed) | (Running, Cancelled) => true,

            (Draining, Completed) => true,
            (Draining, Failed) | (Draining, Cancelled) => true,

            _ => false,
        }
    }

    /// Whether the run has ended, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Failed | RunState::Cancelled
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            RunState::NotStarted => "Not started",
            RunState::Running => "Running",
            RunState::Draining => "Draining",
            RunState::Completed => "Completed",
            RunState::Failed => "Failed",
            RunState::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
