//! Thread boundary between a running pipeline and whoever observes it.
//!
//! The driver publishes `PipelineEvent`s on an optional crossbeam channel so a
//! CLI progress printer or a test can follow a run without polling.

use crate::pipeline::state::RunState;
use crate::pipeline::stats::StageKind;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Messages sent from the driver to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// The run moved to a new state.
    StateChanged(RunState),

    /// A stage exited cleanly after handling `items` items.
    StageFinished { stage: StageKind, items: u64 },

    /// A stage exited with an error or panicked.
    StageFailed { stage: StageKind, message: String },
}

/// Sending half used by the driver. Sends never block and are dropped
/// silently once every receiver is gone.
#[derive(Debug, Clone, Default)]
pub struct EventBridge {
    tx: Option<Sender<PipelineEvent>>,
}

impl EventBridge {
    /// Bridge that discards every event.
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    /// Create a bridge and the receiver that observes it.
    pub fn channel() -> (Self, Receiver<PipelineEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn from_sender(tx: Sender<PipelineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn send(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
