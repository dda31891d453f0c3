//! Stage bodies. Each runs on its own thread for the lifetime of one run.
//!
//! ```text
//! [SourceStage] ──queue A──► [TransformStage] ──queue B──► [SinkStage]
//! ```
//!
//! Every stage that owns an output queue holds a `FinishOnDrop` guard for it,
//! so the downstream stage always sees end-of-stream however the upstream
//! stage exits.

pub mod sink;
pub mod source;
pub mod transform;

pub use sink::SinkStage;
pub use source::SourceStage;
pub use transform::{TransformStage, TransformTally};
