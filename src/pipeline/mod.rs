//! Three-stage concurrent pipeline with selective, order-preserving transforms.
//!
//! Items flow Source → Transform → Sink, each stage on its own OS thread,
//! connected by blocking hand-off queues. Only items whose sequence index
//! falls inside the run's [`IndexRange`] are transformed; every item is
//! forwarded, in source order.
//!
//! # Architecture
//!
//! ```text
//! ItemSource ──► [SourceStage] ──► queue A ──► [TransformStage] ──► queue B ──► [SinkStage] ──► ItemSink
//!                     │                              │                              │
//!                     └──────────── CancelToken / StageCounters / EventBridge ──────┘
//! ```
//!
//! # Design
//!
//! - **Move-only hand-off**: `push` takes the item by value and `pop` returns it,
//!   so no two stages can alias a payload.
//! - **Structural close**: each stage holds a `FinishOnDrop` guard for its output
//!   queue; the latch is set on return, early error and panic alike.
//! - **Read errors are not exhaustion**: `ItemSource::next_item` returns
//!   `Result<Option<P>, _>`, and a read failure fails the run.
//! - **Cooperative cancellation**: one `CancelToken` per run, observed between
//!   items and inside every queue wait.

pub mod bridge;
pub mod cancel;
pub mod error;
pub mod executor;
pub mod node;
pub mod nodes;
pub mod packet;
pub mod queue;
pub mod range;
pub mod state;
pub mod stats;

pub use bridge::{EventBridge, PipelineEvent};
pub use cancel::CancelToken;
pub use error::{BoxError, PipelineError, PipelineResult};
pub use executor::{Pipeline, PipelineBuilder, PipelineMonitor, RunningPipeline};
pub use node::{transform_fn, FnTransform, ItemSink, ItemSource, IterSource, Transform, VecSink};
pub use packet::Item;
pub use queue::{HandoffQueue, Popped, QueueStats};
pub use range::IndexRange;
pub use state::RunState;
pub use stats::{Progress, RunReport, StageKind};
