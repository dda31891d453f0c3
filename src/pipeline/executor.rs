//! Pipeline driver: wires the queues and owns the stage threads.
//!
//! ```text
//! [source thread] ──► queue A ──► [transform thread] ──► queue B ──► [sink thread]
//! ```
//!
//! `wait` joins the stages in data-flow order. Once the source thread has
//! joined, nothing will ever push to queue A again; once the transform thread
//! has joined, the same holds for queue B. Each stage marks its own output
//! queue finished on exit (see [`FinishOnDrop`](crate::pipeline::queue::FinishOnDrop)),
//! so the driver never has to close a queue on a stage's behalf.

use crate::pipeline::bridge::{EventBridge, PipelineEvent};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::node::{ItemSink, ItemSource, Transform};
use crate::pipeline::nodes::{SinkStage, SourceStage, TransformStage};
use crate::pipeline::packet::Item;
use crate::pipeline::queue::{HandoffQueue, DEFAULT_POLL_INTERVAL};
use crate::pipeline::range::IndexRange;
use crate::pipeline::state::RunState;
use crate::pipeline::stats::{Progress, RunReport, StageCounters, StageKind};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Builder for a [`Pipeline`].
pub struct PipelineBuilder {
    range: IndexRange,
    cancel: Option<CancelToken>,
    events: EventBridge,
    poll_interval: Duration,
}

impl PipelineBuilder {
    pub fn new(range: IndexRange) -> Self {
        Self {
            range,
            cancel: None,
            events: EventBridge::disconnected(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Share an existing token, e.g. one already wired to a Ctrl-C handler.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Publish [`PipelineEvent`]s on `tx`.
    pub fn events(mut self, tx: Sender<PipelineEvent>) -> Self {
        self.events = EventBridge::from_sender(tx);
        self
    }

    /// How often a blocked stage re-checks the cancel token.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            range: self.range,
            cancel: self.cancel.unwrap_or_default(),
            events: self.events,
            poll_interval: self.poll_interval,
        }
    }
}

/// A configured, not yet started, three-stage run.
pub struct Pipeline {
    range: IndexRange,
    cancel: CancelToken,
    events: EventBridge,
    poll_interval: Duration,
}

impl Pipeline {
    pub fn builder(range: IndexRange) -> PipelineBuilder {
        PipelineBuilder::new(range)
    }

    pub fn range(&self) -> IndexRange {
        self.range
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Start the three stage threads and return immediately.
    ///
    /// If a thread cannot be spawned, the stages already running are
    /// cancelled and joined before the error is returned.
    pub fn spawn<P, S, T, K>(
        self,
        source: S,
        transform: T,
        sink: K,
    ) -> PipelineResult<RunningPipeline<P>>
    where
        P: Send + 'static,
        S: ItemSource<P> + 'static,
        T: Transform<P> + 'static,
        K: ItemSink<P> + 'static,
    {
        let queue_a = Arc::new(HandoffQueue::with_poll_interval(self.poll_interval));
        let queue_b = Arc::new(HandoffQueue::with_poll_interval(self.poll_interval));
        let counters = Arc::new(StageCounters::new());
        let lifecycle = Lifecycle {
            state: Arc::new(Mutex::new(RunState::NotStarted)),
            events: self.events.clone(),
        };
        let monitor = PipelineMonitor {
            state: lifecycle.state.clone(),
            counters: counters.clone(),
        };

        tracing::info!(
            "Starting pipeline: range {}, transform '{}'",
            self.range,
            transform.name()
        );

        let source_stage = SourceStage::new(
            source,
            queue_a.clone(),
            self.cancel.clone(),
            counters.clone(),
        );
        let transform_stage = TransformStage::new(
            transform,
            self.range,
            queue_a.clone(),
            queue_b.clone(),
            self.cancel.clone(),
            counters.clone(),
        );
        let sink_stage = SinkStage::new(sink, queue_b.clone(), self.cancel.clone(), counters);

        let mut running = RunningPipeline {
            range: self.range,
            cancel: self.cancel,
            events: self.events,
            lifecycle: lifecycle.clone(),
            monitor,
            queue_a,
            queue_b,
            source: None,
            transform: None,
            sink: None,
            started: Instant::now(),
        };

        // Running before any thread exists, so the source's exit can only
        // ever move the run forward to Draining.
        running.transition(RunState::Running);

        let spawned = spawn_stage(StageKind::Source, move || {
            let result = source_stage.run();
            lifecycle.source_exited();
            result
        })
        .and_then(|source| {
            running.source = Some(source);
            spawn_stage(StageKind::Transform, move || {
                transform_stage.run().map(|tally| tally.forwarded)
            })
        });
        let spawned = spawned.and_then(|transform| {
            running.transform = Some(transform);
            spawn_stage(StageKind::Sink, move || sink_stage.run())
        });

        match spawned {
            Ok(sink) => {
                running.sink = Some(sink);
                Ok(running)
            }
            Err(e) => {
                tracing::error!("{}", e);
                running.abort_started();
                running.transition(RunState::Failed);
                Err(e)
            }
        }
    }

    /// Spawn the stages and block until the run ends.
    pub fn run<P, S, T, K>(self, source: S, transform: T, sink: K) -> PipelineResult<RunReport>
    where
        P: Send + 'static,
        S: ItemSource<P> + 'static,
        T: Transform<P> + 'static,
        K: ItemSink<P> + 'static,
    {
        self.spawn(source, transform, sink)?.wait()
    }
}

type StageHandle = JoinHandle<PipelineResult<u64>>;

fn spawn_stage<F>(stage: StageKind, body: F) -> PipelineResult<StageHandle>
where
    F: FnOnce() -> PipelineResult<u64> + Send + 'static,
{
    thread::Builder::new()
        .name(stage.thread_name())
        .spawn(body)
        .map_err(|source| PipelineError::Spawn { stage, source })
}

/// Clonable read-only view of a run, usable from other threads while
/// [`RunningPipeline::wait`] blocks.
///
/// The source thread moves the run to `Draining` as it exits, so a monitor
/// sees the change without waiting for `wait` to join it.
#[derive(Clone)]
pub struct PipelineMonitor {
    state: Arc<Mutex<RunState>>,
    counters: Arc<StageCounters>,
}

impl PipelineMonitor {
    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    pub fn progress(&self) -> Progress {
        self.counters.snapshot()
    }

    /// The run has reached `Completed`, `Failed` or `Cancelled`.
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }
}

/// Run state shared between the driver and the source thread. Every change
/// is validated and published as a `StateChanged` event.
#[derive(Clone)]
struct Lifecycle {
    state: Arc<Mutex<RunState>>,
    events: EventBridge,
}

impl Lifecycle {
    fn transition(&self, next: RunState) {
        let mut state = self.state.lock();
        if !state.can_transition_to(next) {
            tracing::warn!("Ignoring invalid state transition {} -> {}", *state, next);
            return;
        }
        tracing::debug!("Pipeline state: {} -> {}", *state, next);
        *state = next;
        drop(state);
        self.events.send(PipelineEvent::StateChanged(next));
    }

    /// Queue A will see no more pushes. No-op unless the run is still `Running`.
    fn source_exited(&self) {
        let mut state = self.state.lock();
        if *state != RunState::Running {
            return;
        }
        tracing::debug!("Pipeline state: {} -> {}", *state, RunState::Draining);
        *state = RunState::Draining;
        drop(state);
        self.events.send(PipelineEvent::StateChanged(RunState::Draining));
    }
}

/// Handle to a run whose stage threads are live.
pub struct RunningPipeline<P> {
    range: IndexRange,
    cancel: CancelToken,
    events: EventBridge,
    lifecycle: Lifecycle,
    monitor: PipelineMonitor,
    queue_a: Arc<HandoffQueue<Item<P>>>,
    queue_b: Arc<HandoffQueue<Item<P>>>,
    source: Option<StageHandle>,
    transform: Option<StageHandle>,
    sink: Option<StageHandle>,
    started: Instant,
}

impl<P> RunningPipeline<P> {
    pub fn state(&self) -> RunState {
        self.monitor.state()
    }

    pub fn progress(&self) -> Progress {
        self.monitor.progress()
    }

    pub fn monitor(&self) -> PipelineMonitor {
        self.monitor.clone()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Ask every stage to stop. Blocked stages wake immediately.
    pub fn cancel(&self) {
        self.cancel.cancel();
        // Poppers check the token before the latch, so this only wakes them.
        self.queue_a.mark_finished();
        self.queue_b.mark_finished();
    }

    /// Join source, then transform, then sink, and summarize the run.
    ///
    /// The first stage error that is not itself a consequence of
    /// cancellation is returned; a run that only saw `Cancelled` returns
    /// `PipelineError::Cancelled`.
    pub fn wait(mut self) -> PipelineResult<RunReport> {
        let mut failure: Option<PipelineError> = None;

        let source = self.source.take();
        self.settle(StageKind::Source, source, &mut failure);
        // Already done by the source thread unless it panicked.
        self.lifecycle.source_exited();

        let transform = self.transform.take();
        self.settle(StageKind::Transform, transform, &mut failure);

        let sink = self.sink.take();
        self.settle(StageKind::Sink, sink, &mut failure);

        if failure.is_none() {
            failure = self.check_drained().err();
        }

        if let Some(err) = failure {
            let state = if err.is_cancelled() {
                RunState::Cancelled
            } else {
                RunState::Failed
            };
            tracing::warn!("Pipeline ended {}: {}", state, err);
            self.transition(state);
            return Err(err);
        }

        self.transition(RunState::Completed);
        let report = self.report(RunState::Completed);
        tracing::info!("{}", report);
        Ok(report)
    }

    fn settle(
        &self,
        stage: StageKind,
        handle: Option<StageHandle>,
        failure: &mut Option<PipelineError>,
    ) {
        let Some(handle) = handle else {
            return;
        };

        let result = handle
            .join()
            .unwrap_or(Err(PipelineError::StagePanicked { stage }));

        match result {
            Ok(items) => {
                tracing::debug!("{} stage joined after {} items", stage, items);
                self.events
                    .send(PipelineEvent::StageFinished { stage, items });
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.events.send(PipelineEvent::StageFailed {
                        stage,
                        message: err.to_string(),
                    });
                }
                let replace = match failure {
                    None => true,
                    Some(existing) => existing.is_cancelled() && !err.is_cancelled(),
                };
                if replace {
                    *failure = Some(err);
                }
            }
        }
    }

    fn check_drained(&self) -> PipelineResult<()> {
        if !self.queue_a.is_drained() {
            return Err(PipelineError::Undrained { queue: "A" });
        }
        if !self.queue_b.is_drained() {
            return Err(PipelineError::Undrained { queue: "B" });
        }
        tracing::debug!(
            "Queues drained: A {:?}, B {:?}",
            self.queue_a.stats(),
            self.queue_b.stats()
        );
        Ok(())
    }

    /// Cancel and join whatever was started before a spawn failure.
    fn abort_started(&mut self) {
        self.cancel();
        for handle in [self.source.take(), self.transform.take(), self.sink.take()]
            .into_iter()
            .flatten()
        {
            let _ = handle.join();
        }
    }

    fn transition(&self, next: RunState) {
        self.lifecycle.transition(next);
    }

    fn report(&self, state: RunState) -> RunReport {
        let progress = self.progress();
        RunReport {
            frames_read: progress.read,
            frames_transformed: progress.transformed,
            frames_written: progress.written,
            range: self.range,
            elapsed: self.started.elapsed(),
            state,
        }
    }
}

impl<P> Drop for RunningPipeline<P> {
    fn drop(&mut self) {
        // Dropped without `wait`: stop the stages rather than detach them.
        if !self.state().is_terminal() {
            self.abort_started();
            self.transition(RunState::Cancelled);
        }
    }
}
