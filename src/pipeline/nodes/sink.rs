//! SinkStage: terminal consumer handing items to an `ItemSink` in order.

use crate::pipeline::cancel::CancelToken;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::node::ItemSink;
use crate::pipeline::packet::Item;
use crate::pipeline::queue::{HandoffQueue, Popped};
use crate::pipeline::stats::StageCounters;
use std::sync::Arc;

pub struct SinkStage<P, K> {
    sink: K,
    input: Arc<HandoffQueue<Item<P>>>,
    cancel: CancelToken,
    counters: Arc<StageCounters>,
}

impl<P, K> SinkStage<P, K>
where
    K: ItemSink<P>,
{
    pub fn new(
        sink: K,
        input: Arc<HandoffQueue<Item<P>>>,
        cancel: CancelToken,
        counters: Arc<StageCounters>,
    ) -> Self {
        Self {
            sink,
            input,
            cancel,
            counters,
        }
    }

    /// Drain queue B into the sink, then finish the sink.
    ///
    /// A sink error cancels the run; no retry is attempted.
    pub fn run(mut self) -> PipelineResult<u64> {
        let _panic_guard = self.cancel.cancel_on_panic();
        tracing::debug!("Sink stage started");

        let mut written = 0u64;
        loop {
            match self.input.pop_cancellable(&self.cancel) {
                Popped::Item(item) => {
                    let index = item.index;
                    if let Err(source) = self.sink.consume(item) {
                        tracing::error!("Sink failed on item {}: {}", index, source);
                        self.cancel.cancel();
                        return Err(PipelineError::Sink { index, source });
                    }
                    written += 1;
                    self.counters.record_written();
                    tracing::trace!("Wrote item {}", index);
                }
                Popped::EndOfStream => break,
                Popped::Cancelled => {
                    tracing::debug!("Sink stage cancelled after {} items", written);
                    return Err(PipelineError::Cancelled);
                }
            }
        }

        if let Err(e) = self.sink.finish() {
            tracing::error!("Sink failed to finish: {}", e);
            self.cancel.cancel();
            return Err(PipelineError::SinkFinish(e));
        }

        tracing::debug!("Sink stage finished after {} items", written);
        Ok(written)
    }
}
