//! SourceStage: pulls payloads from an `ItemSource` and numbers them.

use crate::pipeline::cancel::CancelToken;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::node::ItemSource;
use crate::pipeline::packet::Item;
use crate::pipeline::queue::HandoffQueue;
use crate::pipeline::stats::StageCounters;
use std::sync::Arc;

/// Assigns sequence indices 0, 1, 2, ... and pushes items into queue A.
pub struct SourceStage<P, S> {
    source: S,
    output: Arc<HandoffQueue<Item<P>>>,
    cancel: CancelToken,
    counters: Arc<StageCounters>,
}

impl<P, S> SourceStage<P, S>
where
    S: ItemSource<P>,
{
    pub fn new(
        source: S,
        output: Arc<HandoffQueue<Item<P>>>,
        cancel: CancelToken,
        counters: Arc<StageCounters>,
    ) -> Self {
        Self {
            source,
            output,
            cancel,
            counters,
        }
    }

    /// Run until the source is exhausted. Returns the number of items produced.
    ///
    /// Queue A is marked finished on every exit path.
    pub fn run(mut self) -> PipelineResult<u64> {
        let _finish = HandoffQueue::finish_on_drop(self.output.clone());
        let _panic_guard = self.cancel.cancel_on_panic();
        tracing::debug!("Source stage started ({})", self.source.describe());

        let mut next_index = 0u64;
        loop {
            if self.cancel.is_cancelled() {
                tracing::debug!("Source stage cancelled after {} items", next_index);
                return Err(PipelineError::Cancelled);
            }

            match self.source.next_item() {
                Ok(Some(payload)) => {
                    self.output.push(Item::new(next_index, payload));
                    self.counters.record_read();
                    tracing::trace!("Read item {}", next_index);
                    next_index += 1;
                }
                Ok(None) => break,
                Err(source) => {
                    tracing::error!("Source read failed at item {}: {}", next_index, source);
                    self.cancel.cancel();
                    return Err(PipelineError::Source {
                        index: next_index,
                        source,
                    });
                }
            }
        }

        tracing::debug!("Source exhausted after {} items", next_index);
        Ok(next_index)
    }
}
