//! TransformStage: applies the transform to in-range items and forwards all of them.

use crate::pipeline::cancel::CancelToken;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::node::Transform;
use crate::pipeline::packet::Item;
use crate::pipeline::queue::{HandoffQueue, Popped};
use crate::pipeline::range::IndexRange;
use crate::pipeline::stats::StageCounters;
use std::sync::Arc;

/// Counts from a finished transform stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformTally {
    pub forwarded: u64,
    pub transformed: u64,
}

/// Pops from queue A, transforms items whose index lies in `range`, pushes
/// every item to queue B in the order it was popped.
///
/// Items are processed strictly one at a time, so a slow transform on item
/// `k` delays item `k + 1` even when `k + 1` is outside the range.
pub struct TransformStage<P, T> {
    transform: T,
    range: IndexRange,
    input: Arc<HandoffQueue<Item<P>>>,
    output: Arc<HandoffQueue<Item<P>>>,
    cancel: CancelToken,
    counters: Arc<StageCounters>,
}

impl<P, T> TransformStage<P, T>
where
    T: Transform<P>,
{
    pub fn new(
        transform: T,
        range: IndexRange,
        input: Arc<HandoffQueue<Item<P>>>,
        output: Arc<HandoffQueue<Item<P>>>,
        cancel: CancelToken,
        counters: Arc<StageCounters>,
    ) -> Self {
        Self {
            transform,
            range,
            input,
            output,
            cancel,
            counters,
        }
    }

    /// Run until queue A reports end-of-stream. Queue B is marked finished on
    /// every exit path.
    pub fn run(mut self) -> PipelineResult<TransformTally> {
        let _finish = HandoffQueue::finish_on_drop(self.output.clone());
        // Dropped before `_finish`, so a panic cancels before the latch is set.
        let _panic_guard = self.cancel.cancel_on_panic();
        tracing::debug!(
            "Transform stage started ({} on {})",
            self.transform.name(),
            self.range
        );

        let mut tally = TransformTally::default();
        loop {
            match self.input.pop_cancellable(&self.cancel) {
                Popped::Item(mut item) => {
                    let selected = self.range.contains(item.index);
                    if selected {
                        self.transform.apply(&mut item.payload);
                        tally.transformed += 1;
                        tracing::trace!("Transformed item {}", item.index);
                    }
                    self.output.push(item);
                    tally.forwarded += 1;
                    self.counters.record_forwarded(selected);
                }
                Popped::EndOfStream => break,
                Popped::Cancelled => {
                    tracing::debug!(
                        "Transform stage cancelled after {} items",
                        tally.forwarded
                    );
                    return Err(PipelineError::Cancelled);
                }
            }
        }

        tracing::debug!(
            "Transform stage finished: {} forwarded, {} transformed",
            tally.forwarded,
            tally.transformed
        );
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::node::transform_fn;

    type Queue = Arc<HandoffQueue<Item<u32>>>;

    fn filled(values: &[u32]) -> Queue {
        let q = Arc::new(HandoffQueue::new());
        for (i, v) in values.iter().enumerate() {
            q.push(Item::new(i as u64, *v));
        }
        q.mark_finished();
        q
    }

    fn run(input: Queue, range: IndexRange) -> (PipelineResult<TransformTally>, Vec<Item<u32>>) {
        let output = Arc::new(HandoffQueue::new());
        let stage = TransformStage::new(
            transform_fn("negate", |v: &mut u32| *v = !*v),
            range,
            input,
            output.clone(),
            CancelToken::new(),
            Arc::new(StageCounters::new()),
        );
        let result = stage.run();
        assert!(output.is_finished());
        let items = std::iter::from_fn(|| output.pop()).collect();
        (result, items)
    }

    #[test]
    fn test_only_in_range_items_are_transformed() {
        let (result, items) = run(filled(&[0; 10]), IndexRange::new(3, 6));
        assert_eq!(
            result.unwrap(),
            TransformTally {
                forwarded: 10,
                transformed: 4
            }
        );
        for item in &items {
            let expected = if (3..=6).contains(&item.index) { !0 } else { 0 };
            assert_eq!(item.payload, expected, "item {}", item.index);
        }
        let indices: Vec<_> = items.iter().map(|i| i.index).collect();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_inverted_range_forwards_unchanged() {
        let values: Vec<u32> = (100..110).collect();
        let (result, items) = run(filled(&values), IndexRange::new(5, 2));
        assert_eq!(result.unwrap().transformed, 0);
        let payloads: Vec<_> = items.iter().map(|i| i.payload).collect();
        assert_eq!(payloads, values);
    }

    #[test]
    fn test_empty_input_finishes_output() {
        let (result, items) = run(filled(&[]), IndexRange::all());
        assert_eq!(result.unwrap(), TransformTally::default());
        assert!(items.is_empty());
    }

    #[test]
    fn test_cancelled_stage_still_finishes_output() {
        let input: Queue = Arc::new(HandoffQueue::with_poll_interval(
            std::time::Duration::from_millis(5),
        ));
        let output: Queue = Arc::new(HandoffQueue::new());
        let cancel = CancelToken::new();
        cancel.cancel();
        let stage = TransformStage::new(
            transform_fn("noop", |_: &mut u32| {}),
            IndexRange::all(),
            input,
            output.clone(),
            cancel,
            Arc::new(StageCounters::new()),
        );
        assert!(matches!(stage.run(), Err(PipelineError::Cancelled)));
        assert!(output.is_drained());
    }
}
