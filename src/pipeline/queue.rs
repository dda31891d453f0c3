//! Blocking hand-off queue between adjacent stages.
//!
//! `HandoffQueue<T>` is an unbounded FIFO with a one-shot `finished` latch.
//! `push` never blocks; `pop` blocks until an item is available or the queue
//! is finished and empty. Items are moved in and moved out, so no two stages
//! can ever observe the same item.
//!
//! ```text
//! producer ──push──► [ VecDeque<T> | finished ] ──pop──► consumer
//!                          ▲
//!                 FinishOnDrop (held by producer)
//! ```

use crate::pipeline::cancel::CancelToken;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Default interval at which a cancellable pop re-checks its token.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Outcome of [`HandoffQueue::pop_cancellable`].
#[derive(Debug, PartialEq, Eq)]
pub enum Popped<T> {
    /// The head item, in FIFO order.
    Item(T),
    /// The queue is finished and no items remain.
    EndOfStream,
    /// The token was tripped before an item became available.
    Cancelled,
}

/// Counters describing a queue's lifetime traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pushed: u64,
    pub popped: u64,
    /// Largest number of items held at once.
    pub peak_len: usize,
}

struct Inner<T> {
    items: VecDeque<T>,
    finished: bool,
    stats: QueueStats,
}

/// Unbounded blocking FIFO with a monotonic `finished` latch.
pub struct HandoffQueue<T> {
    inner: Mutex<Inner<T>>,
    available: Condvar,
    poll_interval: Duration,
}

impl<T> HandoffQueue<T> {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    /// Create a queue whose cancellable pops re-check their token every `poll_interval`.
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                finished: false,
                stats: QueueStats::default(),
            }),
            available: Condvar::new(),
            poll_interval,
        }
    }

    /// Append `item` to the tail and wake one waiting popper.
    ///
    /// Succeeds even after `mark_finished`; producers must stop pushing on
    /// their own once they decide to finish.
    pub fn push(&self, item: T) {
        let mut inner = self.inner.lock();
        inner.items.push_back(item);
        inner.stats.pushed += 1;
        inner.stats.peak_len = inner.stats.peak_len.max(inner.items.len());
        drop(inner);
        self.available.notify_one();
    }

    /// Remove the head item, blocking while the queue is empty and unfinished.
    ///
    /// Returns `None` once the queue is finished and empty (end of stream).
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.items.pop_front() {
                inner.stats.popped += 1;
                return Some(item);
            }
            if inner.finished {
                return None;
            }
            self.available.wait(&mut inner);
        }
    }

    /// Like [`pop`](Self::pop), but gives up with `Popped::Cancelled` once `token` trips.
    ///
    /// Cancellation takes precedence over queued items.
    pub fn pop_cancellable(&self, token: &CancelToken) -> Popped<T> {
        let mut inner = self.inner.lock();
        loop {
            if token.is_cancelled() {
                return Popped::Cancelled;
            }
            if let Some(item) = inner.items.pop_front() {
                inner.stats.popped += 1;
                return Popped::Item(item);
            }
            if inner.finished {
                return Popped::EndOfStream;
            }
            let _ = self.available.wait_for(&mut inner, self.poll_interval);
        }
    }

    /// Set the `finished` latch and wake every waiting popper. Idempotent.
    pub fn mark_finished(&self) {
        let mut inner = self.inner.lock();
        inner.finished = true;
        drop(inner);
        self.available.notify_all();
    }

    pub fn is_finished(&self) -> bool {
        self.inner.lock().finished
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Finished and holding no items.
    pub fn is_drained(&self) -> bool {
        let inner = self.inner.lock();
        inner.finished && inner.items.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        self.inner.lock().stats
    }

    /// Guard that marks `queue` finished when dropped.
    pub fn finish_on_drop(queue: Arc<Self>) -> FinishOnDrop<T> {
        FinishOnDrop { queue }
    }
}

impl<T> Default for HandoffQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for HandoffQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("HandoffQueue")
            .field("len", &inner.items.len())
            .field("finished", &inner.finished)
            .field("stats", &inner.stats)
            .finish()
    }
}

/// Scoped latch release: marks the queue finished on every exit path of the
/// owning stage, including early returns and panics.
pub struct FinishOnDrop<T> {
    queue: Arc<HandoffQueue<T>>,
}

impl<T> FinishOnDrop<T> {
    pub fn queue(&self) -> &HandoffQueue<T> {
        &self.queue
    }
}

impl<T> Drop for FinishOnDrop<T> {
    fn drop(&mut self) {
        self.queue.mark_finished();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_fifo_order() {
        let q = HandoffQueue::new();
        for i in 0..5 {
            q.push(i);
        }
        q.mark_finished();
        let drained: Vec<_> = std::iter::from_fn(|| q.pop()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_finished_empty_returns_end_of_stream() {
        let q: HandoffQueue<u8> = HandoffQueue::new();
        q.mark_finished();
        assert_eq!(q.pop(), None);
        // Latch stays set; pop keeps returning immediately.
        assert_eq!(q.pop(), None);
        assert!(q.is_finished());
        assert!(q.is_drained());
    }

    #[test]
    fn test_pending_items_drain_after_finish() {
        let q = HandoffQueue::new();
        q.push("a");
        q.push("b");
        q.mark_finished();
        assert!(!q.is_drained());
        assert_eq!(q.pop(), Some("a"));
        assert_eq!(q.pop(), Some("b"));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_push_after_finish_still_accepted() {
        let q = HandoffQueue::new();
        q.mark_finished();
        q.push(1);
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_mark_finished_idempotent() {
        let q: HandoffQueue<u8> = HandoffQueue::new();
        q.mark_finished();
        q.mark_finished();
        assert!(q.is_finished());
    }

    #[test]
    fn test_blocked_pop_woken_by_push() {
        let q = Arc::new(HandoffQueue::new());
        let consumer = {
            let q = q.clone();
            thread::spawn(move || q.pop())
        };
        thread::sleep(Duration::from_millis(20));
        q.push(42u32);
        assert_eq!(consumer.join().unwrap(), Some(42));
    }

    #[test]
    fn test_blocked_pop_woken_by_finish() {
        let q: Arc<HandoffQueue<u32>> = Arc::new(HandoffQueue::new());
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let q = q.clone();
                thread::spawn(move || q.pop())
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        q.mark_finished();
        for c in consumers {
            assert_eq!(c.join().unwrap(), None);
        }
    }

    #[test]
    fn test_pop_cancellable_observes_token_without_notify() {
        let q: HandoffQueue<u32> = HandoffQueue::with_poll_interval(Duration::from_millis(5));
        let token = CancelToken::new();
        let canceller = {
            let token = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                token.cancel();
            })
        };
        let start = Instant::now();
        assert_eq!(q.pop_cancellable(&token), Popped::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(5));
        canceller.join().unwrap();
    }

    #[test]
    fn test_pop_cancellable_items_and_end() {
        let q = HandoffQueue::new();
        let token = CancelToken::new();
        q.push(1);
        q.mark_finished();
        assert_eq!(q.pop_cancellable(&token), Popped::Item(1));
        assert_eq!(q.pop_cancellable(&token), Popped::EndOfStream);
    }

    #[test]
    fn test_cancel_takes_precedence_over_items() {
        let q = HandoffQueue::new();
        let token = CancelToken::new();
        q.push(1);
        token.cancel();
        assert_eq!(q.pop_cancellable(&token), Popped::Cancelled);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_finish_on_drop_marks_finished() {
        let q: Arc<HandoffQueue<u8>> = Arc::new(HandoffQueue::new());
        {
            let _guard = HandoffQueue::finish_on_drop(q.clone());
            assert!(!q.is_finished());
        }
        assert!(q.is_finished());
    }

    #[test]
    fn test_finish_on_drop_runs_on_panic() {
        let q: Arc<HandoffQueue<u8>> = Arc::new(HandoffQueue::new());
        let handle = {
            let q = q.clone();
            thread::spawn(move || {
                let _guard = HandoffQueue::finish_on_drop(q);
                panic!("stage blew up");
            })
        };
        assert!(handle.join().is_err());
        assert!(q.is_finished());
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_stats_track_traffic() {
        let q = HandoffQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        q.pop();
        let stats = q.stats();
        assert_eq!(stats.pushed, 3);
        assert_eq!(stats.popped, 1);
        assert_eq!(stats.peak_len, 3);
    }

    #[test]
    fn test_concurrent_producer_consumer_preserves_order() {
        let q = Arc::new(HandoffQueue::new());
        let producer = {
            let q = q.clone();
            thread::spawn(move || {
                let _guard = HandoffQueue::finish_on_drop(q.clone());
                for i in 0..10_000u32 {
                    q.push(i);
                }
            })
        };
        let mut expected = 0u32;
        while let Some(v) = q.pop() {
            assert_eq!(v, expected);
            expected += 1;
        }
        producer.join().unwrap();
        assert_eq!(expected, 10_000);
    }
}
