//! Mock construction helpers

use framecipher::pipeline::{BoxError, Item, ItemSink, ItemSource, Transform};
use mockall::mock;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Sink {}

    impl ItemSink<u32> for Sink {
        fn consume(&mut self, item: Item<u32>) -> Result<(), BoxError>;
        fn finish(&mut self) -> Result<(), BoxError>;
    }
}

/// Sink that records into shared storage, so tests can inspect it after the
/// pipeline has consumed the sink.
pub struct SharedSink<P> {
    items: Arc<Mutex<Vec<Item<P>>>>,
    finished: Arc<AtomicBool>,
    delay: Duration,
}

impl<P> SharedSink<P> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
            finished: Arc::new(AtomicBool::new(false)),
            delay: Duration::ZERO,
        }
    }

    /// Sleep this long in every `consume`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn items(&self) -> Arc<Mutex<Vec<Item<P>>>> {
        self.items.clone()
    }

    pub fn finished_flag(&self) -> Arc<AtomicBool> {
        self.finished.clone()
    }
}

impl<P: Send> ItemSink<P> for SharedSink<P> {
    fn consume(&mut self, item: Item<P>) -> Result<(), BoxError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.items.lock().push(item);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BoxError> {
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Yields `0..fail_at` and then returns a read error.
pub struct FailingSource {
    next: u32,
    fail_at: u32,
}

impl FailingSource {
    pub fn new(fail_at: u32) -> Self {
        Self { next: 0, fail_at }
    }
}

impl ItemSource<u32> for FailingSource {
    fn next_item(&mut self) -> Result<Option<u32>, BoxError> {
        if self.next == self.fail_at {
            return Err(format!("read error at {}", self.next).into());
        }
        self.next += 1;
        Ok(Some(self.next - 1))
    }

    fn describe(&self) -> String {
        format!("failing source (fails at {})", self.fail_at)
    }
}

/// Transform that records every payload it sees and replaces it with `!payload`.
pub struct RecordingTransform {
    seen: Arc<Mutex<Vec<u32>>>,
    delay: Duration,
}

impl RecordingTransform {
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn seen(&self) -> Arc<Mutex<Vec<u32>>> {
        self.seen.clone()
    }
}

impl Transform<u32> for RecordingTransform {
    fn apply(&mut self, payload: &mut u32) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.seen.lock().push(*payload);
        *payload = !*payload;
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Transform that panics on its `n`-th call.
pub struct PanickingTransform {
    calls: AtomicUsize,
    panic_on: usize,
}

impl PanickingTransform {
    pub fn new(panic_on: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            panic_on,
        }
    }
}

impl Transform<u32> for PanickingTransform {
    fn apply(&mut self, _payload: &mut u32) {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.panic_on {
            panic!("transform blew up");
        }
    }
}
