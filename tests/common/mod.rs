//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use std::time::Duration;

/// Poll interval for pipelines built in tests, so cancellation is observed quickly.
pub fn test_poll_interval() -> Duration {
    Duration::from_millis(5)
}

/// Upper bound on how long any single test run may take before it is
/// considered hung.
pub fn test_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Run `f` on a helper thread and fail the test if it does not return in time.
pub fn with_timeout<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(test_timeout())
        .expect("pipeline did not finish in time (deadlock?)")
}
