//! Readiness barrier: "await N signals" (spec §9 "Thread-per-stripe to
//! N-task model"), used so the coordinator never tells its peer to connect
//! before every local server-side stripe worker is actually listening
//! (spec §4.3 "Readiness barrier").

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// A counting barrier initialized to `n`; each server-role stripe worker
/// calls [`ReadinessBarrier::arrive`] once its listening socket is bound,
/// and the coordinator calls [`ReadinessBarrier::wait_all`] before
/// dispatching the RPC that tells the peer to connect.
#[derive(Debug)]
pub struct ReadinessBarrier {
    state: Mutex<usize>,
    target: usize,
    condvar: Condvar,
}

impl ReadinessBarrier {
    /// Creates a barrier that releases once `target` workers have arrived.
    pub fn new(target: usize) -> Self {
        Self {
            state: Mutex::new(0),
            target,
            condvar: Condvar::new(),
        }
    }

    /// Signals that one worker has reached the ready state.
    pub fn arrive(&self) {
        let mut count = self.state.lock().unwrap();
        *count += 1;
        if *count >= self.target {
            self.condvar.notify_all();
        }
    }

    /// Blocks until all `target` workers have arrived.
    pub fn wait_all(&self) {
        let mut count = self.state.lock().unwrap();
        while *count < self.target {
            count = self.condvar.wait(count).unwrap();
        }
    }

    /// Blocks until all `target` workers have arrived or `timeout` elapses,
    /// returning whether the barrier actually released.
    pub fn wait_all_timeout(&self, timeout: Duration) -> bool {
        let mut count = self.state.lock().unwrap();
        while *count < self.target {
            let (guard, result) = self.condvar.wait_timeout(count, timeout).unwrap();
            count = guard;
            if result.timed_out() {
                return *count >= self.target;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::ReadinessBarrier;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn releases_only_after_all_arrive() {
        let barrier = Arc::new(ReadinessBarrier::new(3));
        let mut handles = Vec::new();
        for _ in 0..3 {
            let barrier = Arc::clone(&barrier);
            handles.push(std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                barrier.arrive();
            }));
        }
        barrier.wait_all();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn zero_target_releases_immediately() {
        let barrier = ReadinessBarrier::new(0);
        barrier.wait_all();
    }

    #[test]
    fn timeout_variant_reports_incomplete_arrival() {
        let barrier = ReadinessBarrier::new(2);
        barrier.arrive();
        let released = barrier.wait_all_timeout(Duration::from_millis(20));
        assert!(!released);
    }
}
