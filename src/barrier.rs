//! Reusable N-way rendezvous barrier with a two-phase arrive/dispose
//! discipline, so a single [`Barrier`] can be waited on by the same cohort
//! of threads cohort after cohort without reallocating anything.

use std::fmt;
use std::sync::{Condvar, Mutex};

#[derive(Debug)]
pub enum BarrierError {
    /// `destroy` was called while threads were still waiting.
    WaitersPresent,
}

impl fmt::Display for BarrierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarrierError::WaitersPresent => {
                write!(f, "barrier destroyed while threads were still waiting")
            }
        }
    }
}

impl std::error::Error for BarrierError {}

struct State {
    arrived: u32,
    ready: bool,
}

/// A reusable N-way rendezvous barrier.
pub struct Barrier {
    threshold: u32,
    state: Mutex<State>,
    arrive_cv: Condvar,
    dispose_cv: Condvar,
}

impl Barrier {
    /// Create a barrier with the given rendezvous threshold.
    ///
    /// # Panics
    /// Panics if `threshold` is zero; a zero-thread rendezvous is a
    /// programmer error, not a runtime condition.
    pub fn new(threshold: u32) -> Self {
        assert!(threshold > 0, "barrier threshold must be nonzero");
        Self {
            threshold,
            state: Mutex::new(State {
                arrived: 0,
                ready: true,
            }),
            arrive_cv: Condvar::new(),
            dispose_cv: Condvar::new(),
        }
    }

    /// Block until `threshold` threads have called `wait`. Returns once this
    /// thread's cohort has fully departed.
    pub fn wait(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        // A new arrival must not enter while the previous cohort is still
        // disposing.
        while !state.ready {
            state = self
                .dispose_cv
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }

        if state.arrived + 1 == self.threshold {
            // Last arrival: begin disposition, relay exactly one signal into
            // the cohort, and return without waiting.
            state.ready = false;
            self.arrive_cv.notify_one();
            return;
        }

        state.arrived += 1;
        state = self
            .arrive_cv
            .wait(state)
            .unwrap_or_else(|e| e.into_inner());

        state.arrived -= 1;
        if state.arrived == 0 {
            state.ready = true;
            self.dispose_cv.notify_all();
        } else {
            self.arrive_cv.notify_one();
        }
    }

    /// Force-signal one waiter, ignoring the current arrival count. Intended
    /// for diagnostics or shutdown, not normal rendezvous flow.
    pub fn signal_all(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.arrived > 0 {
            self.arrive_cv.notify_one();
        }
    }

    /// Number of threads currently parked inside `wait`.
    pub fn waiting(&self) -> u32 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).arrived
    }

    /// Check the precondition a C `thread_barrier_destroy` would have assumed
    /// the caller had already verified. Rust's ownership model makes the
    /// actual hazard (destroying a barrier threads are still parked in)
    /// structurally unreachable — an `Arc<Barrier>` a waiter still holds
    /// can't be dropped out from under it — but callers that want an
    /// explicit precondition check before tearing down a barrier can use
    /// this.
    pub fn close(&self) -> Result<(), BarrierError> {
        if self.waiting() > 0 {
            Err(BarrierError::WaitersPresent)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::thread;

    #[test]
    fn three_threads_two_cohorts_no_overlap() {
        let barrier = Arc::new(Barrier::new(3));
        let log = Arc::new(StdMutex::new(Vec::new()));

        let handles: Vec<_> = (0..3)
            .map(|id| {
                let barrier = barrier.clone();
                let log = log.clone();
                thread::spawn(move || {
                    for cohort in 0..2 {
                        log.lock().unwrap().push(format!("A{id}-{cohort}"));
                        barrier.wait();
                        log.lock().unwrap().push(format!("B{id}-{cohort}"));
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 12);

        let before_count = |cohort: usize| {
            log.iter()
                .filter(|e| e.starts_with('A') && e.ends_with(&format!("-{cohort}")))
                .count()
        };
        let first_after = |cohort: usize| {
            log.iter()
                .position(|e| e.starts_with('B') && e.ends_with(&format!("-{cohort}")))
        };
        let last_before = |cohort: usize| {
            log.iter()
                .rposition(|e| e.starts_with('A') && e.ends_with(&format!("-{cohort}")))
        };

        assert_eq!(before_count(0), 3);
        assert_eq!(before_count(1), 3);
        // No "before" entry of cohort 2 precedes any "after" entry of cohort 1.
        assert!(last_before(1).unwrap() > first_after(0).unwrap());
    }

    #[test]
    fn nth_arrival_does_not_block() {
        let barrier = Arc::new(Barrier::new(1));
        barrier.wait();
        barrier.wait();
        assert_eq!(barrier.waiting(), 0);
    }

    #[test]
    fn every_thread_wakes_exactly_once_per_rendezvous() {
        let barrier = Arc::new(Barrier::new(4));
        let wakes = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let barrier = barrier.clone();
                let wakes = wakes.clone();
                thread::spawn(move || {
                    barrier.wait();
                    wakes.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(wakes.load(Ordering::SeqCst), 4);
    }
}
