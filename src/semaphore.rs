//! A small counting semaphore built on `std::sync::{Mutex, Condvar}`.
//!
//! `std` has no counting semaphore, so the thread pool (and anything else in
//! this crate that needs "block until somebody posts") builds one the same
//! way the C source's `sem_t` usage implies: a guarded counter plus a
//! condition variable. Construction with `0` permits gives the "zero
//! semaphore" the pool dispatcher uses to wait for exactly one completion.

use std::sync::{Condvar, Mutex};

/// A counting semaphore.
#[derive(Debug)]
pub struct Semaphore {
    count: Mutex<u32>,
    cv: Condvar,
}

impl Semaphore {
    /// Create a semaphore with `initial` permits already available.
    pub fn new(initial: u32) -> Self {
        Self {
            count: Mutex::new(initial),
            cv: Condvar::new(),
        }
    }

    /// Create a zero-initialized semaphore, the mode the pool dispatcher uses
    /// to block on a worker's completion.
    pub fn zero() -> Self {
        Self::new(0)
    }

    /// Block until a permit is available, then consume it.
    pub fn acquire(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        while *count == 0 {
            count = self.cv.wait(count).unwrap_or_else(|e| e.into_inner());
        }
        *count -= 1;
    }

    /// Consume a permit without blocking if one is immediately available.
    pub fn try_acquire(&self) -> bool {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }

    /// Release a permit, waking one waiter if any is blocked in `acquire`.
    pub fn release(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count += 1;
        self.cv.notify_one();
    }
}
