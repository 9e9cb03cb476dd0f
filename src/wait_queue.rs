//! Application-owned wait queue: predicate-guarded waiting bound to a
//! caller-supplied mutex, modeled on a C `wait_queue_t`.
//!
//! A C `wait_queue_t` caches a raw `pthread_mutex_t*` on first wait, since a
//! caller can hand the queue a pointer it doesn't yet know about. Rust's
//! `Mutex` has no such raw, reusable, relockable pointer — so this version
//! takes the shared application mutex once, at construction, as an
//! `Arc<Mutex<S>>`. That's strictly safer and preserves every externally
//! observable invariant: all waiters still block on the same mutex, and
//! `test_and_wait` still returns to the caller holding it.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// A wait queue bound to an external mutex guarding state `S`.
pub struct WaitQueue<S> {
    app_mutex: Arc<Mutex<S>>,
    cv: Condvar,
    waiters: Mutex<u32>,
}

impl<S> WaitQueue<S> {
    /// Bind a wait queue to the application's mutex.
    pub fn new(app_mutex: Arc<Mutex<S>>) -> Self {
        Self {
            app_mutex,
            cv: Condvar::new(),
            waiters: Mutex::new(0),
        }
    }

    /// Block while `predicate` returns true, re-checking it each time this
    /// thread wakes. Returns holding the application mutex; the caller is
    /// responsible for releasing it (by letting the guard drop).
    pub fn test_and_wait(&self, mut predicate: impl FnMut(&mut S) -> bool) -> MutexGuard<'_, S> {
        let mut guard = self.app_mutex.lock().unwrap_or_else(|e| e.into_inner());

        while predicate(&mut guard) {
            *self.waiters.lock().unwrap_or_else(|e| e.into_inner()) += 1;
            guard = self.cv.wait(guard).unwrap_or_else(|e| e.into_inner());
            *self.waiters.lock().unwrap_or_else(|e| e.into_inner()) -= 1;
        }
        guard
    }

    /// Wake one waiter, if any. If `lock_mutex`, the application mutex is
    /// acquired around the notify; pass `false` when the caller already
    /// holds it.
    pub fn signal(&self, lock_mutex: bool) {
        let _guard = lock_mutex.then(|| self.app_mutex.lock().unwrap_or_else(|e| e.into_inner()));
        if *self.waiters.lock().unwrap_or_else(|e| e.into_inner()) > 0 {
            self.cv.notify_one();
        }
    }

    /// Wake every waiter, if any. Locking semantics as [`Self::signal`].
    pub fn broadcast(&self, lock_mutex: bool) {
        let _guard = lock_mutex.then(|| self.app_mutex.lock().unwrap_or_else(|e| e.into_inner()));
        if *self.waiters.lock().unwrap_or_else(|e| e.into_inner()) > 0 {
            self.cv.notify_all();
        }
    }

    /// Access the bound application mutex directly (e.g. to lock it once
    /// up front, mutate state, then call [`Self::broadcast`] with
    /// `lock_mutex = false`).
    pub fn app_mutex(&self) -> &Arc<Mutex<S>> {
        &self.app_mutex
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    enum Color {
        Red,
        Yellow,
        Green,
    }

    #[test]
    fn test_and_wait_returns_holding_mutex_with_predicate_false() {
        let light = Arc::new(Mutex::new(Color::Green));
        let queue = WaitQueue::new(light.clone());

        let guard = queue.test_and_wait(|c| *c == Color::Red);
        assert_eq!(*guard, Color::Green);
        drop(guard);
    }

    #[test]
    fn traffic_light_blocks_on_red_and_wakes_on_green() {
        let light = Arc::new(Mutex::new(Color::Red));
        let queue = Arc::new(WaitQueue::new(light.clone()));

        let waiter_queue = queue.clone();
        let went = Arc::new(Mutex::new(false));
        let went2 = went.clone();
        let waiter = thread::spawn(move || {
            let guard = waiter_queue.test_and_wait(|c| *c == Color::Red);
            *went2.lock().unwrap() = true;
            drop(guard);
        });

        thread::sleep(Duration::from_millis(20));
        assert!(!*went.lock().unwrap());

        {
            let mut guard = light.lock().unwrap();
            *guard = Color::Green;
            // Caller already holds the mutex: signal without re-locking.
            queue.broadcast(false);
        }

        waiter.join().unwrap();
        assert!(*went.lock().unwrap());
    }

    #[test]
    fn signal_with_no_waiters_is_a_no_op() {
        let state = Arc::new(Mutex::new(0));
        let queue = WaitQueue::new(state);
        queue.signal(true);
        queue.broadcast(true);
    }
}
