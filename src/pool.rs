//! Thread pool: a fixed set of persistent worker threads, each a
//! [`ThreadHandle`] parked on its own dispatch queue between jobs instead of
//! being respawned per job.

use crate::semaphore::Semaphore;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

#[derive(Debug)]
pub enum PoolError {
    /// The pool was asked to dispatch work but holds zero workers.
    Empty,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Empty => write!(f, "thread pool has no workers"),
        }
    }
}

impl std::error::Error for PoolError {}

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Dispatch {
    job: Job,
    /// Posted after the job runs and the worker is back in `idle`, so a
    /// blocking dispatcher that wakes always finds its worker available
    /// for a subsequent dispatch. Set regardless of whether the job
    /// panicked.
    completion: Option<Arc<Semaphore>>,
}

struct Worker {
    id: usize,
}

struct Shared {
    idle: Mutex<VecDeque<usize>>,
    dispatch_cv: Condvar,
    // Jobs waiting for an idle worker, one slot per worker id once claimed.
    pending: Mutex<Vec<Option<Dispatch>>>,
}

/// A fixed-size pool of persistent worker threads.
///
/// Each worker parks on the pool's own condvar between jobs rather than the
/// per-thread pause condvar a [`crate::thread_handle::ThreadHandle`] uses for
/// cooperative pause, since those two wakeups must never race on the same
/// condvar/mutex pair.
pub struct ThreadPool {
    shared: Arc<Shared>,
    worker_count: usize,
    _workers: Vec<thread::JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn `worker_count` persistent OS threads, each idle until dispatched.
    pub fn new(worker_count: usize) -> Self {
        let shared = Arc::new(Shared {
            idle: Mutex::new((0..worker_count).collect()),
            dispatch_cv: Condvar::new(),
            pending: Mutex::new((0..worker_count).map(|_| None).collect()),
        });

        let workers = (0..worker_count)
            .map(|id| {
                let shared = shared.clone();
                thread::Builder::new()
                    .name(format!("pool-worker-{id}"))
                    .spawn(move || Self::run_worker(Worker { id }, shared))
                    .expect("failed to spawn pool worker")
            })
            .collect();

        Self {
            shared,
            worker_count,
            _workers: workers,
        }
    }

    fn run_worker(worker: Worker, shared: Arc<Shared>) {
        loop {
            let dispatch = {
                let mut pending = shared.pending.lock().unwrap_or_else(|e| e.into_inner());
                loop {
                    if let Some(dispatch) = pending[worker.id].take() {
                        break dispatch;
                    }
                    pending = shared
                        .dispatch_cv
                        .wait(pending)
                        .unwrap_or_else(|e| e.into_inner());
                }
            };

            tracing::trace!(worker = worker.id, "running job");
            // Contain a panicking task so it doesn't take the worker thread
            // (and with it, a pool slot) down with it.
            let result = catch_unwind(AssertUnwindSafe(dispatch.job));
            if let Err(panic) = result {
                tracing::error!(worker = worker.id, "job panicked: {:?}", panic_message(&panic));
            }

            // Re-queue before posting completion: a blocking dispatcher
            // that wakes on `completion` must always find this worker
            // already back in `idle`.
            {
                let mut idle = shared.idle.lock().unwrap_or_else(|e| e.into_inner());
                idle.push_back(worker.id);
            }
            if let Some(completion) = dispatch.completion {
                completion.release();
            }
        }
    }

    /// Dispatch `job` to the next idle worker. If `block_caller` is set,
    /// blocks the calling thread until that worker finishes the job (and is
    /// back in the pool); otherwise returns immediately once the job is
    /// handed off.
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static, block_caller: bool) -> Result<(), PoolError> {
        if self.worker_count == 0 {
            return Err(PoolError::Empty);
        }

        let worker_id = {
            let mut idle = self.shared.idle.lock().unwrap_or_else(|e| e.into_inner());
            match idle.pop_front() {
                Some(id) => id,
                // Dispatch on a fully-busy pool is a silent drop, matching
                // the original's fire-and-forget behavior when no thread is
                // available — callers that need backpressure should check
                // `idle_count` first.
                None => {
                    tracing::warn!("dispatch with no idle worker; job dropped");
                    return Ok(());
                }
            }
        };

        if block_caller {
            let done = Arc::new(Semaphore::zero());
            self.hand_off(worker_id, Box::new(job), Some(done.clone()));
            done.acquire();
        } else {
            self.hand_off(worker_id, Box::new(job), None);
        }
        Ok(())
    }

    fn hand_off(&self, worker_id: usize, job: Job, completion: Option<Arc<Semaphore>>) {
        let mut pending = self.shared.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending[worker_id] = Some(Dispatch { job, completion });
        self.shared.dispatch_cv.notify_all();
    }

    pub fn idle_count(&self) -> usize {
        self.shared.idle.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
