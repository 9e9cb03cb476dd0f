//! Named thread handle with cooperative pause/resume.
//!
//! This mirrors a C `thread_t`: a named OS thread that can be
//! *requested* to pause by any other thread, but only ever transitions
//! itself into the paused state at a point it declares by calling
//! [`ThreadHandle::test_and_pause`]. External callers can request a pause
//! and signal a resume; they can never force the transition directly. That
//! asymmetry is what keeps pausing safe: a thread is never stopped at an
//! arbitrary instruction boundary.

use std::fmt;
use std::sync::{Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// Errors raised by [`ThreadHandle`] operations.
#[derive(Debug)]
pub enum ThreadHandleError {
    /// `run` was called on a handle that already has work assigned.
    AlreadyRunning,
    /// The underlying OS thread could not be spawned.
    SpawnFailed(std::io::Error),
    /// `join` was called on a detached handle, or a handle that was never run.
    NotJoinable,
    /// The spawned thread panicked.
    JoinFailed,
}

impl fmt::Display for ThreadHandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadHandleError::AlreadyRunning => {
                write!(f, "thread handle already has work assigned")
            }
            ThreadHandleError::SpawnFailed(e) => write!(f, "failed to spawn thread: {e}"),
            ThreadHandleError::NotJoinable => write!(f, "thread handle is not joinable"),
            ThreadHandleError::JoinFailed => write!(f, "thread panicked before completing"),
        }
    }
}

impl std::error::Error for ThreadHandleError {}

pub type Result<T> = std::result::Result<T, ThreadHandleError>;

/// The lifecycle flag set from the original `THREAD_F_*` bits.
///
/// `running` and `paused` are never both set; `marked_for_pause` only ever
/// becomes true while `running` is true.
#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    running: bool,
    marked_for_pause: bool,
    paused: bool,
}

type PauseHook = Box<dyn FnMut() + Send + 'static>;

/// A named thread with cooperative pause/resume and optional join semantics.
pub struct ThreadHandle {
    name: String,
    joinable: Mutex<bool>,
    state: Mutex<Flags>,
    cv: Condvar,
    pause_hook: Mutex<Option<PauseHook>>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
    has_work: Mutex<bool>,
}

impl ThreadHandle {
    /// Allocate a handle with all flags cleared, joinable by default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            joinable: Mutex::new(true),
            state: Mutex::new(Flags::default()),
            cv: Condvar::new(),
            pause_hook: Mutex::new(None),
            join_handle: Mutex::new(None),
            has_work: Mutex::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set joinable/detached mode. Must be called before [`Self::run`].
    pub fn set_joinable(&self, joinable: bool) {
        *self.joinable.lock().unwrap_or_else(|e| e.into_inner()) = joinable;
    }

    /// Install the hook invoked on every resume from pause, while
    /// `state_mutex` is still held, before the thread observes anything else.
    pub fn set_pause_hook<F>(&self, hook: F)
    where
        F: FnMut() + Send + 'static,
    {
        *self.pause_hook.lock().unwrap_or_else(|e| e.into_inner()) = Some(Box::new(hook));
    }

    /// Spawn the underlying OS thread executing `task`. Requires no work be
    /// assigned yet and the handle not already running.
    pub fn run<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut has_work = self.has_work.lock().unwrap_or_else(|e| e.into_inner());
            if *has_work {
                return Err(ThreadHandleError::AlreadyRunning);
            }
            *has_work = true;
        }
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.running = true;
        }

        let joinable = *self.joinable.lock().unwrap_or_else(|e| e.into_inner());
        let built = thread::Builder::new()
            .name(self.name.clone())
            .spawn(task)
            .map_err(ThreadHandleError::SpawnFailed)?;

        if joinable {
            *self.join_handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(built);
        }
        tracing::debug!(thread = %self.name, "spawned");
        Ok(())
    }

    /// Join the underlying OS thread. No-op error if detached or never run.
    pub fn join(&self) -> Result<()> {
        let handle = self
            .join_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match handle {
            Some(h) => h.join().map_err(|_| ThreadHandleError::JoinFailed),
            None => Err(ThreadHandleError::NotJoinable),
        }
    }

    /// Request that the thread pause at its next declared pause point.
    /// Idempotent; no effect unless the thread is currently running.
    pub fn request_pause(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.running {
            state.marked_for_pause = true;
            tracing::trace!(thread = %self.name, "pause requested");
        }
    }

    /// Signal a paused thread to resume. No effect unless currently paused.
    pub fn resume(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.paused {
            self.cv.notify_one();
            tracing::trace!(thread = %self.name, "resume signaled");
        }
    }

    /// Called by the thread itself at a declared pause point. If a pause was
    /// requested, blocks here until [`Self::resume`] wakes it, then runs the
    /// pause hook (still holding `state_mutex`) before returning.
    pub fn test_and_pause(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.marked_for_pause {
            state.paused = true;
            state.marked_for_pause = false;
            state.running = false;
            tracing::debug!(thread = %self.name, "paused");

            state = self.cv.wait(state).unwrap_or_else(|e| e.into_inner());

            state.running = true;
            state.paused = false;

            // Still holding state_mutex (`state`): the hook must complete
            // before the thread observes anything else, per the original
            // "post-wake barrier restoration" discipline.
            if let Some(hook) = self
                .pause_hook
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .as_mut()
            {
                hook();
            }
            tracing::debug!(thread = %self.name, "resumed");
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).running
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).paused
    }
}
