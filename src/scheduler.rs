//! Scheduled-task slots.
//!
//! A [`TaskSlot`] holds at most one pending task. Scheduling into a slot
//! supersedes whatever was pending there: the old timer thread wakes, sees
//! that its generation is stale, and exits without running. Three slots
//! exist in a running device:
//!
//! ```text
//! ┌─────────────────┐   ┌──────────────────┐   ┌───────────────────┐
//! │ pump shutoff    │   │ LED auto-clear   │   │ telemetry report  │
//! │ one-shot        │   │ one-shot         │   │ periodic (rearms) │
//! └────────┬────────┘   └────────┬─────────┘   └─────────┬─────────┘
//!          │   schedule / cancel bump the slot generation  │
//!          ▼                     ▼                         ▼
//!    timer thread waits on a condvar until deadline or generation change
//! ```
//!
//! A generation check cannot close the window between "deadline reached"
//! and "task body runs". Tasks whose effect must not outlive a supersede
//! (pump shutoff, LED auto-clear) carry their own token and re-check it
//! under the owning component's lock.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{error, warn};

use crate::drivers::task_pin::{self, TIMER_TASK};

/// Poll period while waiting for a thread to finish in [`join_bounded`].
const JOIN_POLL: Duration = Duration::from_millis(5);

// ═══════════════════════════════════════════════════════════════
//  Helpers
// ═══════════════════════════════════════════════════════════════

/// Lock a mutex, recovering the guard if a panicking thread poisoned it.
///
/// Every value guarded in this crate is left consistent between statements,
/// so a poisoned lock is still safe to use.
pub(crate) fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Join `handle`, giving up after `timeout`. Returns `true` if joined.
///
/// A thread still running at the deadline is detached.
pub fn join_bounded(handle: JoinHandle<()>, timeout: Duration, what: &str) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!("{what}: did not stop within {timeout:?}, detaching");
            return false;
        }
        thread::sleep(JOIN_POLL);
    }
    if handle.join().is_err() {
        warn!("{what}: thread panicked");
    }
    true
}

// ═══════════════════════════════════════════════════════════════
//  TaskSlot
// ═══════════════════════════════════════════════════════════════

struct SlotShared {
    generation: Mutex<u64>,
    wake: Condvar,
}

impl SlotShared {
    /// Block until `deadline`. Returns `false` early if the slot was
    /// superseded or cancelled in the meantime.
    fn wait_until(&self, generation: u64, deadline: Instant) -> bool {
        let mut current = lock(&self.generation);
        loop {
            if *current != generation {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            current = self
                .wake
                .wait_timeout(current, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// A named slot holding at most one pending one-shot or periodic task.
pub struct TaskSlot {
    name: &'static str,
    shared: Arc<SlotShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskSlot {
    /// `name` must be null-terminated; it names the timer thread.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            shared: Arc::new(SlotShared {
                generation: Mutex::new(0),
                wake: Condvar::new(),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Run `task` once after `delay`, replacing any pending task.
    ///
    /// Returns `false` if the timer thread could not be started.
    pub fn schedule_once<F>(&self, delay: Duration, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let generation = self.supersede();
        let deadline = Instant::now() + delay;
        let shared = Arc::clone(&self.shared);
        self.spawn(move || {
            if shared.wait_until(generation, deadline) {
                task();
            }
        })
    }

    /// Run `task` after `first`, then every `interval` until superseded.
    ///
    /// Each run re-arms the next deadline from its own completion, so a slow
    /// task never causes back-to-back catch-up runs.
    pub fn schedule_periodic<F>(&self, first: Duration, interval: Duration, mut task: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        let generation = self.supersede();
        let mut deadline = Instant::now() + first;
        let shared = Arc::clone(&self.shared);
        self.spawn(move || {
            while shared.wait_until(generation, deadline) {
                task();
                deadline = Instant::now() + interval;
            }
        })
    }

    /// Drop any pending task without waiting for its thread.
    pub fn cancel(&self) {
        self.supersede();
    }

    /// Cancel, then wait up to `timeout` for the timer thread to exit.
    ///
    /// Must not be called from inside this slot's own task.
    pub fn cancel_and_join(&self, timeout: Duration) -> bool {
        self.cancel();
        let handle = lock(&self.handle).take();
        match handle {
            Some(handle) => join_bounded(handle, timeout, self.name.trim_end_matches('\0')),
            None => true,
        }
    }

    /// Whether a timer thread is still alive in this slot.
    pub fn is_pending(&self) -> bool {
        lock(&self.handle)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    fn supersede(&self) -> u64 {
        let mut generation = lock(&self.shared.generation);
        *generation = generation.wrapping_add(1);
        self.shared.wake.notify_all();
        *generation
    }

    fn spawn(&self, body: impl FnOnce() + Send + 'static) -> bool {
        match task_pin::spawn_on_core(TIMER_TASK, self.name, body) {
            Ok(handle) => {
                // The previous thread, if any, has been superseded and exits
                // on its own.
                lock(&self.handle).replace(handle);
                true
            }
            Err(e) => {
                error!("{}: timer thread spawn failed: {e}", self.name.trim_end_matches('\0'));
                false
            }
        }
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
