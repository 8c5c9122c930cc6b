use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{JoinHandle, ThreadId};

use log::{debug, error, info, warn};

use crate::loading::LoadError;

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OperationState {
    NotStarted = 0,
    InProgress = 1,
    Cancelled = 2,
    Failed = 3,
    Completed = 4,
}

impl OperationState {
    fn from_raw(value: u8) -> Self {
        match value {
            0 => OperationState::NotStarted,
            1 => OperationState::InProgress,
            2 => OperationState::Cancelled,
            3 => OperationState::Failed,
            _ => OperationState::Completed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationState::Cancelled | OperationState::Failed | OperationState::Completed
        )
    }
}

/// An immutable copy of the progress fields, taken under one lock so readers never see a torn update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressSnapshot {
    pub progress: f32,
    pub sub_progress: f32,
    pub stage_label: String,
    pub sub_stage_label: String,
}

/// The progress and cancellation handle of one long-running background task.
///
/// Shared as `Arc<AsyncOperation>` between the caller (which polls [`AsyncOperation::snapshot`] and may
/// [`AsyncOperation::request_cancel`]) and the task (which reports progress and decides its own outcome).
///
/// State only moves `NotStarted -> InProgress -> {Cancelled, Failed, Completed}` and never leaves a terminal state.
pub struct AsyncOperation {
    state: AtomicU8,
    name: OnceLock<String>,

    stage_ticks: AtomicU64,
    stage_total: AtomicU64,
    sub_ticks: AtomicU64,
    sub_total: AtomicU64,
    snapshot: Mutex<ProgressSnapshot>,

    failure_reason: Mutex<Option<String>>,

    worker: Mutex<Option<JoinHandle<()>>>,
    worker_thread: OnceLock<ThreadId>,
    finished: Mutex<bool>,
    finished_signal: Condvar,
}

impl Default for AsyncOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AsyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncOperation")
            .field("name", &self.name())
            .field("state", &self.state())
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // progress reporting must keep working even if some reader panicked while holding the lock
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn ratio(ticks: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }

    (ticks as f64 / total as f64).clamp(0.0, 1.0) as f32
}

impl AsyncOperation {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(OperationState::NotStarted as u8),
            name: OnceLock::new(),
            stage_ticks: AtomicU64::new(0),
            stage_total: AtomicU64::new(0),
            sub_ticks: AtomicU64::new(0),
            sub_total: AtomicU64::new(0),
            snapshot: Mutex::new(ProgressSnapshot::default()),
            failure_reason: Mutex::new(None),
            worker: Mutex::new(None),
            worker_thread: OnceLock::new(),
            finished: Mutex::new(false),
            finished_signal: Condvar::new(),
        }
    }

    pub fn state(&self) -> OperationState {
        OperationState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn name(&self) -> &str {
        self.name.get().map(String::as_str).unwrap_or("<unnamed>")
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == OperationState::Cancelled
    }

    pub fn failure_reason(&self) -> Option<String> {
        lock(&self.failure_reason).clone()
    }

    fn transition(&self, from: OperationState, to: OperationState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Runs `task` on a dedicated, named thread. The task's result decides the terminal state: `Ok` completes,
    /// [`LoadError::Cancelled`] (or a cancellation requested meanwhile) leaves the operation cancelled, anything
    /// else fails it.
    pub fn start<F>(self: &Arc<Self>, name: &str, task: F) -> Result<(), LoadError>
    where
        F: FnOnce(&AsyncOperation) -> Result<(), LoadError> + Send + 'static,
    {
        if !self.transition(OperationState::NotStarted, OperationState::InProgress) {
            return Err(LoadError::Concurrency("The operation has already been started"));
        }

        let _ = self.name.set(name.to_string());
        info!("{}: started", name);

        let operation = self.clone();
        let spawned = std::thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                let _ = operation.worker_thread.set(std::thread::current().id());
                let guard = FinishGuard(operation.as_ref());
                let result = task(operation.as_ref());
                guard.complete(result);
            });

        match spawned {
            Ok(handle) => {
                *lock(&self.worker) = Some(handle);
                Ok(())
            }
            Err(err) => {
                error!("{}: failed to spawn the worker thread: {}", name, err);
                self.fail(err.to_string());
                self.mark_finished();
                Err(LoadError::Io(err))
            }
        }
    }

    /// Fails an operation that never got to run, e.g. because its orchestrator is busy. Goes through
    /// `InProgress` so the state machine stays linear. No-op unless the operation has not been started yet.
    pub fn reject(&self, reason: impl Into<String>) {
        if !self.transition(OperationState::NotStarted, OperationState::InProgress) {
            return;
        }

        let reason = reason.into();
        warn!("{}: rejected: {}", self.name(), reason);
        self.fail(reason);
        self.mark_finished();
    }

    fn fail(&self, reason: String) {
        if self.transition(OperationState::InProgress, OperationState::Failed) {
            *lock(&self.failure_reason) = Some(reason);
        }
    }

    fn mark_finished(&self) {
        *lock(&self.finished) = true;
        self.finished_signal.notify_all();
    }

    fn is_worker_thread(&self) -> bool {
        self.worker_thread
            .get()
            .is_some_and(|&id| id == std::thread::current().id())
    }

    /// Requests cooperative cancellation and blocks until the task has stopped. Returns immediately when the
    /// operation is not in progress, and never blocks when called from the task itself.
    pub fn request_cancel(&self) {
        match self.state.compare_exchange(
            OperationState::InProgress as u8,
            OperationState::Cancelled as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => info!("{}: cancellation requested", self.name()),
            // a repeated request waits just like the first one
            Err(current) if current == OperationState::Cancelled as u8 => {}
            Err(_) => return,
        }

        if self.is_worker_thread() {
            return;
        }

        self.wait();
    }

    /// Blocks until the task has finished and returns the terminal state. Returns the current state right away if
    /// the operation has never been started.
    pub fn wait(&self) -> OperationState {
        if self.state() == OperationState::NotStarted || self.is_worker_thread() {
            return self.state();
        }

        {
            let mut finished = lock(&self.finished);
            while !*finished {
                finished = self
                    .finished_signal
                    .wait(finished)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }

        if let Some(handle) = lock(&self.worker).take() {
            if handle.join().is_err() {
                error!("{}: the worker thread panicked", self.name());
            }
        }

        self.state()
    }

    /// Resets the stage counters and progress. The previous sub stage is reset, too.
    pub fn init_stage(&self, label: impl Into<String>, total_ticks: u64) {
        let mut snapshot = lock(&self.snapshot);
        self.stage_ticks.store(0, Ordering::Relaxed);
        self.stage_total.store(total_ticks, Ordering::Relaxed);
        self.sub_ticks.store(0, Ordering::Relaxed);
        self.sub_total.store(0, Ordering::Relaxed);

        snapshot.stage_label = label.into();
        snapshot.sub_stage_label.clear();
        snapshot.progress = 0.0;
        snapshot.sub_progress = 0.0;
        debug!("{}: stage \"{}\" ({} ticks)", self.name(), snapshot.stage_label, total_ticks);
    }

    /// Resets only the sub stage counters.
    pub fn init_sub_stage(&self, label: impl Into<String>, total_sub_ticks: u64) {
        let mut snapshot = lock(&self.snapshot);
        self.sub_ticks.store(0, Ordering::Relaxed);
        self.sub_total.store(total_sub_ticks, Ordering::Relaxed);

        snapshot.sub_stage_label = label.into();
        snapshot.sub_progress = 0.0;
    }

    /// Accumulates `ticks` into both the stage and the sub stage. Safe to call from any number of threads, the
    /// result does not depend on the order of the calls.
    pub fn add_progress(&self, ticks: u64) {
        self.stage_ticks.fetch_add(ticks, Ordering::Relaxed);
        self.sub_ticks.fetch_add(ticks, Ordering::Relaxed);

        let mut snapshot = lock(&self.snapshot);
        let progress = ratio(
            self.stage_ticks.load(Ordering::Relaxed),
            self.stage_total.load(Ordering::Relaxed),
        );
        let sub_progress = ratio(
            self.sub_ticks.load(Ordering::Relaxed),
            self.sub_total.load(Ordering::Relaxed),
        );

        snapshot.progress = snapshot.progress.max(progress);
        snapshot.sub_progress = snapshot.sub_progress.max(sub_progress);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        lock(&self.snapshot).clone()
    }
}

/// Ends the operation when the worker closure returns, and also when it unwinds, so waiters are never stranded.
struct FinishGuard<'a>(&'a AsyncOperation);

impl FinishGuard<'_> {
    fn complete(self, result: Result<(), LoadError>) {
        let operation = self.0;
        match result {
            Ok(()) => {
                if operation.transition(OperationState::InProgress, OperationState::Completed) {
                    info!("{}: completed", operation.name());
                } else {
                    info!("{}: finished after cancellation", operation.name());
                }
            }
            Err(LoadError::Cancelled) => {
                operation.transition(OperationState::InProgress, OperationState::Cancelled);
                info!("{}: cancelled", operation.name());
            }
            Err(err) => {
                error!("{}: failed: {}", operation.name(), err);
                operation.fail(err.to_string());
            }
        }
        // drop marks the operation finished
    }
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.fail("The worker thread panicked".to_string());
        }
        self.0.mark_finished();
    }
}
