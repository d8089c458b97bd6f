//! Background work for oracle calls and codec operations.
//!
//! Work closures run on a small pool of worker threads. Their results are
//! turned into messages and queued; the interaction context drains the queue
//! with [`BackgroundExecutor::drain`] and applies them, so session state is
//! only ever mutated on the thread that owns the session.

use parking_lot::{Condvar, Mutex};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::constants::DEFAULT_WORKER_THREADS;

/// Outcome of a background task; errors are plain messages
pub type TaskResult<T> = Result<T, String>;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool that reports results back as messages of type `M`.
pub struct BackgroundExecutor<M: Send + 'static> {
    job_tx: Option<Sender<Job>>,
    result_tx: Sender<M>,
    result_rx: Receiver<M>,
    pending: Arc<AtomicUsize>,
    workers: Vec<JoinHandle<()>>,
}

impl<M: Send + 'static> BackgroundExecutor<M> {
    pub fn new(worker_count: usize) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (result_tx, result_rx) = mpsc::channel();
        let job_rx = Arc::new(Mutex::new(job_rx));

        let workers = (0..worker_count.max(1))
            .filter_map(|i| {
                let job_rx = Arc::clone(&job_rx);
                std::thread::Builder::new()
                    .name(format!("recolor-worker-{i}"))
                    .spawn(move || worker_loop(job_rx))
                    .map_err(|e| error!("Failed to start worker thread: {e}"))
                    .ok()
            })
            .collect();

        Self {
            job_tx: Some(job_tx),
            result_tx,
            result_rx,
            pending: Arc::new(AtomicUsize::new(0)),
            workers,
        }
    }

    pub fn with_default_workers() -> Self {
        Self::new(DEFAULT_WORKER_THREADS)
    }

    /// Run `work` on a worker; `finish` converts its result into a message.
    ///
    /// Panics inside `work` are caught and reported as task errors.
    pub fn spawn<T, W, F>(&self, name: &'static str, work: W, finish: F)
    where
        T: Send + 'static,
        W: FnOnce() -> TaskResult<T> + Send + 'static,
        F: FnOnce(TaskResult<T>) -> M + Send + 'static,
    {
        let Some(job_tx) = &self.job_tx else {
            warn!(task = name, "Executor shut down, dropping task");
            return;
        };
        let result_tx = self.result_tx.clone();
        self.pending.fetch_add(1, Ordering::SeqCst);

        let job: Job = Box::new(move || {
            let result = catch_unwind(AssertUnwindSafe(work))
                .unwrap_or_else(|_| Err(format!("task '{name}' panicked")));
            if let Err(e) = &result {
                debug!(task = name, "Background task failed: {e}");
            }
            // Receiver gone means the session was dropped; nothing to report to.
            let _ = result_tx.send(finish(result));
        });

        if job_tx.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            error!(task = name, "All worker threads are gone");
        }
    }

    /// Take every message that is ready without blocking
    pub fn drain(&self) -> Vec<M> {
        let messages: Vec<M> = self.result_rx.try_iter().collect();
        self.pending.fetch_sub(messages.len(), Ordering::SeqCst);
        messages
    }

    /// Block up to `timeout` for the next message
    pub fn wait_next(&self, timeout: Duration) -> Option<M> {
        match self.result_rx.recv_timeout(timeout) {
            Ok(message) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                Some(message)
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Whether spawned tasks have results not yet drained
    pub fn has_pending(&self) -> bool {
        self.pending_count() > 0
    }

    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl<M: Send + 'static> Drop for BackgroundExecutor<M> {
    fn drop(&mut self) {
        // Closing the job channel ends every worker loop.
        self.job_tx.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("Worker thread exited with a panic");
            }
        }
    }
}

fn worker_loop(job_rx: Arc<Mutex<Receiver<Job>>>) {
    loop {
        let job = job_rx.lock().recv();
        match job {
            Ok(job) => job(),
            Err(_) => break,
        }
    }
}

// ============================================================================
// Completion Handle
// ============================================================================

struct CompletionState<T> {
    result: Mutex<Option<TaskResult<T>>>,
    ready: Condvar,
}

/// Completion handle for work whose result is applied later.
///
/// Cloning shares the same slot. The first `resolve` wins.
pub struct Completion<T> {
    state: Arc<CompletionState<T>>,
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> std::fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("complete", &self.state.result.lock().is_some())
            .finish()
    }
}

impl<T> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Completion<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(CompletionState {
                result: Mutex::new(None),
                ready: Condvar::new(),
            }),
        }
    }

    /// A handle that is already resolved
    pub fn resolved(result: TaskResult<T>) -> Self {
        let completion = Self::new();
        completion.resolve(result);
        completion
    }

    pub fn resolve(&self, result: TaskResult<T>) {
        let mut slot = self.state.result.lock();
        if slot.is_none() {
            *slot = Some(result);
            self.state.ready.notify_all();
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state.result.lock().is_some()
    }

    /// Whether both handles share one slot
    pub fn same_as(&self, other: &Completion<T>) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl<T: Clone> Completion<T> {
    pub fn result(&self) -> Option<TaskResult<T>> {
        self.state.result.lock().clone()
    }

    /// Block until resolved or `timeout` passes.
    ///
    /// Must not be called on the thread that pumps the session, since that
    /// is where resolution happens.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<TaskResult<T>> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.state.result.lock();
        while slot.is_none() {
            if self.state.ready.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }
        slot.clone()
    }
}
