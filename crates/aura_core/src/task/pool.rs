//! # Task Pool
//!
//! Fixed group of persistent worker threads draining one FIFO queue.
//!
//! ```text
//!   Mutator ───┐                              ┌──> aura-worker-0
//!   Control ───┼──> [Mutex<VecDeque<Job>>] ───┼──> aura-worker-1
//!   Mutator ───┘      (not_empty condvar)     └──> aura-worker-N
//! ```
//!
//! Jobs run outside the queue lock. Shutdown drains whatever is already
//! queued before the workers exit; there is no work stealing, so the only
//! ordering guarantee is dequeue order.

use super::handle::TaskHandle;
use crate::error::{TaskError, TaskResult};
use parking_lot::{Condvar, Mutex};
use serde::Deserialize;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Configuration for the task pool.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TaskPoolConfig {
    /// Worker count. 0 means one per hardware thread.
    pub threads: usize,
    /// Prefix for worker thread names.
    pub name_prefix: String,
}

impl Default for TaskPoolConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            name_prefix: "aura-worker".to_string(),
        }
    }
}

impl TaskPoolConfig {
    /// Worker count after resolving 0 to the hardware concurrency.
    #[must_use]
    pub fn resolved_threads(&self) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }
}

/// Counters for the task pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaskPoolStats {
    /// Jobs accepted by `enqueue`.
    pub submitted: u64,
    /// Jobs that ran to completion or panicked.
    pub completed: u64,
    /// Jobs that panicked.
    pub panicked: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
}

struct QueueState {
    jobs: VecDeque<Job>,
    stopping: bool,
}

/// Shared work queue.
struct Queue {
    state: Mutex<QueueState>,
    /// Signalled on push and on shutdown.
    not_empty: Condvar,
}

/// Fixed-size worker pool.
///
/// Shared by reference (`Arc<TaskPool>`) between the scene mutation call
/// sites and the pipeline dispatcher.
pub struct TaskPool {
    queue: Arc<Queue>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
    threads: usize,
}

impl TaskPool {
    /// Starts `threads` workers (0 = hardware concurrency).
    ///
    /// # Errors
    ///
    /// [`TaskError::Spawn`] if the OS refuses a thread. Workers already
    /// started are shut down before returning.
    pub fn new(threads: usize) -> TaskResult<Self> {
        Self::with_config(&TaskPoolConfig {
            threads,
            ..TaskPoolConfig::default()
        })
    }

    /// Starts a pool from configuration.
    ///
    /// # Errors
    ///
    /// See [`TaskPool::new`].
    pub fn with_config(config: &TaskPoolConfig) -> TaskResult<Self> {
        let threads = config.resolved_threads();
        let queue = Arc::new(Queue {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                stopping: false,
            }),
            not_empty: Condvar::new(),
        });

        let pool = Self {
            queue,
            workers: Mutex::new(Vec::with_capacity(threads)),
            counters: Arc::new(Counters::default()),
            threads,
        };

        for n in 0..threads {
            let worker_queue = Arc::clone(&pool.queue);
            let handle = thread::Builder::new()
                .name(format!("{}-{n}", config.name_prefix))
                .spawn(move || Self::worker_loop(&worker_queue))
                .map_err(|e| TaskError::Spawn(e.to_string()))?;
            pool.workers.lock().push(handle);
        }

        tracing::debug!(threads, "task pool started");
        Ok(pool)
    }

    /// Worker main loop.
    fn worker_loop(queue: &Queue) {
        loop {
            let job = {
                let mut state = queue.state.lock();
                while !state.stopping && state.jobs.is_empty() {
                    queue.not_empty.wait(&mut state);
                }
                match state.jobs.pop_front() {
                    Some(job) => job,
                    // Stopping and drained.
                    None => return,
                }
            };
            job();
        }
    }

    /// Queues `work` and returns a handle to its result.
    ///
    /// # Errors
    ///
    /// [`TaskError::ShuttingDown`] once [`TaskPool::shutdown`] has begun.
    pub fn enqueue<F, T>(&self, work: F) -> TaskResult<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let counters = Arc::clone(&self.counters);

        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(work))
                .map_err(|payload| TaskError::Panicked(panic_message(payload.as_ref())));
            if outcome.is_err() {
                counters.panicked.fetch_add(1, Ordering::Relaxed);
            }
            counters.completed.fetch_add(1, Ordering::Release);
            // The handle may have been dropped.
            let _ = sender.send(outcome);
        });

        {
            let mut state = self.queue.state.lock();
            if state.stopping {
                return Err(TaskError::ShuttingDown);
            }
            state.jobs.push_back(job);
        }
        self.queue.not_empty.notify_one();
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        Ok(TaskHandle::new(receiver))
    }

    /// Stops accepting work, drains the queue and joins every worker.
    ///
    /// Idempotent. Called by `Drop`.
    pub fn shutdown(&self) {
        {
            let mut state = self.queue.state.lock();
            state.stopping = true;
            self.queue.not_empty.notify_all();
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return;
        }
        let current = thread::current().id();
        for handle in workers {
            // A job that drops the last pool reference cannot join itself.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::warn!("task pool worker exited abnormally");
            }
        }
        tracing::debug!(completed = self.stats().completed, "task pool stopped");
    }

    /// Number of worker threads.
    #[inline]
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Jobs queued but not yet picked up.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.state.lock().jobs.len()
    }

    /// Returns true once shutdown has begun.
    #[must_use]
    pub fn is_stopping(&self) -> bool {
        self.queue.state.lock().stopping
    }

    /// Returns current counters.
    #[must_use]
    pub fn stats(&self) -> TaskPoolStats {
        TaskPoolStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Acquire),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
        }
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("threads", &self.threads)
            .field("pending", &self.pending())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_enqueue_returns_value() {
        let pool = TaskPool::new(2).unwrap();
        let handle = pool.enqueue(|| 21 * 2).unwrap();
        assert_eq!(handle.wait().unwrap(), 42);
    }

    #[test]
    fn test_single_worker_is_fifo() {
        let pool = TaskPool::new(1).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let order = Arc::clone(&order);
                pool.enqueue(move || order.lock().push(i)).unwrap()
            })
            .collect();
        for handle in handles {
            handle.wait().unwrap();
        }

        assert_eq!(*order.lock(), (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn test_panicking_job_is_reported() {
        let pool = TaskPool::new(1).unwrap();
        let bad = pool.enqueue(|| -> u32 { panic!("boom") }).unwrap();
        let good = pool.enqueue(|| 7u32).unwrap();

        assert_eq!(bad.wait(), Err(TaskError::Panicked("boom".to_string())));
        // Worker survived the panic.
        assert_eq!(good.wait().unwrap(), 7);
        assert_eq!(pool.stats().panicked, 1);
    }

    #[test]
    fn test_enqueue_after_shutdown_is_rejected() {
        let pool = TaskPool::new(2).unwrap();
        pool.shutdown();
        assert!(pool.is_stopping());
        assert_eq!(pool.enqueue(|| ()).unwrap_err(), TaskError::ShuttingDown);
        // Second shutdown is a no-op.
        pool.shutdown();
    }

    #[test]
    fn test_wait_timeout_reports_unfinished() {
        let pool = TaskPool::new(1).unwrap();
        let gate = Arc::new(AtomicUsize::new(0));
        let job_gate = Arc::clone(&gate);
        let handle = pool
            .enqueue(move || {
                while job_gate.load(Ordering::Acquire) == 0 {
                    thread::yield_now();
                }
                5
            })
            .unwrap();

        assert_eq!(handle.wait_timeout(Duration::from_millis(10)).unwrap(), None);
        gate.store(1, Ordering::Release);
        assert_eq!(handle.wait_timeout(Duration::from_secs(5)).unwrap(), Some(5));
    }

    #[test]
    fn test_zero_threads_means_hardware() {
        let config = TaskPoolConfig::default();
        assert!(config.resolved_threads() >= 1);
    }
}
