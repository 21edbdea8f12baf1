//! Retry-capable task runtime backed by a dedicated rayon thread pool.
//!
//! Callers submit a batch of task invocations and block on a single join
//! point. There is no streaming of partial results, no cancellation and no
//! timeout: [`TaskRuntime::run_all`] returns once every task has either
//! succeeded, exhausted its retries, or panicked.

use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{BenchError, Result};

/// Number of automatic re-executions granted to a failing task.
///
/// # Examples
/// ```
/// use mlbench_core::RetryPolicy;
///
/// let policy = RetryPolicy::new(2);
/// assert_eq!(policy.max_attempts(), 3);
/// assert_eq!(RetryPolicy::none().max_attempts(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    /// Allows up to `max_retries` re-executions after the first attempt.
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Runs each task exactly once.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(0)
    }

    /// Returns the configured retry count.
    #[must_use]
    pub const fn max_retries(self) -> u32 {
        self.max_retries
    }

    /// Returns the total attempts a task may consume.
    #[must_use]
    pub const fn max_attempts(self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Identifies the task invocation a closure is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskContext {
    /// Zero-based index of the task in its batch.
    pub task: usize,
    /// One-based attempt number.
    pub attempt: u32,
}

/// Failure of a dispatched task.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TaskError {
    /// Every attempt allowed by the retry policy returned an error.
    #[error("task {task} failed after {attempts} attempt(s): {message}")]
    Exhausted {
        /// Index of the failing task.
        task: usize,
        /// Attempts consumed.
        attempts: u32,
        /// Error returned by the final attempt.
        message: Arc<str>,
    },
    /// The task panicked. Panics are not retried.
    #[error("task {task} panicked on attempt {attempt}: {message}")]
    Panicked {
        /// Index of the panicking task.
        task: usize,
        /// Attempt that panicked.
        attempt: u32,
        /// Panic payload rendered as text.
        message: Arc<str>,
    },
}

/// Outcome of one task invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport<T> {
    /// Zero-based index of the task in its batch.
    pub task: usize,
    /// Attempts consumed, including the successful one.
    pub attempts: u32,
    /// Value produced by the task or the reason it did not complete.
    pub outcome: core::result::Result<T, TaskError>,
}

impl<T> TaskReport<T> {
    /// Converts the report into the task value.
    ///
    /// # Errors
    /// Returns [`BenchError::Task`] when the task did not complete.
    pub fn into_result(self) -> Result<T> {
        self.outcome.map_err(BenchError::from)
    }
}

/// Scheduler for retry-capable tasks.
pub struct TaskRuntime {
    pool: ThreadPool,
    workers: usize,
    attempts: AtomicUsize,
}

impl fmt::Debug for TaskRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRuntime")
            .field("workers", &self.workers)
            .field("attempts", &self.attempts.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl TaskRuntime {
    /// Starts a runtime with `workers` threads named `mlbench-task-{n}`.
    ///
    /// # Errors
    /// Returns [`BenchError::InvalidParameter`] for zero workers and
    /// [`BenchError::RuntimeBuild`] when the thread pool cannot be created.
    #[instrument(name = "runtime.start", err)]
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(BenchError::invalid_parameter("workers", workers));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("mlbench-task-{index}"))
            .build()
            .map_err(|error| BenchError::RuntimeBuild {
                message: Arc::from(error.to_string()),
            })?;
        info!(workers, "task runtime started");
        Ok(Self {
            pool,
            workers,
            attempts: AtomicUsize::new(0),
        })
    }

    /// Returns the size of the worker pool.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Returns the number of task attempts executed so far.
    #[must_use]
    pub fn attempts_executed(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Submits `tasks` invocations of `task` and waits for all of them.
    ///
    /// A task returning `Err` is re-executed until it succeeds or `policy`
    /// runs out of attempts. Reports are returned in submission order.
    ///
    /// # Examples
    /// ```
    /// use mlbench_core::{RetryPolicy, TaskRuntime};
    ///
    /// let runtime = TaskRuntime::new(2).expect("pool starts");
    /// let reports = runtime.run_all(3, RetryPolicy::new(1), |ctx| {
    ///     if ctx.attempt == 1 { Err("flaky") } else { Ok(ctx.task * 10) }
    /// });
    /// let values: Vec<_> = reports.into_iter().map(|r| r.outcome.ok()).collect();
    /// assert_eq!(values, vec![Some(0), Some(10), Some(20)]);
    /// runtime.shutdown();
    /// ```
    #[instrument(name = "runtime.run_all", skip(self, task), fields(workers = self.workers))]
    pub fn run_all<T, E, F>(
        &self,
        tasks: usize,
        policy: RetryPolicy,
        task: F,
    ) -> Vec<TaskReport<T>>
    where
        T: Send,
        E: fmt::Display,
        F: Fn(TaskContext) -> core::result::Result<T, E> + Sync,
    {
        self.pool.install(|| {
            (0..tasks)
                .into_par_iter()
                .map(|index| self.execute(index, policy, &task))
                .collect()
        })
    }

    /// Submits a single task and waits for it.
    pub fn run_one<T, E, F>(&self, policy: RetryPolicy, task: F) -> TaskReport<T>
    where
        T: Send,
        E: fmt::Display,
        F: Fn(TaskContext) -> core::result::Result<T, E> + Sync,
    {
        let mut reports = self.run_all(1, policy, task);
        reports.pop().unwrap_or_else(|| TaskReport {
            task: 0,
            attempts: 0,
            outcome: Err(TaskError::Panicked {
                task: 0,
                attempt: 0,
                message: Arc::from("task produced no report"),
            }),
        })
    }

    /// Stops the worker pool and reports how much work it executed.
    pub fn shutdown(self) {
        info!(
            workers = self.workers,
            attempts = self.attempts_executed(),
            "task runtime shut down"
        );
    }

    fn execute<T, E, F>(&self, task: usize, policy: RetryPolicy, body: &F) -> TaskReport<T>
    where
        E: fmt::Display,
        F: Fn(TaskContext) -> core::result::Result<T, E>,
    {
        let mut attempt = 0_u32;
        loop {
            attempt = attempt.saturating_add(1);
            self.attempts.fetch_add(1, Ordering::Relaxed);
            let context = TaskContext { task, attempt };
            match panic::catch_unwind(AssertUnwindSafe(|| body(context))) {
                Ok(Ok(value)) => {
                    debug!(task, attempt, "task succeeded");
                    return TaskReport {
                        task,
                        attempts: attempt,
                        outcome: Ok(value),
                    };
                }
                Ok(Err(error)) if attempt < policy.max_attempts() => {
                    warn!(task, attempt, error = %error, "task attempt failed; retrying");
                }
                Ok(Err(error)) => {
                    warn!(task, attempt, error = %error, "task retries exhausted");
                    return TaskReport {
                        task,
                        attempts: attempt,
                        outcome: Err(TaskError::Exhausted {
                            task,
                            attempts: attempt,
                            message: Arc::from(error.to_string()),
                        }),
                    };
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(task, attempt, message = &*message, "task panicked");
                    return TaskReport {
                        task,
                        attempts: attempt,
                        outcome: Err(TaskError::Panicked {
                            task,
                            attempt,
                            message,
                        }),
                    };
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Arc<str> {
    if let Some(text) = payload.downcast_ref::<&str>() {
        return Arc::from(*text);
    }
    if let Some(text) = payload.downcast_ref::<String>() {
        return Arc::from(text.as_str());
    }
    Arc::from("non-string panic payload")
}
