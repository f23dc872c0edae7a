//! Error kinds (§7). Dispatch-time errors propagate synchronously to the
//! caller; errors raised *inside* a handler never surface here (they are
//! caught by the worker, logged, and counted — see [`crate::metrics`]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A null/missing task was passed to a public entry point.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A packet was dispatched without the operation header bit set.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// `run_on_calling_thread` was invoked when `may_run_here` is false.
    #[error("thread affinity violation: {0}")]
    ThreadAffinity(String),

    /// Reserved for a future bounded-queue revision (§7, §9). This variant
    /// is never constructed by the unbounded queues in this revision; a
    /// rejected enqueue there would be logged at `error!` and the task
    /// dropped, never returned to the caller as a `SchedulerError`.
    #[error("operation queue overloaded")]
    Overload,
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
