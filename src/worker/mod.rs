//! Long-lived worker threads (C2/C3/C4). Each worker owns its queue-reading
//! loop; nothing outside this module ever reads a worker's queues, which is
//! what keeps the affinity invariant mechanically checkable.

pub(crate) mod generic;
pub(crate) mod partition;
pub(crate) mod response;

use crate::handler::OperationHandler;
use crate::task::Task;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Drives a handler on a task, catching panics the way §7 requires: "a
/// faulty handler must not kill its worker". `process` takes `&self`, not
/// `&mut self`, so nothing here needs `UnwindSafe` bounds beyond the
/// `AssertUnwindSafe` wrapper — the handler is responsible for its own
/// internal consistency across a caught panic, same as the source leaves
/// that to the handler author.
pub(crate) fn run_catching<T>(handler: &dyn OperationHandler<T>, task: Task<T>, faults: &AtomicU64) {
    if let Some(msg) = catch_panics(|| handler.process(task)) {
        faults.fetch_add(1, Ordering::Relaxed);
        tracing::error!(error = %msg, "handler panicked; worker continues with next task");
    }
}

/// Runs `f`, catching a panic and returning its message instead of
/// unwinding further. Shared by every worker kind (partition, generic,
/// response) so the panic-to-message mapping can't drift between them;
/// callers are responsible for counting the fault and logging with the
/// context-appropriate message.
pub(crate) fn catch_panics(f: impl FnOnce()) -> Option<String> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(()) => None,
        Err(payload) => Some(panic_message(&payload)),
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

/// Bounded join from §4.7 shutdown step 3. `std::thread::JoinHandle` has no
/// timed join, so this polls `is_finished()` — the idiomatic stand-in for
/// "join with a 3s bound, and if interrupted, keep going" in a runtime with
/// no thread interrupts.
pub(crate) fn join_with_timeout<T>(
    handle: std::thread::JoinHandle<T>,
    timeout: Duration,
) -> Result<T, std::thread::JoinHandle<T>> {
    let start = Instant::now();
    let mut backoff = Duration::from_micros(100);
    while !handle.is_finished() {
        if start.elapsed() >= timeout {
            return Err(handle);
        }
        std::thread::sleep(backoff.min(timeout.saturating_sub(start.elapsed())));
        backoff = (backoff * 2).min(Duration::from_millis(10));
    }
    Ok(handle.join().expect("worker thread panicked"))
}
