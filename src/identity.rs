//! Thread identity as a capability (§9 Design Notes): the source checks
//! `currentThread instanceof PartitionOperationThread`; here every
//! scheduler-owned thread installs a thread-local descriptor at start, and
//! the predicates in §4.6 read it back. This is deliberately a plain
//! `Cell`, not an atomic — it is only ever read by the thread that owns it.

use std::cell::Cell;

/// What kind of thread is currently executing. `scheduler_id` disambiguates
/// workers belonging to different `Scheduler` instances that happen to
/// share a process (mainly relevant in tests that spin up more than one
/// scheduler); it is ignored for [`ThreadKind::Io`], which is a
/// process-wide role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadKind {
    Io,
    Partition(usize),
    Generic(usize),
    Response,
    Other,
}

thread_local! {
    static THREAD_CTX: Cell<(ThreadKind, u64)> = const { Cell::new((ThreadKind::Other, 0)) };
}

/// Registers the calling thread as the network/IO reactor thread. IO
/// threads are banned from both `may_run_here` and `may_invoke_here` (§4.6)
/// so that inline operation dispatch can never block the reactor.
pub fn register_io_thread() {
    THREAD_CTX.with(|c| c.set((ThreadKind::Io, 0)));
}

pub(crate) fn set_current(kind: ThreadKind, scheduler_id: u64) {
    THREAD_CTX.with(|c| c.set((kind, scheduler_id)));
}

/// The `(kind, owning-scheduler-id)` pair as seen from `scheduler_id`'s
/// point of view: a worker of a *different* scheduler is reported as
/// [`ThreadKind::Other`], matching "any other thread" in the §4.6 tables.
pub(crate) fn current_for(scheduler_id: u64) -> ThreadKind {
    THREAD_CTX.with(|c| {
        let (kind, owner) = c.get();
        match kind {
            ThreadKind::Io => ThreadKind::Io,
            ThreadKind::Other => ThreadKind::Other,
            _ if owner == scheduler_id => kind,
            _ => ThreadKind::Other,
        }
    })
}
