//! Generic worker loop (§4.3). Identical dequeue/priority structure to the
//! partition worker, but the bound handler is fixed at construction and
//! every generic worker shares the same queue pair — work-stealing falls
//! out of that sharing for free, no explicit steal logic needed.

use crate::handler::OperationHandler;
use crate::identity::{self, ThreadKind};
use crate::node_ext::NodeExtension;
use crate::queue::{Dequeued, QueuePair, dequeue};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub(crate) struct GenericWorkerContext<T> {
    pub(crate) worker_id: usize,
    pub(crate) scheduler_id: u64,
    pub(crate) queue: Arc<QueuePair<T>>,
    /// Shared by the whole generic pool: false once shutdown has been
    /// signalled (§4.7 step 2).
    pub(crate) shutdown_flag: Arc<AtomicBool>,
    pub(crate) handler: Arc<dyn OperationHandler<T>>,
    pub(crate) processed_count: Arc<AtomicU64>,
    pub(crate) faults: Arc<AtomicU64>,
    pub(crate) node_extension: Arc<dyn NodeExtension>,
    /// Mirrors the partition worker's current-handler slot for metrics
    /// purposes (`runningOperationCount`, §4.7): the handler itself is
    /// fixed for a generic worker, but whether it is *busy right now* is
    /// not, so this tracks that instead of swapping a constant pointer.
    pub(crate) busy: Arc<AtomicBool>,
}

pub(crate) fn run<T: Send + 'static>(ctx: GenericWorkerContext<T>) {
    identity::set_current(ThreadKind::Generic(ctx.worker_id), ctx.scheduler_id);
    let span = tracing::info_span!("generic_worker", worker_id = ctx.worker_id);
    let _guard = span.enter();
    tracing::info!("generic worker started");

    loop {
        match dequeue(&ctx.queue, &ctx.shutdown_flag) {
            Dequeued::Stopped => break,
            Dequeued::Task(task) => {
                if task.is_trigger() {
                    continue;
                }
                ctx.busy.store(true, Ordering::Release);
                ctx.node_extension.before_run();
                super::run_catching(ctx.handler.as_ref(), task, &ctx.faults);
                ctx.node_extension.after_run();
                ctx.busy.store(false, Ordering::Release);
                ctx.processed_count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    tracing::info!(
        processed = ctx.processed_count.load(Ordering::Relaxed),
        "generic worker stopped"
    );
}
