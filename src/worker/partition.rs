//! Partition worker loop (§4.2). No partition worker ever reads another
//! partition worker's queues — that's what makes the affinity invariant
//! (Invariant 1) hold mechanically rather than by convention.

use crate::handler::OperationHandler;
use crate::identity::{self, ThreadKind};
use crate::node_ext::NodeExtension;
use crate::queue::{Dequeued, QueuePair, dequeue};
use crate::task::{PartitionId, Task};
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub(crate) struct PartitionWorkerContext<T> {
    pub(crate) worker_id: usize,
    pub(crate) scheduler_id: u64,
    pub(crate) queue: Arc<QueuePair<T>>,
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) partition_handlers: Arc<Vec<Arc<dyn OperationHandler<T>>>>,
    pub(crate) current_handler: Arc<ArcSwapOption<dyn OperationHandler<T>>>,
    pub(crate) processed_count: Arc<AtomicU64>,
    pub(crate) faults: Arc<AtomicU64>,
    pub(crate) node_extension: Arc<dyn NodeExtension>,
}

pub(crate) fn run<T: Send + 'static>(ctx: PartitionWorkerContext<T>) {
    identity::set_current(ThreadKind::Partition(ctx.worker_id), ctx.scheduler_id);
    let span = tracing::info_span!("partition_worker", worker_id = ctx.worker_id);
    let _guard = span.enter();
    tracing::info!("partition worker started");

    loop {
        match dequeue(&ctx.queue, &ctx.running) {
            Dequeued::Stopped => break,
            Dequeued::Task(task) => {
                if task.is_trigger() {
                    continue;
                }
                process_one(&ctx, task);
            }
        }
    }

    tracing::info!(
        processed = ctx.processed_count.load(Ordering::Relaxed),
        "partition worker stopped"
    );
}

fn process_one<T: Send + 'static>(ctx: &PartitionWorkerContext<T>, task: Task<T>) {
    let partition_id: PartitionId = task
        .partition_id()
        .expect("non-trigger task always carries a partition id");
    debug_assert!(
        partition_id >= 0,
        "dispatcher must never route a negative partition id to a partition worker"
    );

    let Some(handler) = ctx
        .partition_handlers
        .get(partition_id as usize)
        .cloned()
    else {
        tracing::error!(partition_id, "no handler registered for this partition id; dropping task");
        return;
    };

    ctx.current_handler.store(Some(handler.clone()));
    ctx.node_extension.before_run();
    super::run_catching(handler.as_ref(), task, &ctx.faults);
    ctx.node_extension.after_run();
    ctx.current_handler.store(None);
    ctx.processed_count.fetch_add(1, Ordering::Relaxed);
}
