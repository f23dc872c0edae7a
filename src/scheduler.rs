//! The scheduler itself (C7): construction, shutdown, and the public
//! surface external callers and collaborators use (§4.6, §4.7, §6).

use crate::config::SchedulerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Result, SchedulerError};
use crate::handler::{OperationHandler, OperationHandlerFactory, ResponsePacketHandler};
use crate::identity::{self, ThreadKind};
use crate::metrics::{self, GenericWorkerStats, PartitionWorkerStats, SchedulerMetrics};
use crate::naming::{NodeNaming, PrefixNaming};
use crate::node_ext::{NodeExtension, NoopExtension};
use crate::queue::QueuePair;
use crate::task::{Operation, PartitionId, PartitionRunnable, Packet};
use crate::worker::{self, generic::GenericWorkerContext, partition::PartitionWorkerContext, response::ResponseWorkerContext};
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

static NEXT_SCHEDULER_ID: AtomicU64 = AtomicU64::new(1);

/// Bound on every worker's shutdown join (§4.7 step 3).
const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(3);

struct WorkerHandles {
    partition: Vec<JoinHandle<()>>,
    generic: Vec<JoinHandle<()>>,
    response: JoinHandle<()>,
}

/// Owns every scheduler-owned thread and the state needed to route, inspect,
/// and shut them down. See §3 for the field-level invariants this type
/// upholds.
pub struct Scheduler<T> {
    id: u64,
    config: SchedulerConfig,
    dispatcher: Dispatcher<T>,
    partition_shutdown_flag: Arc<AtomicBool>,
    generic_shutdown_flag: Arc<AtomicBool>,
    response_shutdown_flag: Arc<AtomicBool>,
    partition_current_handlers: Vec<Arc<ArcSwapOption<dyn OperationHandler<T>>>>,
    partition_processed: Vec<Arc<AtomicU64>>,
    generic_busy: Vec<Arc<AtomicBool>>,
    generic_processed: Vec<Arc<AtomicU64>>,
    generic_handlers: Vec<Arc<dyn OperationHandler<T>>>,
    ad_hoc_handler: Arc<dyn OperationHandler<T>>,
    response_processed: Arc<AtomicU64>,
    faults: Arc<AtomicU64>,
    handles: Mutex<Option<WorkerHandles>>,
}

impl<T: Send + 'static> Scheduler<T> {
    /// Construct and start the scheduler with default naming and a no-op
    /// node extension (§4.7 construction steps 1-4).
    pub fn new(
        config: SchedulerConfig,
        factory: Arc<dyn OperationHandlerFactory<T>>,
        response_handler: Arc<dyn ResponsePacketHandler<T>>,
    ) -> Self {
        Self::with_collaborators(config, factory, response_handler, Arc::new(NoopExtension), None)
    }

    /// Full constructor exposing every external collaborator from §6.
    pub fn with_collaborators(
        config: SchedulerConfig,
        factory: Arc<dyn OperationHandlerFactory<T>>,
        response_handler: Arc<dyn ResponsePacketHandler<T>>,
        node_extension: Arc<dyn NodeExtension>,
        naming: Option<Arc<dyn NodeNaming>>,
    ) -> Self {
        let id = NEXT_SCHEDULER_ID.fetch_add(1, Ordering::Relaxed);
        let naming: Arc<dyn NodeNaming> = naming.unwrap_or_else(|| {
            Arc::new(PrefixNaming {
                prefix: config.thread_name_prefix.clone(),
            })
        });

        // Step 1: resolve P and G.
        let num_partition_workers = config.resolved_partition_threads();
        let num_generic_workers = config.resolved_generic_threads();

        // Step 2: build the handler tables before any worker starts
        // (Handler table immutability, §9).
        let partition_handlers: Arc<Vec<Arc<dyn OperationHandler<T>>>> = Arc::new(
            (0..config.partition_count)
                .map(|p| factory.create_partition_handler(p as PartitionId))
                .collect(),
        );
        let generic_handlers: Vec<Arc<dyn OperationHandler<T>>> = (0..num_generic_workers)
            .map(|_| factory.create_generic_handler())
            .collect();
        let ad_hoc_handler = factory.create_ad_hoc_handler();

        let faults = Arc::new(AtomicU64::new(0));
        let partition_shutdown_flag = Arc::new(AtomicBool::new(true));
        let generic_shutdown_flag = Arc::new(AtomicBool::new(true));
        let response_shutdown_flag = Arc::new(AtomicBool::new(true));

        let partition_queues: Arc<Vec<Arc<QueuePair<T>>>> = Arc::new(
            (0..num_partition_workers)
                .map(|_| Arc::new(QueuePair::new()))
                .collect(),
        );
        let generic_queue = Arc::new(QueuePair::new());
        let (response_tx, response_rx) = crossbeam_channel::unbounded::<Packet<T>>();

        let partition_current_handlers: Vec<_> = (0..num_partition_workers)
            .map(|_| Arc::new(ArcSwapOption::<dyn OperationHandler<T>>::from(None)))
            .collect();
        let partition_processed: Vec<_> = (0..num_partition_workers)
            .map(|_| Arc::new(AtomicU64::new(0)))
            .collect();
        let generic_busy: Vec<_> = (0..num_generic_workers)
            .map(|_| Arc::new(AtomicBool::new(false)))
            .collect();
        let generic_processed: Vec<_> = (0..num_generic_workers)
            .map(|_| Arc::new(AtomicU64::new(0)))
            .collect();
        let response_processed = Arc::new(AtomicU64::new(0));

        // Step 3: start partition workers, then generic workers, then the
        // response worker.
        let partition_handles: Vec<JoinHandle<()>> = (0..num_partition_workers)
            .map(|worker_id| {
                let ctx = PartitionWorkerContext {
                    worker_id,
                    scheduler_id: id,
                    queue: partition_queues[worker_id].clone(),
                    running: partition_shutdown_flag.clone(),
                    partition_handlers: partition_handlers.clone(),
                    current_handler: partition_current_handlers[worker_id].clone(),
                    processed_count: partition_processed[worker_id].clone(),
                    faults: faults.clone(),
                    node_extension: node_extension.clone(),
                };
                std::thread::Builder::new()
                    .name(naming.partition_thread_name(worker_id))
                    .spawn(move || worker::partition::run(ctx))
                    .expect("failed to spawn partition worker thread")
            })
            .collect();

        let generic_handles: Vec<JoinHandle<()>> = (0..num_generic_workers)
            .map(|worker_id| {
                let ctx = GenericWorkerContext {
                    worker_id,
                    scheduler_id: id,
                    queue: generic_queue.clone(),
                    shutdown_flag: generic_shutdown_flag.clone(),
                    handler: generic_handlers[worker_id].clone(),
                    processed_count: generic_processed[worker_id].clone(),
                    faults: faults.clone(),
                    node_extension: node_extension.clone(),
                    busy: generic_busy[worker_id].clone(),
                };
                std::thread::Builder::new()
                    .name(naming.generic_thread_name(worker_id))
                    .spawn(move || worker::generic::run(ctx))
                    .expect("failed to spawn generic worker thread")
            })
            .collect();

        let response_ctx = ResponseWorkerContext {
            scheduler_id: id,
            queue_rx: response_rx,
            shutdown_flag: response_shutdown_flag.clone(),
            handler: response_handler,
            processed_responses: response_processed.clone(),
            faults: faults.clone(),
            node_extension: node_extension.clone(),
        };
        let response_handle = std::thread::Builder::new()
            .name(naming.response_thread_name())
            .spawn(move || worker::response::run(response_ctx))
            .expect("failed to spawn response worker thread");

        // Step 4: log the worker counts.
        tracing::info!(
            scheduler_id = id,
            partition_workers = num_partition_workers,
            generic_workers = num_generic_workers,
            partition_count = config.partition_count,
            "scheduler started"
        );

        let dispatcher = Dispatcher {
            num_partition_workers,
            partition_queues,
            generic_queue,
            response_tx,
        };

        Self {
            id,
            config,
            dispatcher,
            partition_shutdown_flag,
            generic_shutdown_flag,
            response_shutdown_flag,
            partition_current_handlers,
            partition_processed,
            generic_busy,
            generic_processed,
            generic_handlers,
            ad_hoc_handler,
            response_processed,
            faults,
            handles: Mutex::new(Some(WorkerHandles {
                partition: partition_handles,
                generic: generic_handles,
                response: response_handle,
            })),
        }
    }

    fn num_partition_workers(&self) -> usize {
        self.dispatcher.num_partition_workers
    }

    // ---- §4.1 dispatch surface ----

    pub fn execute_operation(&self, operation: Operation<T>) {
        self.dispatcher.execute_operation(operation);
    }

    /// Per §9's resolved open question: runnables must always declare a
    /// partition.
    pub fn execute_runnable(&self, runnable: PartitionRunnable<T>) -> Result<()> {
        if runnable.partition_id < 0 {
            return Err(SchedulerError::InvalidArgument(
                "partition-bound runnable must declare a non-negative partition id",
            ));
        }
        self.dispatcher.execute_runnable(runnable);
        Ok(())
    }

    pub fn execute_packet(&self, packet: Packet<T>) -> Result<()> {
        self.dispatcher.execute_packet(packet)
    }

    /// Bypasses the queues entirely; the caller must already satisfy
    /// `may_run_here` or this fails with `ThreadAffinity` (§4.1, §4.6).
    pub fn run_on_calling_thread(&self, operation: Operation<T>) -> Result<()> {
        if !self.may_run_here(operation.partition_id) {
            return Err(SchedulerError::ThreadAffinity(format!(
                "calling thread may not run partition id {} inline",
                operation.partition_id
            )));
        }
        let handler = self.current_thread_operation_handler();
        handler.process(crate::task::Task::Operation(operation));
        Ok(())
    }

    // ---- §4.6 thread-identity predicates ----

    pub fn may_run_here(&self, partition_id: PartitionId) -> bool {
        match identity::current_for(self.id) {
            ThreadKind::Io => false,
            ThreadKind::Generic(_) => partition_id < 0,
            ThreadKind::Partition(t) => {
                partition_id >= 0 && t == (partition_id as usize % self.num_partition_workers())
            }
            ThreadKind::Response | ThreadKind::Other => partition_id < 0,
        }
    }

    pub fn may_invoke_here(&self, partition_id: PartitionId) -> bool {
        match identity::current_for(self.id) {
            ThreadKind::Io => false,
            ThreadKind::Generic(_) => true,
            ThreadKind::Partition(t) => {
                partition_id < 0 || t == (partition_id as usize % self.num_partition_workers())
            }
            ThreadKind::Response | ThreadKind::Other => true,
        }
    }

    pub fn is_operation_thread(&self) -> bool {
        matches!(
            identity::current_for(self.id),
            ThreadKind::Partition(_) | ThreadKind::Generic(_)
        )
    }

    /// For partition workers, the handler currently in their current-handler
    /// slot, falling back to the ad-hoc handler if called while idle; for
    /// generic workers, their fixed handler; for anything else, the ad-hoc
    /// handler (§4.6).
    pub fn current_thread_operation_handler(&self) -> Arc<dyn OperationHandler<T>> {
        match identity::current_for(self.id) {
            ThreadKind::Partition(t) => self.partition_current_handlers[t]
                .load_full()
                .unwrap_or_else(|| self.ad_hoc_handler.clone()),
            ThreadKind::Generic(g) => self.generic_handlers[g].clone(),
            ThreadKind::Io | ThreadKind::Response | ThreadKind::Other => self.ad_hoc_handler.clone(),
        }
    }

    // ---- §4.7 metrics ----

    pub fn running_operation_count(&self) -> usize {
        let partition_busy = self
            .partition_current_handlers
            .iter()
            .filter(|slot| slot.load().is_some())
            .count();
        let generic_busy = self
            .generic_busy
            .iter()
            .filter(|b| b.load(Ordering::Acquire))
            .count();
        partition_busy + generic_busy
    }

    pub fn operation_executor_queue_size(&self) -> usize {
        let partition_sum: usize = self
            .dispatcher
            .partition_queues
            .iter()
            .map(|q| q.normal_len())
            .sum();
        partition_sum + self.dispatcher.generic_queue.normal_len()
    }

    pub fn priority_operation_executor_queue_size(&self) -> usize {
        let partition_sum: usize = self
            .dispatcher
            .partition_queues
            .iter()
            .map(|q| q.priority_len())
            .sum();
        partition_sum + self.dispatcher.generic_queue.priority_len()
    }

    pub fn response_queue_size(&self) -> usize {
        self.dispatcher.response_tx.len()
    }

    pub fn metrics(&self) -> SchedulerMetrics {
        SchedulerMetrics {
            running_operation_count: self.running_operation_count(),
            operation_executor_queue_size: self.operation_executor_queue_size(),
            priority_operation_executor_queue_size: self.priority_operation_executor_queue_size(),
            response_queue_size: self.response_queue_size(),
        }
    }

    pub fn dump_performance_metrics(&self) -> String {
        let partition_stats: Vec<PartitionWorkerStats> = self
            .dispatcher
            .partition_queues
            .iter()
            .enumerate()
            .map(|(i, q)| PartitionWorkerStats {
                worker_id: i,
                processed_count: self.partition_processed[i].load(Ordering::Relaxed),
                pending_count: q.normal_len() + q.priority_len(),
            })
            .collect();
        let generic_stats: Vec<GenericWorkerStats> = self
            .generic_processed
            .iter()
            .enumerate()
            .map(|(i, p)| GenericWorkerStats {
                worker_id: i,
                processed_count: p.load(Ordering::Relaxed),
            })
            .collect();
        let pending_generic =
            self.dispatcher.generic_queue.normal_len() + self.dispatcher.generic_queue.priority_len();

        let mut buf = String::new();
        metrics::dump_performance_metrics(
            &mut buf,
            &partition_stats,
            pending_generic,
            &generic_stats,
            self.response_processed.load(Ordering::Relaxed),
            self.response_queue_size(),
        );
        buf
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn fault_count(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    // ---- §4.7 shutdown ----

    /// Signal order matches §4.7 step 2: response worker first, then all
    /// partition workers, then all generic workers. Each worker is joined
    /// with the 3-second bound from step 3; a worker that misses it is left
    /// running and a warning is logged rather than blocking shutdown
    /// forever.
    pub fn shutdown(&self) {
        tracing::info!(scheduler_id = self.id, "scheduler shutdown requested");

        self.response_shutdown_flag.store(false, Ordering::Release);

        self.partition_shutdown_flag.store(false, Ordering::Release);
        for q in self.dispatcher.partition_queues.iter() {
            q.wake();
        }

        self.generic_shutdown_flag.store(false, Ordering::Release);
        for _ in 0..self.generic_busy.len() {
            self.dispatcher.generic_queue.wake();
        }

        let Some(handles) = self.handles.lock().expect("handles mutex poisoned").take() else {
            tracing::warn!(scheduler_id = self.id, "shutdown called more than once");
            return;
        };

        if worker::join_with_timeout(handles.response, SHUTDOWN_JOIN_TIMEOUT).is_err() {
            tracing::warn!(
                scheduler_id = self.id,
                "response worker did not stop within the shutdown bound"
            );
        }
        for (i, h) in handles.partition.into_iter().enumerate() {
            if worker::join_with_timeout(h, SHUTDOWN_JOIN_TIMEOUT).is_err() {
                tracing::warn!(
                    scheduler_id = self.id,
                    worker_id = i,
                    "partition worker did not stop within the shutdown bound"
                );
            }
        }
        for (i, h) in handles.generic.into_iter().enumerate() {
            if worker::join_with_timeout(h, SHUTDOWN_JOIN_TIMEOUT).is_err() {
                tracing::warn!(
                    scheduler_id = self.id,
                    worker_id = i,
                    "generic worker did not stop within the shutdown bound"
                );
            }
        }

        tracing::info!(scheduler_id = self.id, "scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDescriptor;

    struct NoopHandler;

    impl OperationHandler<u32> for NoopHandler {
        fn process(&self, _task: crate::task::Task<u32>) {}

        fn current_task(&self) -> Option<TaskDescriptor> {
            None
        }
    }

    struct NoopFactory;

    impl OperationHandlerFactory<u32> for NoopFactory {
        fn create_partition_handler(&self, _partition_id: PartitionId) -> Arc<dyn OperationHandler<u32>> {
            Arc::new(NoopHandler)
        }

        fn create_generic_handler(&self) -> Arc<dyn OperationHandler<u32>> {
            Arc::new(NoopHandler)
        }

        fn create_ad_hoc_handler(&self) -> Arc<dyn OperationHandler<u32>> {
            Arc::new(NoopHandler)
        }
    }

    struct NoopResponseHandler;

    impl ResponsePacketHandler<u32> for NoopResponseHandler {
        fn handle(&self, _packet: Packet<u32>) {}
    }

    fn test_scheduler(partitions: i64, generics: i64, partition_count: u32) -> Scheduler<u32> {
        let config = SchedulerConfig {
            partition_operation_thread_count: partitions,
            generic_operation_thread_count: generics,
            partition_count,
            thread_name_prefix: "scheduler-test".to_string(),
        };
        Scheduler::new(config, Arc::new(NoopFactory), Arc::new(NoopResponseHandler))
    }

    #[test]
    fn negative_partition_id_runnable_is_rejected() {
        let scheduler = test_scheduler(1, 1, 4);
        let err = scheduler
            .execute_runnable(PartitionRunnable {
                partition_id: -1,
                payload: 0,
            })
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidArgument(_)));
        scheduler.shutdown();
    }

    #[test]
    fn io_thread_may_neither_run_nor_invoke_partitioned_work() {
        let scheduler = test_scheduler(1, 1, 4);
        identity::register_io_thread();

        assert!(!scheduler.may_run_here(0));
        assert!(!scheduler.may_run_here(-1));
        assert!(!scheduler.may_invoke_here(0));
        assert!(!scheduler.may_invoke_here(-1));

        identity::set_current(ThreadKind::Other, 0);
        scheduler.shutdown();
    }

    #[test]
    fn generic_worker_may_invoke_any_partition_but_only_run_unsharded_work() {
        let scheduler = test_scheduler(1, 1, 4);
        identity::set_current(ThreadKind::Generic(0), scheduler.id);

        assert!(scheduler.may_run_here(-1));
        assert!(!scheduler.may_run_here(0));
        assert!(scheduler.may_invoke_here(-1));
        assert!(scheduler.may_invoke_here(0));

        identity::set_current(ThreadKind::Other, 0);
        scheduler.shutdown();
    }
}
