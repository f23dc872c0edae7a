//! Small standalone demo: builds a scheduler with toy handlers, submits a
//! mix of partition and generic work plus one urgent operation, dumps
//! metrics, and shuts down cleanly.

use griddle_scheduler::{
    NodeExtension, Operation, OperationHandler, OperationHandlerFactory, Packet,
    PartitionId, ResponsePacketHandler, Scheduler, SchedulerConfig, Task,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

struct CountingHandler {
    processed: AtomicU64,
}

impl OperationHandler<String> for CountingHandler {
    fn process(&self, task: Task<String>) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if let Some(partition_id) = task.partition_id() {
            tracing::debug!(partition_id, "processed demo task");
        }
    }
}

struct DemoFactory;

impl OperationHandlerFactory<String> for DemoFactory {
    fn create_partition_handler(&self, _partition_id: PartitionId) -> Arc<dyn OperationHandler<String>> {
        Arc::new(CountingHandler {
            processed: AtomicU64::new(0),
        })
    }

    fn create_generic_handler(&self) -> Arc<dyn OperationHandler<String>> {
        Arc::new(CountingHandler {
            processed: AtomicU64::new(0),
        })
    }

    fn create_ad_hoc_handler(&self) -> Arc<dyn OperationHandler<String>> {
        Arc::new(CountingHandler {
            processed: AtomicU64::new(0),
        })
    }
}

struct DemoResponseHandler;

impl ResponsePacketHandler<String> for DemoResponseHandler {
    fn handle(&self, packet: Packet<String>) {
        tracing::info!(payload = %packet.payload, "handled response packet");
    }
}

struct LoggingExtension;

impl NodeExtension for LoggingExtension {
    fn before_run(&self) {
        tracing::trace!("entering task");
    }

    fn after_run(&self) {
        tracing::trace!("leaving task");
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let config = SchedulerConfig {
        partition_operation_thread_count: 4,
        generic_operation_thread_count: 2,
        partition_count: 16,
        thread_name_prefix: "demo".to_string(),
    };

    let scheduler: Scheduler<String> = Scheduler::with_collaborators(
        config,
        Arc::new(DemoFactory),
        Arc::new(DemoResponseHandler),
        Arc::new(LoggingExtension),
        None,
    );

    for partition_id in 0..16 {
        scheduler.execute_operation(Operation {
            partition_id,
            urgent: false,
            payload: format!("hello from partition {partition_id}"),
        });
    }

    scheduler.execute_operation(Operation {
        partition_id: 3,
        urgent: true,
        payload: "urgent partition 3 work".to_string(),
    });

    scheduler.execute_operation(Operation {
        partition_id: -1,
        urgent: false,
        payload: "generic work".to_string(),
    });

    scheduler
        .execute_packet(Packet {
            partition_id: -1,
            urgent: false,
            operation_header: true,
            response_header: true,
            payload: "a response packet".to_string(),
        })
        .expect("well-formed response packet");

    std::thread::sleep(Duration::from_millis(200));

    println!("{}", scheduler.dump_performance_metrics());

    scheduler.shutdown();
}
