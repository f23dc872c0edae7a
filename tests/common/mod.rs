use griddle_scheduler::{
    OperationHandler, OperationHandlerFactory, Packet, PartitionId, ResponsePacketHandler, Task,
};
use std::sync::Arc;
use std::sync::Mutex;

/// Records every task it processes, tagged with the name of the thread that
/// processed it, so tests can assert on affinity and ordering.
pub struct RecordingHandler {
    pub records: Arc<Mutex<Vec<RecordedTask>>>,
    pub before_record: Option<Box<dyn Fn() + Send + Sync>>,
}

#[derive(Debug, Clone)]
pub struct RecordedTask {
    pub partition_id: Option<PartitionId>,
    pub urgent: bool,
    pub thread_name: String,
}

impl RecordingHandler {
    pub fn new(records: Arc<Mutex<Vec<RecordedTask>>>) -> Self {
        Self {
            records,
            before_record: None,
        }
    }

    pub fn with_before(records: Arc<Mutex<Vec<RecordedTask>>>, before: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            records,
            before_record: Some(Box::new(before)),
        }
    }
}

impl OperationHandler<u32> for RecordingHandler {
    fn process(&self, task: Task<u32>) {
        if let Some(before) = &self.before_record {
            before();
        }
        let thread_name = std::thread::current().name().unwrap_or("<unnamed>").to_string();
        self.records.lock().unwrap().push(RecordedTask {
            partition_id: task.partition_id(),
            urgent: task.urgent(),
            thread_name,
        });
    }
}

/// Builds a fresh `RecordingHandler` for every partition/generic/ad-hoc slot,
/// all sharing the same records sink.
pub struct RecordingFactory {
    pub records: Arc<Mutex<Vec<RecordedTask>>>,
    pub sleep_per_task: Option<std::time::Duration>,
}

impl OperationHandlerFactory<u32> for RecordingFactory {
    fn create_partition_handler(&self, _partition_id: PartitionId) -> Arc<dyn OperationHandler<u32>> {
        let records = self.records.clone();
        let sleep = self.sleep_per_task;
        Arc::new(RecordingHandler::with_before(records, move || {
            if let Some(d) = sleep {
                std::thread::sleep(d);
            }
        }))
    }

    fn create_generic_handler(&self) -> Arc<dyn OperationHandler<u32>> {
        Arc::new(RecordingHandler::new(self.records.clone()))
    }

    fn create_ad_hoc_handler(&self) -> Arc<dyn OperationHandler<u32>> {
        Arc::new(RecordingHandler::new(self.records.clone()))
    }
}

pub struct NoopResponseHandler;

impl ResponsePacketHandler<u32> for NoopResponseHandler {
    fn handle(&self, _packet: Packet<u32>) {}
}

pub struct RecordingResponseHandler {
    pub records: Arc<Mutex<Vec<RecordedTask>>>,
}

impl ResponsePacketHandler<u32> for RecordingResponseHandler {
    fn handle(&self, packet: Packet<u32>) {
        let thread_name = std::thread::current().name().unwrap_or("<unnamed>").to_string();
        self.records.lock().unwrap().push(RecordedTask {
            partition_id: Some(packet.partition_id),
            urgent: packet.urgent,
            thread_name,
        });
    }
}
