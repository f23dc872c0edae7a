//! Stateless routing logic (C5, §4.1). "Stateless" here means the
//! dispatcher itself holds no mutable state of its own — it only reads the
//! queue handles the scheduler built at construction time and decides
//! which one a task goes to.

use crate::error::{Result, SchedulerError};
use crate::queue::QueuePair;
use crate::task::{Operation, OperationPacket, Packet, PartitionId, PartitionRunnable, Task};
use crossbeam_channel::Sender;
use std::sync::Arc;

pub(crate) struct Dispatcher<T> {
    pub(crate) num_partition_workers: usize,
    pub(crate) partition_queues: Arc<Vec<Arc<QueuePair<T>>>>,
    pub(crate) generic_queue: Arc<QueuePair<T>>,
    pub(crate) response_tx: Sender<Packet<T>>,
}

impl<T: Send + 'static> Dispatcher<T> {
    /// Routing rule from §4.1: `partitionId < 0` goes to the shared generic
    /// pair, otherwise to `partitionWorkers[partitionId mod P]`.
    fn route(&self, partition_id: PartitionId) -> &Arc<QueuePair<T>> {
        if partition_id < 0 {
            &self.generic_queue
        } else {
            let idx = (partition_id as usize) % self.num_partition_workers;
            &self.partition_queues[idx]
        }
    }

    pub(crate) fn execute_operation(&self, op: Operation<T>) {
        let pair = self.route(op.partition_id);
        pair.enqueue(Task::Operation(op));
    }

    /// Runnables always declare a partition (§9's resolved open question)
    /// and are never urgent.
    pub(crate) fn execute_runnable(&self, runnable: PartitionRunnable<T>) {
        let pair = self.route(runnable.partition_id);
        pair.enqueue(Task::Runnable(runnable));
    }

    pub(crate) fn execute_packet(&self, packet: Packet<T>) -> Result<()> {
        if !packet.operation_header {
            return Err(SchedulerError::InvalidState(
                "packet is missing the operation header bit",
            ));
        }

        if packet.response_header {
            // Response packets bypass the operation queues entirely
            // (Invariant 4): they go straight to the response worker
            // regardless of partition id.
            let _ = self.response_tx.send(packet);
            return Ok(());
        }

        let pair = self.route(packet.partition_id);
        pair.enqueue(Task::Packet(OperationPacket {
            partition_id: packet.partition_id,
            urgent: packet.urgent,
            payload: packet.payload,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher_with(num_partition_workers: usize) -> Dispatcher<u32> {
        let partition_queues = Arc::new(
            (0..num_partition_workers)
                .map(|_| Arc::new(QueuePair::new()))
                .collect::<Vec<_>>(),
        );
        let generic_queue = Arc::new(QueuePair::new());
        let (response_tx, _response_rx) = crossbeam_channel::unbounded();
        Dispatcher {
            num_partition_workers,
            partition_queues,
            generic_queue,
            response_tx,
        }
    }

    #[test]
    fn negative_partition_id_routes_to_generic_queue() {
        let d = dispatcher_with(4);
        d.execute_operation(Operation {
            partition_id: -1,
            urgent: false,
            payload: 1,
        });
        assert_eq!(d.generic_queue.normal_len(), 1);
        assert_eq!(d.partition_queues[0].normal_len(), 0);
    }

    #[test]
    fn partition_id_routes_modulo_worker_count() {
        let d = dispatcher_with(4);
        d.execute_operation(Operation {
            partition_id: 9, // 9 % 4 == 1
            urgent: false,
            payload: 1,
        });
        assert_eq!(d.partition_queues[1].normal_len(), 1);
        assert_eq!(d.partition_queues[0].normal_len(), 0);
    }

    #[test]
    fn packet_without_operation_header_is_rejected() {
        let d = dispatcher_with(2);
        let err = d
            .execute_packet(Packet {
                partition_id: 0,
                urgent: false,
                operation_header: false,
                response_header: false,
                payload: 1,
            })
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidState(_)));
    }

    #[test]
    fn response_header_routes_to_response_worker_not_operation_queues() {
        let d = dispatcher_with(2);
        d.execute_packet(Packet {
            partition_id: 0,
            urgent: false,
            operation_header: true,
            response_header: true,
            payload: 1,
        })
        .unwrap();
        assert_eq!(d.partition_queues[0].normal_len(), 0);
        assert_eq!(d.generic_queue.normal_len(), 0);
    }
}
