//! External collaborators (§6): the scheduler is oblivious to what a handler
//! actually does with a task, it only needs the shape below.

use crate::task::{Packet, Task, TaskDescriptor};
use std::sync::Arc;

/// Processes tasks handed to it by a worker. One instance per partition
/// (bound to that partition's state), one per generic worker, and exactly
/// one ad-hoc instance used by non-worker threads invoking inline.
pub trait OperationHandler<T>: Send + Sync + 'static {
    fn process(&self, task: Task<T>);

    /// The task this handler is presently processing, if any. Implementors
    /// that don't need this observability hook can rely on the default.
    fn current_task(&self) -> Option<TaskDescriptor> {
        None
    }
}

/// Handles response packets off the operation worker pool entirely.
pub trait ResponsePacketHandler<T>: Send + Sync + 'static {
    fn handle(&self, packet: Packet<T>);
}

/// Builds the handler tables during scheduler construction (§4.7 step 2).
/// All handlers are created before any worker starts and the tables are
/// never mutated afterwards (§9 Handler table immutability).
pub trait OperationHandlerFactory<T>: Send + Sync {
    fn create_partition_handler(
        &self,
        partition_id: crate::task::PartitionId,
    ) -> Arc<dyn OperationHandler<T>>;

    fn create_generic_handler(&self) -> Arc<dyn OperationHandler<T>>;

    fn create_ad_hoc_handler(&self) -> Arc<dyn OperationHandler<T>>;
}
