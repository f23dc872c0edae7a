//! The polymorphic task value (§3) and the wire packet envelope it is built
//! from. In the source this dispatches on runtime type; here it is a tagged
//! enum and the dispatcher branches on the tag (§9 Design Notes).

/// A partition id. Negative means "unsharded" (routes to the generic pool).
pub type PartitionId = i32;

/// A unit of work bound to a partition, with an urgency flag.
#[derive(Debug, Clone)]
pub struct Operation<T> {
    pub partition_id: PartitionId,
    pub urgent: bool,
    pub payload: T,
}

/// A partition-bound runnable. Per §9's resolved open question, runnables
/// must always declare a partition — there is no unsharded runnable — and
/// they are never urgent.
#[derive(Debug, Clone)]
pub struct PartitionRunnable<T> {
    pub partition_id: PartitionId,
    pub payload: T,
}

/// The wire envelope passed to [`crate::dispatcher::Dispatcher::execute_packet`].
/// `operation_header` must be set or dispatch fails with `InvalidState`;
/// `response_header` additionally set routes the packet to the response
/// worker instead of an operation queue.
#[derive(Debug, Clone)]
pub struct Packet<T> {
    pub partition_id: PartitionId,
    pub urgent: bool,
    pub operation_header: bool,
    pub response_header: bool,
    pub payload: T,
}

/// An operation packet once it has cleared header validation and is known
/// to be bound for an operation queue, not the response worker.
#[derive(Debug, Clone)]
pub struct OperationPacket<T> {
    pub partition_id: PartitionId,
    pub urgent: bool,
    pub payload: T,
}

/// The tagged task variant that flows through operation queues. `Trigger` is
/// the fifth, singleton case from §3/§4.5: it carries no payload and exists
/// purely to wake a worker blocked on its normal queue so it re-checks the
/// priority queue.
#[derive(Debug, Clone)]
pub enum Task<T> {
    Operation(Operation<T>),
    Runnable(PartitionRunnable<T>),
    Packet(OperationPacket<T>),
    Trigger,
}

impl<T> Task<T> {
    pub fn partition_id(&self) -> Option<PartitionId> {
        match self {
            Task::Operation(op) => Some(op.partition_id),
            Task::Runnable(r) => Some(r.partition_id),
            Task::Packet(p) => Some(p.partition_id),
            Task::Trigger => None,
        }
    }

    pub fn urgent(&self) -> bool {
        match self {
            Task::Operation(op) => op.urgent,
            Task::Runnable(_) => false,
            Task::Packet(p) => p.urgent,
            Task::Trigger => false,
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, Task::Trigger)
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Operation(_) => TaskKind::Operation,
            Task::Runnable(_) => TaskKind::Runnable,
            Task::Packet(_) => TaskKind::Packet,
            Task::Trigger => TaskKind::Trigger,
        }
    }

    /// A lightweight, `Clone`-free snapshot of this task, suitable for
    /// publishing into a handler's `current_task` slot (see
    /// [`crate::handler::OperationHandler::current_task`]).
    pub fn descriptor(&self) -> TaskDescriptor {
        TaskDescriptor {
            kind: self.kind(),
            partition_id: self.partition_id(),
            urgent: self.urgent(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Operation,
    Runnable,
    Packet,
    Trigger,
}

/// What [`crate::handler::OperationHandler::current_task`] returns while a
/// task is in flight. A cheap summary rather than the task itself, since the
/// task's payload type need not be `Clone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub kind: TaskKind,
    pub partition_id: Option<PartitionId>,
    pub urgent: bool,
}
