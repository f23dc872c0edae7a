//! An operation scheduler for a distributed in-memory data grid node: routes
//! every inbound unit of work to the worker thread its partition is pinned
//! to, load-balances partition-independent work, and keeps response packets
//! off the operation pool entirely.
//!
//! The type parameter `T` carried by [`task::Task`], [`task::Operation`],
//! and friends is the opaque, handler-visible payload — this crate never
//! looks inside it.

mod config;
mod dispatcher;
mod error;
mod handler;
mod identity;
mod metrics;
mod naming;
mod node_ext;
mod queue;
mod scheduler;
mod task;
mod worker;

pub use config::SchedulerConfig;
pub use error::{Result, SchedulerError};
pub use handler::{OperationHandler, OperationHandlerFactory, ResponsePacketHandler};
pub use identity::register_io_thread;
pub use metrics::SchedulerMetrics;
pub use naming::NodeNaming;
pub use node_ext::NodeExtension;
pub use scheduler::Scheduler;
pub use task::{Operation, OperationPacket, Packet, PartitionId, PartitionRunnable, Task, TaskDescriptor, TaskKind};
