//! Work queues (C1) and the priority/trigger wake protocol (C8, §4.5).
//!
//! Partition queues are single-consumer/multi-producer; the shared generic
//! queues are multi-consumer/multi-producer. `crossbeam-channel` gives us
//! both shapes for free with a single `unbounded()` channel type — cloning
//! the `Receiver` turns a channel that is SPMC by construction into a
//! genuine MPMC one, which is exactly what the generic pool needs (§9
//! Design Notes: "a lock-free multi-producer-multi-consumer FIFO with a
//! blocking variant").

use crate::task::Task;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How long a worker blocks on its normal queue before re-checking its
/// run-flag. Real wake-ups (a task, a priority trigger, or the shutdown
/// trigger sentinel) arrive well under this and are observed immediately;
/// this is only the worst-case bound on noticing a shutdown that, for
/// whatever reason, didn't get its own trigger delivered.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The normal + priority channel pair behind one destination (a partition
/// worker or the shared generic pool).
pub(crate) struct QueuePair<T> {
    pub(crate) normal_tx: Sender<Task<T>>,
    pub(crate) normal_rx: Receiver<Task<T>>,
    pub(crate) priority_tx: Sender<Task<T>>,
    pub(crate) priority_rx: Receiver<Task<T>>,
}

impl<T> QueuePair<T> {
    pub(crate) fn new() -> Self {
        let (normal_tx, normal_rx) = unbounded();
        let (priority_tx, priority_rx) = unbounded();
        Self {
            normal_tx,
            normal_rx,
            priority_tx,
            priority_rx,
        }
    }

    pub(crate) fn normal_len(&self) -> usize {
        self.normal_rx.len()
    }

    pub(crate) fn priority_len(&self) -> usize {
        self.priority_rx.len()
    }

    /// Enqueue rule from §4.1: normal tasks go straight to the normal
    /// queue; urgent tasks go to the priority queue *first*, then a
    /// trigger sentinel follows on the normal queue so a worker parked on
    /// it is guaranteed to wake and re-check the priority queue (§4.5).
    pub(crate) fn enqueue(&self, task: Task<T>) {
        if task.urgent() {
            let _ = self.priority_tx.send(task);
            let _ = self.normal_tx.send(Task::Trigger);
        } else {
            let _ = self.normal_tx.send(task);
        }
    }

    /// Pushes a bare trigger sentinel, used by shutdown to wake a worker
    /// parked on an empty normal queue (§4.7 step 2: "enqueue whatever
    /// wake-up the queue primitive requires").
    pub(crate) fn wake(&self) {
        let _ = self.normal_tx.send(Task::Trigger);
    }
}

/// The outcome of one dequeue attempt.
pub(crate) enum Dequeued<T> {
    /// A task (possibly a trigger sentinel — callers discard those and
    /// loop) was dequeued.
    Task(Task<T>),
    /// The run-flag was false and there was nothing left to process.
    Stopped,
}

/// The loop body of §4.2/§4.3 steps 1-2: priority checked first, every
/// call; blocks on the normal queue otherwise. `running` implements the
/// "signal to stop" half of §4.7 shutdown — once it is false, this stops
/// blocking and only drains what is already sitting in either queue.
pub(crate) fn dequeue<T>(pair: &QueuePair<T>, running: &AtomicBool) -> Dequeued<T> {
    loop {
        match pair.priority_rx.try_recv() {
            Ok(task) => return Dequeued::Task(task),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
        }

        if !running.load(Ordering::Acquire) {
            return match pair.normal_rx.try_recv() {
                Ok(task) => Dequeued::Task(task),
                Err(_) => Dequeued::Stopped,
            };
        }

        match pair.normal_rx.recv_timeout(SHUTDOWN_POLL_INTERVAL) {
            Ok(task) => return Dequeued::Task(task),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Dequeued::Stopped,
        }
    }
}
