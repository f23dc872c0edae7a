//! Counters exposed by §4.7. Read without locking — "readers accept slight
//! skew" is the spec's own words, so plain `Relaxed` loads are correct
//! here, not a shortcut.

use std::fmt::Write as _;

/// A point-in-time snapshot, built from the scheduler's live atomics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerMetrics {
    pub running_operation_count: usize,
    pub operation_executor_queue_size: usize,
    pub priority_operation_executor_queue_size: usize,
    pub response_queue_size: usize,
}

pub(crate) struct PartitionWorkerStats {
    pub(crate) worker_id: usize,
    pub(crate) processed_count: u64,
    pub(crate) pending_count: usize,
}

pub(crate) struct GenericWorkerStats {
    pub(crate) worker_id: usize,
    pub(crate) processed_count: u64,
}

/// Appends the lines `dumpPerformanceMetrics` describes in §4.7: one line
/// per partition worker, a single line for pending generic operations, one
/// line per generic worker, and one line for the response worker.
pub(crate) fn dump_performance_metrics(
    buf: &mut String,
    partition_stats: &[PartitionWorkerStats],
    pending_generic: usize,
    generic_stats: &[GenericWorkerStats],
    response_processed: u64,
    response_pending: usize,
) {
    for stat in partition_stats {
        let _ = writeln!(
            buf,
            "partition-operation-{}: processed={} pending={}",
            stat.worker_id, stat.processed_count, stat.pending_count
        );
    }
    let _ = writeln!(buf, "generic-operation: pending={pending_generic}");
    for stat in generic_stats {
        let _ = writeln!(
            buf,
            "generic-operation-{}: processed={}",
            stat.worker_id, stat.processed_count
        );
    }
    let _ = writeln!(
        buf,
        "response: processed={response_processed} pending={response_pending}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_contains_one_line_per_worker_plus_generic_and_response() {
        let mut buf = String::new();
        dump_performance_metrics(
            &mut buf,
            &[
                PartitionWorkerStats {
                    worker_id: 0,
                    processed_count: 10,
                    pending_count: 2,
                },
                PartitionWorkerStats {
                    worker_id: 1,
                    processed_count: 5,
                    pending_count: 0,
                },
            ],
            3,
            &[GenericWorkerStats {
                worker_id: 0,
                processed_count: 7,
            }],
            42,
            1,
        );
        assert_eq!(buf.lines().count(), 5);
        assert!(buf.contains("partition-operation-0: processed=10 pending=2"));
        assert!(buf.contains("generic-operation: pending=3"));
        assert!(buf.contains("response: processed=42 pending=1"));
    }
}
