//! Thread-name prefixes (§6 ThreadGroup / naming). Real deployments usually
//! want worker threads named predictably for `top -H` / debuggers; this is
//! the minimal seam for that without depending on a concrete thread-group
//! implementation the way the source does.

/// Yields thread names for scheduler-owned threads. The default
/// implementation reproduces the `"...partition-operation"` /
/// `"...generic-operation"` suffix convention from §6 with a configurable
/// prefix (see [`crate::config::SchedulerConfig::thread_name_prefix`]).
pub trait NodeNaming: Send + Sync + 'static {
    fn partition_thread_name(&self, worker_id: usize) -> String;
    fn generic_thread_name(&self, worker_id: usize) -> String;
    fn response_thread_name(&self) -> String;
}

pub(crate) struct PrefixNaming {
    pub(crate) prefix: String,
}

impl NodeNaming for PrefixNaming {
    fn partition_thread_name(&self, worker_id: usize) -> String {
        format!("{}-partition-operation-{worker_id}", self.prefix)
    }

    fn generic_thread_name(&self, worker_id: usize) -> String {
        format!("{}-generic-operation-{worker_id}", self.prefix)
    }

    fn response_thread_name(&self) -> String {
        format!("{}-response", self.prefix)
    }
}
