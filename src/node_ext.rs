//! Host hook (§6 NodeExtension): invoked around each task a worker
//! processes so the embedder can install/tear down thread-local state
//! (e.g. a security context) without the scheduler knowing anything about
//! what that state is.

/// No-op by default — most embedders never need this.
pub trait NodeExtension: Send + Sync + 'static {
    fn before_run(&self) {}
    fn after_run(&self) {}
}

pub(crate) struct NoopExtension;

impl NodeExtension for NoopExtension {}
