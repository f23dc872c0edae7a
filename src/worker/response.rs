//! Response worker loop (§4.4). A single consumer, kept off the operation
//! pool entirely so response-decoding latency can't queue up behind a
//! long-running operation (Invariant 4, response isolation).

use crate::handler::ResponsePacketHandler;
use crate::identity::{self, ThreadKind};
use crate::node_ext::NodeExtension;
use crate::task::Packet;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Same bound as `crate::queue`'s poll interval — this worker has no
/// priority queue to re-check, but it shares the same "don't block forever
/// past a shutdown signal" concern.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) struct ResponseWorkerContext<T> {
    pub(crate) scheduler_id: u64,
    pub(crate) queue_rx: Receiver<Packet<T>>,
    pub(crate) shutdown_flag: Arc<AtomicBool>,
    pub(crate) handler: Arc<dyn ResponsePacketHandler<T>>,
    pub(crate) processed_responses: Arc<AtomicU64>,
    pub(crate) faults: Arc<AtomicU64>,
    pub(crate) node_extension: Arc<dyn NodeExtension>,
}

pub(crate) fn run<T: Send + 'static>(ctx: ResponseWorkerContext<T>) {
    identity::set_current(ThreadKind::Response, ctx.scheduler_id);
    let span = tracing::info_span!("response_worker");
    let _guard = span.enter();
    tracing::info!("response worker started");

    loop {
        if !ctx.shutdown_flag.load(Ordering::Acquire) {
            match ctx.queue_rx.try_recv() {
                Ok(packet) => handle_one(&ctx, packet),
                Err(_) => break,
            }
            continue;
        }

        match ctx.queue_rx.recv_timeout(SHUTDOWN_POLL_INTERVAL) {
            Ok(packet) => handle_one(&ctx, packet),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    tracing::info!(
        processed = ctx.processed_responses.load(Ordering::Relaxed),
        "response worker stopped"
    );
}

fn handle_one<T: Send + 'static>(ctx: &ResponseWorkerContext<T>, packet: Packet<T>) {
    ctx.node_extension.before_run();
    if let Some(msg) = super::catch_panics(|| ctx.handler.handle(packet)) {
        ctx.faults.fetch_add(1, Ordering::Relaxed);
        tracing::error!(error = %msg, "response handler panicked; worker continues");
    }
    ctx.node_extension.after_run();
    ctx.processed_responses.fetch_add(1, Ordering::Relaxed);
}
