mod common;

use griddle_scheduler::{Packet, ResponsePacketHandler, Scheduler, SchedulerConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// A `Write` sink that appends into a shared buffer instead of stdout, so a
/// test can assert on what a real subscriber captured.
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).expect("log output was not valid utf-8")
    }
}

impl std::io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLog {
    type Writer = CapturedLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

struct PanickingResponseHandler;

impl ResponsePacketHandler<u32> for PanickingResponseHandler {
    fn handle(&self, _packet: Packet<u32>) {
        panic!("boom");
    }
}

/// Installs an `EnvFilter`-driven subscriber writing into a captured buffer
/// (the "Test tooling" ambient-stack capability) and checks that a response
/// handler panic is both logged through it and counted in `fault_count`.
/// Global because the response worker runs on its own OS thread, which only
/// observes a process-wide default subscriber, not a thread-scoped one.
#[test]
fn response_handler_panic_is_logged_through_a_captured_subscriber() {
    let log = CapturedLog::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(log.clone())
        .with_env_filter(EnvFilter::new("error"))
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("tests/tracing_capture.rs must be the only test installing a global subscriber in this binary");

    let config = SchedulerConfig {
        partition_operation_thread_count: 1,
        generic_operation_thread_count: 1,
        partition_count: 2,
        thread_name_prefix: "tracing-capture-test".to_string(),
    };
    let scheduler: Scheduler<u32> = Scheduler::new(
        config,
        Arc::new(common::RecordingFactory {
            records: Arc::new(Mutex::new(Vec::new())),
            sleep_per_task: None,
        }),
        Arc::new(PanickingResponseHandler),
    );

    scheduler
        .execute_packet(Packet {
            partition_id: 0,
            urgent: false,
            operation_header: true,
            response_header: true,
            payload: 0,
        })
        .unwrap();

    let start = std::time::Instant::now();
    while scheduler.fault_count() == 0 {
        if start.elapsed() > Duration::from_secs(5) {
            panic!("timed out waiting for the panicking response handler to be caught");
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    scheduler.shutdown();

    assert_eq!(scheduler.fault_count(), 1);
    assert!(
        log.contents().contains("response handler panicked"),
        "captured log did not contain the expected panic event: {}",
        log.contents()
    );
}
