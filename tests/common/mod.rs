//! Common utilities for synchronization integration tests.
//!
//! Provides a dummy-backed [`TestContext`] and a logger that captures records
//! per test thread, so tests can assert on warnings and teardown errors.

use std::cell::RefCell;
use std::sync::Once;

use log::Log;

use redlilium_gpu_sync::backend::DummyEvent;
use redlilium_gpu_sync::{
    DummyDevice, Extent3d, ImageAspect, ImageHandle, ImageLayout, SyncContext, TrackedImage,
};

// ============================================================================
// Log capture
// ============================================================================

/// A captured log record.
#[derive(Debug, Clone)]
pub struct CapturedLog {
    pub level: log::Level,
    pub message: String,
}

thread_local! {
    static CAPTURED: RefCell<Vec<CapturedLog>> = const { RefCell::new(Vec::new()) };
}

/// Logger that wraps `env_logger` and additionally captures every record
/// into a buffer local to the logging thread.
struct LogCapture {
    inner: env_logger::Logger,
}

impl Log for LogCapture {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            self.inner.log(record);
        }
        CAPTURED.with(|captured| {
            captured.borrow_mut().push(CapturedLog {
                level: record.level(),
                message: format!("{}", record.args()),
            });
        });
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the capturing logger once per test binary.
pub fn install_logger() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let inner = env_logger::Builder::from_default_env().is_test(true).build();
        if log::set_boxed_logger(Box::new(LogCapture { inner })).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }
    });
}

/// Drain the records captured on the current thread.
pub fn take_logs() -> Vec<CapturedLog> {
    CAPTURED.with(|captured| std::mem::take(&mut *captured.borrow_mut()))
}

/// Captured records at `level` on the current thread, without draining.
pub fn logs_at(level: log::Level) -> Vec<String> {
    CAPTURED.with(|captured| {
        captured
            .borrow()
            .iter()
            .filter(|entry| entry.level == level)
            .map(|entry| entry.message.clone())
            .collect()
    })
}

// ============================================================================
// Test context
// ============================================================================

/// Dummy device plus a synchronization context on its queue 0.
pub struct TestContext {
    pub device: DummyDevice,
    pub sync: SyncContext,
}

impl TestContext {
    pub fn new() -> Self {
        install_logger();
        take_logs();

        let device = DummyDevice::new();
        let sync = SyncContext::new(device.command_pool(), device.queue(0));
        Self { device, sync }
    }

    pub fn events(&self) -> Vec<DummyEvent> {
        self.device.events()
    }

    pub fn count(&self, predicate: impl Fn(&DummyEvent) -> bool) -> usize {
        self.device.events().iter().filter(|e| predicate(e)).count()
    }

    pub fn allocations(&self) -> usize {
        self.count(|e| matches!(e, DummyEvent::Allocated { .. }))
    }

    pub fn submissions(&self) -> usize {
        self.count(|e| matches!(e, DummyEvent::Submitted { .. }))
    }

    pub fn global_barriers(&self) -> usize {
        self.count(|e| matches!(e, DummyEvent::GlobalBarrier { .. }))
    }
}

/// A 2D color image in `layout`.
pub fn color_image(id: u64, layout: ImageLayout) -> TrackedImage {
    TrackedImage::new(
        ImageHandle::Dummy(id),
        ImageAspect::COLOR,
        Extent3d::new_2d(128, 128),
        layout,
    )
}
