//! Cooperative shutdown for background loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Cancellation token shared between a controller and its background loops.
///
/// Loops observe the token at the top of each iteration; there is no forced
/// preemption. Cloning shares the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    cancelled: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Creates a fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Waits up to `grace` for a thread to exit, then detaches it.
///
/// Joins the thread if it finishes within the grace period (reporting a
/// panic if one occurred); otherwise the handle is dropped and the thread
/// dies with the process.
pub fn join_with_grace(handle: JoinHandle<()>, grace: Duration, name: &str) {
    let deadline = Instant::now() + grace;
    let poll_interval = Duration::from_millis(10);

    while !handle.is_finished() {
        if Instant::now() >= deadline {
            tracing::warn!(thread = name, "shutdown grace period expired, detaching thread");
            return;
        }
        std::thread::sleep(poll_interval);
    }

    if let Err(panic_info) = handle.join() {
        let msg = panic_info
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("unknown panic");
        tracing::error!(thread = name, panic = msg, "background thread panicked");
    }
}
