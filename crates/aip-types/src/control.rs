use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag for long-running operations.
///
/// Clones share the same flag. Operations poll it between files and
/// chunks and stop before touching the object's inventory.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Receives progress updates as a percentage in `0.0..=100.0`.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, percent: f64);
}

/// Observer that discards every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_progress(&self, _percent: f64) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(f64) + Send + Sync,
{
    fn on_progress(&self, percent: f64) {
        self(percent)
    }
}
