//! Cooperative cancellation primitives.
//!
//! Long-running work (chunk planning, retrieval attempts, backoff waits and the
//! per-chunk export loop) never gets interrupted from the outside. Instead it
//! calls [`CancellationCheck::check_cancelled`] at every boundary and bails out
//! with [`Cancelled`] once the owning operation has been cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Granularity at which waits poll for cancellation.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The running operation was cancelled by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Capability to ask whether the current operation should keep going.
///
/// This is the only thing the export engine knows about operation lifecycle;
/// deciding whether a new operation may start lives in
/// [`crate::operation::OperationSupervisor`].
pub trait CancellationCheck: Send + Sync {
    /// Fail with [`Cancelled`] if the operation has been cancelled.
    fn check_cancelled(&self) -> Result<(), Cancelled>;
}

/// Per-operation cancellation flag.
///
/// The flag starts *active*; [`CancellationToken::cancel`] clears it and the
/// next check anywhere in the engine fails.
#[derive(Debug)]
pub struct CancellationToken {
    active: AtomicBool,
}

impl CancellationToken {
    /// Create an active token.
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
        }
    }

    /// Create an active token wrapped in [`Arc`].
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Request cancellation. Returns `true` if this call flipped the flag.
    pub fn cancel(&self) -> bool {
        self.active.swap(false, Ordering::SeqCst)
    }

    /// Whether the operation may continue.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationCheck for CancellationToken {
    fn check_cancelled(&self) -> Result<(), Cancelled> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Cancelled)
        }
    }
}

impl<T: CancellationCheck + ?Sized> CancellationCheck for Arc<T> {
    fn check_cancelled(&self) -> Result<(), Cancelled> {
        (**self).check_cancelled()
    }
}

/// Check that never cancels, for callers without an owning operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancelled;

impl CancellationCheck for NeverCancelled {
    fn check_cancelled(&self) -> Result<(), Cancelled> {
        Ok(())
    }
}

/// Sleep for `duration`, checking for cancellation before the wait and after
/// every [`POLL_INTERVAL`] step.
pub async fn cancellable_sleep(
    duration: Duration,
    cancel: &dyn CancellationCheck,
) -> Result<(), Cancelled> {
    cancel.check_cancelled()?;

    let mut remaining = duration;
    while !remaining.is_zero() {
        let step = remaining.min(POLL_INTERVAL);
        tokio::time::sleep(step).await;
        remaining -= step;
        cancel.check_cancelled()?;
    }

    Ok(())
}

/// Resolve with [`Cancelled`] once `cancel` fires, polling every
/// [`POLL_INTERVAL`]. Never resolves for an operation that keeps running.
///
/// Meant to be raced against in-flight work with `tokio::select!`.
pub async fn cancelled(cancel: &dyn CancellationCheck) -> Cancelled {
    loop {
        if let Err(cancelled) = cancel.check_cancelled() {
            return cancelled;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
