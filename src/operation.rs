//! Top-level operation state machine.
//!
//! At most one top-level operation (site list, site details, alerts or an
//! export) runs at a time. [`OperationSupervisor::try_begin`] hands out an
//! [`OperationGuard`] that owns a fresh [`CancellationToken`]; dropping the
//! guard returns the supervisor to [`OperationState::Idle`] whether the
//! operation succeeded, failed or was cancelled.

use crate::cancellation::CancellationToken;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Kind of top-level operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Paged site listing
    SiteList,
    /// Overview, inventory and power flow for one site
    SiteDetails,
    /// Alert listing for a date range
    Alerts,
    /// Chunked data export
    Export,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::SiteList => "site list",
            OperationKind::SiteDetails => "site details",
            OperationKind::Alerts => "alerts",
            OperationKind::Export => "export",
        };
        write!(f, "{s}")
    }
}

/// Observable supervisor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    /// Ready to start an operation
    Idle,
    /// An operation of the given kind is running
    Running(OperationKind),
}

/// Operation lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// Another operation is still running
    #[error("cannot start {requested}: {running} operation already in progress")]
    Busy {
        /// Operation that was refused
        requested: OperationKind,
        /// Operation currently running
        running: OperationKind,
    },
}

#[derive(Debug)]
enum Slot {
    Idle,
    Running {
        kind: OperationKind,
        token: Arc<CancellationToken>,
    },
}

#[derive(Debug)]
struct Inner {
    slot: Mutex<Slot>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        // A panic while holding the lock cannot leave the slot half-written.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Owns the "which operation is running" state.
///
/// Cloning is cheap; clones share the same state, so a signal handler can hold
/// one while the command runner holds another.
#[derive(Debug, Clone)]
pub struct OperationSupervisor {
    inner: Arc<Inner>,
}

impl OperationSupervisor {
    /// Create an idle supervisor
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot::Idle),
            }),
        }
    }

    /// Current state
    pub fn state(&self) -> OperationState {
        match &*self.inner.lock() {
            Slot::Idle => OperationState::Idle,
            Slot::Running { kind, .. } => OperationState::Running(*kind),
        }
    }

    /// Start an operation of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Busy`] while another operation runs.
    pub fn try_begin(&self, kind: OperationKind) -> Result<OperationGuard, OperationError> {
        let mut slot = self.inner.lock();
        if let Slot::Running { kind: running, .. } = &*slot {
            return Err(OperationError::Busy {
                requested: kind,
                running: *running,
            });
        }

        let token = CancellationToken::shared();
        *slot = Slot::Running {
            kind,
            token: token.clone(),
        };
        debug!(operation = %kind, "operation started");

        Ok(OperationGuard {
            inner: self.inner.clone(),
            kind,
            token,
        })
    }

    /// Cancel the running operation, if any. Returns the cancelled kind.
    pub fn cancel_current(&self) -> Option<OperationKind> {
        match &*self.inner.lock() {
            Slot::Idle => None,
            Slot::Running { kind, token } => {
                if token.cancel() {
                    info!(operation = %kind, "cancellation requested");
                }
                Some(*kind)
            }
        }
    }
}

impl Default for OperationSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof that an operation is running; returns the supervisor to idle on drop.
#[derive(Debug)]
pub struct OperationGuard {
    inner: Arc<Inner>,
    kind: OperationKind,
    token: Arc<CancellationToken>,
}

impl OperationGuard {
    /// Kind of the running operation
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Cancellation token for this operation
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        let mut slot = self.inner.lock();
        // Only clear the slot if it still belongs to this guard.
        let owns_slot = matches!(&*slot, Slot::Running { token, .. } if Arc::ptr_eq(token, &self.token));
        if owns_slot {
            *slot = Slot::Idle;
            debug!(operation = %self.kind, "operation finished");
        }
    }
}
