use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative stop signal for a single worker run.
///
/// One clone stays with the pool, one moves into the worker body. Setting
/// the switch requests shutdown; the worker observes it on its next poll
/// tick and exits its loop. A switch is single-use: every worker start
/// creates a fresh one.
#[derive(Debug, Clone, Default)]
pub(crate) struct KillSwitch {
    set: Arc<AtomicBool>,
}

impl KillSwitch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Idempotent.
    pub(crate) fn set(&self) {
        self.set.store(true, Ordering::SeqCst);
    }

    /// True once shutdown has been requested.
    pub(crate) fn is_set(&self) -> bool {
        self.set.load(Ordering::SeqCst)
    }
}
