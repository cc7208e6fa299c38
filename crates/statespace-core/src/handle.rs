//! Explicit exploration context passed to collaborators.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};

use crate::error::StepError;

/// Status shared between an engine and the collaborators it calls.
///
/// Collaborators receive `&ExplorationHandle` in every call and use it to
/// request cooperative cancellation. Observers on other threads read the
/// same flags through the engine.
#[derive(Debug, Default)]
pub struct ExplorationHandle {
    aborted: AtomicBool,
    done: AtomicBool,
}

impl ExplorationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the exploration stop. Idempotent.
    pub fn abort(&self) {
        if !self.aborted.swap(true, Ordering::SeqCst) {
            warn!("exploration abort requested");
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// `Err(StepError::Aborted)` once an abort was requested.
    pub fn check_aborted(&self) -> Result<(), StepError> {
        if self.is_aborted() {
            Err(StepError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Whether the exploration ran to completion.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Marks the exploration complete. Called by engines only, after the
    /// worklist drained without an abort.
    pub fn mark_done(&self) {
        debug!("exploration complete");
        self.done.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_is_sticky() {
        let handle = ExplorationHandle::new();
        assert!(handle.check_aborted().is_ok());
        handle.abort();
        handle.abort();
        assert!(handle.is_aborted());
        assert!(matches!(handle.check_aborted(), Err(StepError::Aborted)));
        assert!(!handle.is_done());
    }

    #[test]
    fn test_mark_done() {
        let handle = ExplorationHandle::new();
        handle.mark_done();
        assert!(handle.is_done());
    }
}
