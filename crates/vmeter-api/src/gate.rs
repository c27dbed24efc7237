//! Busy flag for loudness analysis.
//!
//! At most one analysis runs at a time. A second submission while one is
//! outstanding is refused rather than queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared busy flag.
#[derive(Debug, Clone, Default)]
pub struct AnalysisGate {
    busy: Arc<AtomicBool>,
}

/// Held while an analysis runs. Dropping it clears the busy flag.
#[derive(Debug)]
pub struct AnalysisPermit {
    busy: Arc<AtomicBool>,
}

impl AnalysisGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate, or `None` if an analysis is already running.
    pub fn try_acquire(&self) -> Option<AnalysisPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| AnalysisPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for AnalysisPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
