//! Process-wide drain flag.
//!
//! `live → draining` is the only transition and it never reverses. The flag
//! is read by every drain-gated request, so it is a single atomic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct DrainState {
    draining: Arc<AtomicBool>,
}

impl DrainState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Start draining. Returns true only for the call that flipped the flag.
    pub fn begin_drain(&self) -> bool {
        let flipped = self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if flipped {
            tracing::info!("Draining: rejecting new gated requests");
        }
        flipped
    }
}
