use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use engine_logging::engine_info;
use tokio_util::sync::CancellationToken;

use crate::SimulatorHandle;

/// Single source of truth for whether the active operation was cancelled.
///
/// Owns the operation's cancellation token and its simulator, so one call
/// aborts the request and silences the simulator together.
#[derive(Debug, Default)]
pub struct CancellationController {
    token: CancellationToken,
    requested: AtomicBool,
    simulator: Mutex<Option<SimulatorHandle>>,
}

impl CancellationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token to hand to the submitter.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn attach_simulator(&self, handle: SimulatorHandle) {
        let previous = self
            .simulator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.stop();
        }
    }

    /// Stops the simulator, then aborts the request. Idempotent.
    ///
    /// Returns `true` only for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        self.stop_simulator();
        if self.requested.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        engine_info!("cancellation requested");
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cleanup for the success and error paths: stops the simulator once.
    pub fn finish(&self) {
        self.stop_simulator();
    }

    fn stop_simulator(&self) {
        let handle = self
            .simulator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.stop();
        }
    }
}
