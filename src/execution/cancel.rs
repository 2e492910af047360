//! Cooperative cancellation shared between the runner and whoever stops it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// A cheap, cloneable stop flag
///
/// The runner checks it before starting each command; it never interrupts a
/// command that is already running.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Set the flag when the process receives Ctrl-C
    pub fn cancel_on_ctrl_c(&self) {
        let flag = self.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if flag.is_cancelled() {
                    warn!("Already cancelling, waiting for the current command to exit");
                } else {
                    warn!("Interrupt received, stopping before the next command");
                    flag.cancel();
                }
            }
        });
    }
}
