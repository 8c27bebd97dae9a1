// One-time wait for late command registration
//
// Right after startup some sources may still be registering commands. The
// first query of a session gives them a short head start; every later query
// goes straight through, even if they are still not done.

use crate::core::registry::CommandRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Longest the first query waits for the registry
pub const REGISTRY_WAIT: Duration = Duration::from_millis(800);

/// How a pass through the gate went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Not the first query; no wait
    Skipped,
    /// Registry finished before the deadline
    Ready,
    /// Gave up waiting
    TimedOut,
}

pub struct ReadinessGate {
    armed: AtomicBool,
    timeout: Duration,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::with_timeout(REGISTRY_WAIT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            armed: AtomicBool::new(true),
            timeout,
        }
    }

    /// Wait for the registry if this is the first pass, racing it against
    /// the timeout
    ///
    /// The gate disarms on entry, so dropping this future half-way is safe
    /// and no later query waits again.
    pub async fn pass(&self, registry: &CommandRegistry) -> GateOutcome {
        if !self.armed.swap(false, Ordering::SeqCst) {
            return GateOutcome::Skipped;
        }

        if registry.is_ready() {
            return GateOutcome::Ready;
        }

        match tokio::time::timeout(self.timeout, registry.wait_ready()).await {
            Ok(()) => GateOutcome::Ready,
            Err(_) => {
                tracing::debug!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "command registry still loading, continuing without it"
                );
                GateOutcome::TimedOut
            }
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}
