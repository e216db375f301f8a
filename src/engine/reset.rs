use std::time::Duration;
use tokio::time::Instant;

use tracing::debug;

/// Deduplicates externally driven start-position changes.
///
/// The surrounding application re-announces the intended start position more
/// often than it changes; applying every notification would cause seek
/// storms. A repeat of the same value inside the grace window is a no-op,
/// a different value always applies.
pub struct ExternalResetHandler {
    grace_window: Duration,
    last_applied: Option<(u64, Instant)>,
}

impl ExternalResetHandler {
    pub fn new(grace_window: Duration) -> Self {
        Self {
            grace_window,
            last_applied: None,
        }
    }

    /// Record the intended value and answer whether it must be applied.
    pub fn plan(&mut self, seconds: u64, now: Instant) -> bool {
        if let Some((value, at)) = self.last_applied {
            if value == seconds && now.duration_since(at) < self.grace_window {
                debug!(seconds, "duplicate external reset ignored");
                return false;
            }
        }
        self.last_applied = Some((seconds, now));
        true
    }

    pub fn clear(&mut self) {
        self.last_applied = None;
    }
}
