use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Emits ticks at a fixed cadence while the surface is ready; the engine
/// samples the adapter on each tick.
///
/// Modeled as an explicit service with a `start`/`stop` lifecycle so tests
/// can drive the engine with synthetic ticks instead of real timers.
pub struct PositionPoller {
    cancel: Option<CancellationToken>,
}

impl PositionPoller {
    pub fn new() -> Self {
        Self { cancel: None }
    }

    /// Begin ticking. An already-running poller is stopped first.
    pub fn start(&mut self, interval: Duration, tick_tx: mpsc::UnboundedSender<()>) {
        self.stop();
        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        debug!(?interval, "position poller started");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; skip it so sampling
            // starts one full interval after readiness.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if tick_tx.send(()).is_err() {
                            break;
                        }
                    }
                }
            }
            trace!("position poller loop stopped");
        });
    }

    /// Idempotent; always safe to call, including before `start`.
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
            debug!("position poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Default for PositionPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PositionPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_before_start_is_safe() {
        let mut poller = PositionPoller::new();
        poller.stop();
        poller.stop();
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_flow_until_stopped() {
        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
        let mut poller = PositionPoller::new();
        poller.start(Duration::from_millis(500), tick_tx);
        assert!(poller.is_running());

        tokio::time::sleep(Duration::from_millis(1600)).await;
        let mut seen = 0;
        while tick_rx.try_recv().is_ok() {
            seen += 1;
        }
        assert_eq!(seen, 3);

        poller.stop();
        assert!(!poller.is_running());
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert!(tick_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_previous_cadence() {
        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
        let mut poller = PositionPoller::new();
        poller.start(Duration::from_millis(500), tick_tx.clone());
        poller.start(Duration::from_millis(100), tick_tx);

        tokio::time::sleep(Duration::from_millis(1050)).await;
        let mut seen = 0;
        while tick_rx.try_recv().is_ok() {
            seen += 1;
        }
        assert_eq!(seen, 10);
    }
}
