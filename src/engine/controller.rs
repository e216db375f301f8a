use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, trace, warn};

use super::poller::PositionPoller;
use super::reset::ExternalResetHandler;
use super::seek_guard::{SampleDecision, SeekGuard};
use crate::config::EngineConfig;
use crate::errors::PlayheadError;
use crate::surface::{SurfaceAdapter, SurfaceEvent};
use crate::types::{EngineState, PlaybackPosition, PositionSource, SeekOrigin};

/// Options for a seek request.
#[derive(Debug, Clone, Copy)]
pub struct SeekOptions {
    /// Resume playback after the jump; `false` holds the surface paused.
    pub resume: bool,
}

impl Default for SeekOptions {
    fn default() -> Self {
        Self { resume: true }
    }
}

/// Commands that can be sent to the reconciliation engine.
#[derive(Debug)]
pub enum EngineCommand {
    /// Jump to an absolute position.
    Seek { seconds: u64, options: SeekOptions },
    /// Jump relative to the surface's current position.
    SeekBy { delta_seconds: i64 },
    /// The externally supplied intended start position changed.
    SetIntendedStart { seconds: u64 },
    /// Tear the engine down.
    Destroy,
}

struct SeekOutcome {
    token: u64,
    origin: SeekOrigin,
    result: Result<u64, PlayheadError>,
}

/// Follows a watched value; unsubscribe by dropping.
pub struct ValueSubscriber<T: Clone> {
    receiver: watch::Receiver<T>,
}

impl<T: Clone> ValueSubscriber<T> {
    /// Wait for the next change. `None` once the engine is gone.
    pub async fn changed(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn current(&self) -> T {
        self.receiver.borrow().clone()
    }
}

/// Handle for communicating with a running engine. Cloneable; all clones
/// drive the same engine.
#[derive(Clone)]
pub struct EngineHandle {
    sender: mpsc::UnboundedSender<EngineCommand>,
    step_secs: i64,
    position_rx: watch::Receiver<PlaybackPosition>,
    state_rx: watch::Receiver<EngineState>,
    playing_rx: watch::Receiver<bool>,
    duration_rx: watch::Receiver<Option<u64>>,
    error_receiver: Arc<Mutex<Option<mpsc::UnboundedReceiver<PlayheadError>>>>,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("state", &*self.state_rx.borrow())
            .finish()
    }
}

impl EngineHandle {
    /// The canonical position.
    pub fn position(&self) -> PlaybackPosition {
        *self.position_rx.borrow()
    }

    pub fn state(&self) -> EngineState {
        self.state_rx.borrow().clone()
    }

    pub fn is_playing(&self) -> bool {
        *self.playing_rx.borrow()
    }

    pub fn duration(&self) -> Option<u64> {
        *self.duration_rx.borrow()
    }

    /// Fire-and-forget seek; effects appear through the subscription.
    /// Fails fast once the engine is destroyed.
    pub fn request_seek(
        &self,
        seconds: u64,
        options: SeekOptions,
    ) -> Result<(), PlayheadError> {
        self.sender
            .send(EngineCommand::Seek { seconds, options })
            .map_err(|_| PlayheadError::SurfaceDestroyed)
    }

    /// Skip forward (positive) or back (negative) relative to the surface's
    /// actual position, clamped to the media bounds.
    pub fn seek_by(&self, delta_seconds: i64) -> Result<(), PlayheadError> {
        self.sender
            .send(EngineCommand::SeekBy { delta_seconds })
            .map_err(|_| PlayheadError::SurfaceDestroyed)
    }

    /// Skip forward by the configured step size.
    pub fn step_forward(&self) -> Result<(), PlayheadError> {
        self.seek_by(self.step_secs)
    }

    /// Skip back by the configured step size.
    pub fn step_back(&self) -> Result<(), PlayheadError> {
        self.seek_by(-self.step_secs)
    }

    /// Invoked when the externally supplied start position changes.
    pub fn set_intended_start_position(&self, seconds: u64) -> Result<(), PlayheadError> {
        self.sender
            .send(EngineCommand::SetIntendedStart { seconds })
            .map_err(|_| PlayheadError::SurfaceDestroyed)
    }

    pub fn subscribe(&self) -> ValueSubscriber<PlaybackPosition> {
        ValueSubscriber {
            receiver: self.position_rx.clone(),
        }
    }

    pub fn state_subscriber(&self) -> ValueSubscriber<EngineState> {
        ValueSubscriber {
            receiver: self.state_rx.clone(),
        }
    }

    pub fn playing_subscriber(&self) -> ValueSubscriber<bool> {
        ValueSubscriber {
            receiver: self.playing_rx.clone(),
        }
    }

    /// Take the error receiver (can only be done once).
    pub fn take_error_receiver(&self) -> Option<mpsc::UnboundedReceiver<PlayheadError>> {
        self.error_receiver.lock().unwrap().take()
    }

    /// Tear the engine down. Idempotent; late surface events are ignored.
    pub fn destroy(&self) {
        let _ = self.sender.send(EngineCommand::Destroy);
    }
}

/// Owns the surface adapter and reconciles its reported position with seek
/// intents into one canonical playback position.
///
/// All state mutation happens inside the engine task, one message at a time;
/// ordering across seeks is enforced by the guard's monotonically increasing
/// intent token.
pub struct ReconciliationEngine {
    adapter: Arc<SurfaceAdapter>,
    config: EngineConfig,
    intended_start: Option<u64>,
    receiver: mpsc::UnboundedReceiver<EngineCommand>,
    guard: SeekGuard,
    reset: ExternalResetHandler,
    poller: PositionPoller,
    tick_tx: mpsc::UnboundedSender<()>,
    tick_rx: mpsc::UnboundedReceiver<()>,
    events_rx: mpsc::UnboundedReceiver<SurfaceEvent>,
    events_open: bool,
    seek_results_tx: mpsc::UnboundedSender<SeekOutcome>,
    seek_results_rx: mpsc::UnboundedReceiver<SeekOutcome>,
    position_tx: watch::Sender<PlaybackPosition>,
    state_tx: watch::Sender<EngineState>,
    playing_tx: watch::Sender<bool>,
    duration_tx: watch::Sender<Option<u64>>,
    error_tx: mpsc::UnboundedSender<PlayheadError>,
}

impl ReconciliationEngine {
    /// Create an engine around an adapter it will exclusively own.
    /// `intended_start` is applied once, on readiness, as an external reset.
    pub fn new(
        adapter: SurfaceAdapter,
        config: EngineConfig,
        intended_start: Option<u64>,
    ) -> (EngineHandle, ReconciliationEngine) {
        let events_rx = adapter.take_events().unwrap_or_else(|| {
            let (_tx, rx) = mpsc::unbounded_channel();
            rx
        });

        let (sender, receiver) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let (seek_results_tx, seek_results_rx) = mpsc::unbounded_channel();
        let (position_tx, position_rx) = watch::channel(PlaybackPosition::initial());
        let (state_tx, state_rx) = watch::channel(EngineState::Uninitialized);
        let (playing_tx, playing_rx) = watch::channel(false);
        let (duration_tx, duration_rx) = watch::channel(None);

        let step_secs = i64::try_from(config.step_seek_secs).unwrap_or(i64::MAX);
        let guard = SeekGuard::new(config.guard.clone());
        let reset =
            ExternalResetHandler::new(config.guard.grace_window(SeekOrigin::External));

        let engine = ReconciliationEngine {
            adapter: Arc::new(adapter),
            config,
            intended_start,
            receiver,
            guard,
            reset,
            poller: PositionPoller::new(),
            tick_tx,
            tick_rx,
            events_rx,
            events_open: true,
            seek_results_tx,
            seek_results_rx,
            position_tx,
            state_tx,
            playing_tx,
            duration_tx,
            error_tx,
        };
        let handle = EngineHandle {
            sender,
            step_secs,
            position_rx,
            state_rx,
            playing_rx,
            duration_rx,
            error_receiver: Arc::new(Mutex::new(Some(error_rx))),
        };

        (handle, engine)
    }

    /// Convenience: create and run the engine on the current runtime.
    pub fn spawn(
        adapter: SurfaceAdapter,
        config: EngineConfig,
        intended_start: Option<u64>,
    ) -> EngineHandle {
        let (handle, engine) = Self::new(adapter, config, intended_start);
        tokio::spawn(engine.run());
        handle
    }

    /// Run the engine event loop until destroyed.
    pub async fn run(mut self) {
        debug!("reconciliation engine loop started");
        let _ = self.state_tx.send(EngineState::Initializing);

        // The readiness wait must not make teardown unreachable: race it
        // against the command channel, honoring Destroy immediately and
        // buffering everything else for replay once ready.
        let adapter = Arc::clone(&self.adapter);
        let init = adapter.initialize();
        tokio::pin!(init);
        let mut buffered = Vec::new();
        let init_result = loop {
            tokio::select! {
                result = &mut init => break result,
                command = self.receiver.recv() => match command {
                    Some(EngineCommand::Destroy) | None => {
                        debug!("destroyed during initialization");
                        self.teardown();
                        return;
                    }
                    Some(command) => buffered.push(command),
                },
            }
        };

        match init_result {
            Ok(duration) => {
                let _ = self.duration_tx.send(duration);
            }
            Err(e) => {
                error!("surface initialization failed: {e}");
                let _ = self.state_tx.send(EngineState::Failed(e.to_string()));
                let _ = self.error_tx.send(e);
                self.adapter.destroy();
                return;
            }
        }

        // Hold the surface paused on readiness so it cannot silently
        // autoplay; the initial intended position applies as a one-shot
        // external reset.
        self.adapter.pause().await;
        if let Some(seconds) = self.intended_start.take() {
            let now = Instant::now();
            self.reset.plan(seconds, now);
            self.start_seek(seconds, SeekOrigin::External, false, now);
        }

        let _ = self.state_tx.send(EngineState::Ready);
        self.poller
            .start(self.config.poll_interval(), self.tick_tx.clone());

        for command in buffered {
            if !self.handle_command(command).await {
                self.teardown();
                return;
            }
        }

        loop {
            tokio::select! {
                command = self.receiver.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle_command(command).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                Some(()) = self.tick_rx.recv() => {
                    self.handle_tick().await;
                }
                event = self.events_rx.recv(), if self.events_open => {
                    match event {
                        Some(event) => self.handle_surface_event(event),
                        None => self.events_open = false,
                    }
                }
                Some(outcome) = self.seek_results_rx.recv() => {
                    self.handle_seek_outcome(outcome);
                }
            }
        }

        self.teardown();
    }

    /// Returns `false` when the engine must shut down.
    async fn handle_command(&mut self, command: EngineCommand) -> bool {
        match command {
            EngineCommand::Seek { seconds, options } => {
                trace!(seconds, "seek requested");
                self.start_seek(seconds, SeekOrigin::User, options.resume, Instant::now());
                true
            }
            EngineCommand::SeekBy { delta_seconds } => {
                self.handle_seek_by(delta_seconds).await;
                true
            }
            EngineCommand::SetIntendedStart { seconds } => {
                let now = Instant::now();
                if self.reset.plan(seconds, now) {
                    self.start_seek(seconds, SeekOrigin::External, false, now);
                }
                true
            }
            EngineCommand::Destroy => false,
        }
    }

    /// Register the intent, publish the target optimistically, and hand the
    /// actual surface call to a task so the loop never blocks on it.
    fn start_seek(&mut self, seconds: u64, origin: SeekOrigin, resume: bool, now: Instant) {
        let token = self.guard.register_intent(seconds, origin, now);
        // Seek confirmation latency must not be visible as lag.
        self.publish_position(seconds, origin.position_source(), now);

        let adapter = Arc::clone(&self.adapter);
        let results = self.seek_results_tx.clone();
        tokio::spawn(async move {
            let result = adapter.seek_to(seconds, resume).await;
            let _ = results.send(SeekOutcome {
                token,
                origin,
                result,
            });
        });
    }

    async fn handle_seek_by(&mut self, delta_seconds: i64) {
        // Prefer the surface's actual position over the canonical one; the
        // canonical value may still be an unconfirmed seek target.
        let base = match self.adapter.position().await {
            Some(seconds) => seconds,
            None => self.position_tx.borrow().seconds,
        };
        let mut target = base.saturating_add_signed(delta_seconds);
        if let Some(duration) = *self.duration_tx.borrow() {
            target = target.min(duration);
        }
        self.start_seek(target, SeekOrigin::User, false, Instant::now());
    }

    async fn handle_tick(&mut self) {
        let Some(sample) = self.adapter.position().await else {
            // Not a sample of zero.
            trace!("poll tick skipped, surface reported no position");
            return;
        };
        let now = Instant::now();
        self.guard.expire(now);
        match self.guard.observe_sample(sample, now) {
            SampleDecision::Accept => {
                self.publish_position(sample, PositionSource::Poll, now);
            }
            SampleDecision::Reject => {
                trace!(sample, "sample suppressed by seek guard");
            }
        }
    }

    fn handle_seek_outcome(&mut self, outcome: SeekOutcome) {
        let now = Instant::now();
        self.guard.expire(now);
        if self.guard.active_token() != Some(outcome.token) {
            trace!(token = outcome.token, "stale seek confirmation discarded");
            return;
        }
        match outcome.result {
            Ok(actual) => {
                let target = self
                    .guard
                    .active_intent()
                    .map(|intent| intent.target_seconds)
                    .unwrap_or(actual);
                let tolerance = self.config.guard.drift_tolerance(outcome.origin);
                if actual.abs_diff(target) <= tolerance {
                    // The surface may have clamped or rounded; re-anchor the
                    // guard on what it actually reports.
                    self.guard.refresh(outcome.token, actual, now);
                    self.publish_position(actual, outcome.origin.position_source(), now);
                } else {
                    warn!(
                        actual,
                        target,
                        "seek confirmation deviates from target, keeping optimistic position"
                    );
                }
            }
            Err(e) => {
                // Favor responsiveness: keep the optimistic position, retire
                // the intent, and let the collaborator re-request.
                warn!("seek rejected by surface: {e}");
                self.guard.clear();
                let _ = self.error_tx.send(e);
            }
        }
    }

    fn handle_surface_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::StateChanged { playing } => {
                self.playing_tx.send_if_modified(|current| {
                    if *current != playing {
                        *current = playing;
                        true
                    } else {
                        false
                    }
                });
            }
            SurfaceEvent::Errored(reason) => {
                warn!(%reason, "surface reported an error");
                let _ = self.error_tx.send(PlayheadError::Backend(reason));
            }
        }
    }

    fn publish_position(&self, seconds: u64, source: PositionSource, now: Instant) {
        self.position_tx.send_if_modified(|current| {
            if current.seconds == seconds && current.source == source {
                return false;
            }
            *current = PlaybackPosition::new(seconds, source, now);
            true
        });
    }

    fn teardown(&mut self) {
        self.poller.stop();
        self.guard.clear();
        self.reset.clear();
        self.adapter.destroy();
        let _ = self.state_tx.send(EngineState::Destroyed);
        debug!("reconciliation engine loop terminated");
    }
}
