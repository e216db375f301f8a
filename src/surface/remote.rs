use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::traits::{RemoteEmbed, RemoteEvent, SurfaceEvent};
use crate::errors::PlayheadError;
use crate::types::{ReadyState, SurfaceReadiness};

/// Delay between issuing a seek and reading back the position the remote
/// side actually settled on.
const SEEK_READBACK_DELAY: Duration = Duration::from_millis(200);

struct PendingSeek {
    seconds: u64,
    resume: bool,
    respond_to: oneshot::Sender<Result<u64, PlayheadError>>,
}

/// Adapter over a remotely embedded, asynchronously initialized player.
///
/// Control calls issued before the embed signals readiness are no-ops,
/// except seeks, which queue in call order and apply once ready.
pub struct RemoteSurface {
    control: Arc<dyn RemoteEmbed>,
    readiness: RwLock<SurfaceReadiness>,
    raw_events: Mutex<Option<mpsc::UnboundedReceiver<RemoteEvent>>>,
    events_tx: mpsc::UnboundedSender<SurfaceEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<SurfaceEvent>>>,
    pending_seeks: Mutex<VecDeque<PendingSeek>>,
    cancel: CancellationToken,
    ready_timeout: Duration,
}

impl RemoteSurface {
    pub fn new(
        control: Arc<dyn RemoteEmbed>,
        events: mpsc::UnboundedReceiver<RemoteEvent>,
        ready_timeout: Duration,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            control,
            readiness: RwLock::new(SurfaceReadiness::new()),
            raw_events: Mutex::new(Some(events)),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            pending_seeks: Mutex::new(VecDeque::new()),
            cancel: CancellationToken::new(),
            ready_timeout,
        }
    }

    /// Wait for the embed's readiness callback, bounded by the configured
    /// timeout. Resolves with the media duration when the embed reports one.
    pub async fn initialize(&self) -> Result<Option<u64>, PlayheadError> {
        let mut raw = self
            .raw_events
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| PlayheadError::Backend("surface already initialized".into()))?;

        self.readiness.write().unwrap().state = ReadyState::Initializing;

        let wait_ready = async {
            loop {
                match raw.recv().await {
                    Some(RemoteEvent::Ready { duration_seconds }) => {
                        break Some(duration_seconds);
                    }
                    Some(RemoteEvent::StateChange { playing }) => {
                        trace!(playing, "state change before readiness ignored");
                    }
                    Some(RemoteEvent::Error(reason)) => {
                        warn!(%reason, "remote embed error during initialization");
                        let _ = self.events_tx.send(SurfaceEvent::Errored(reason));
                    }
                    None => break None,
                }
            }
        };

        let ready_duration = match timeout(self.ready_timeout, wait_ready).await {
            Ok(Some(duration)) => duration,
            Ok(None) => {
                return Err(PlayheadError::Backend(
                    "remote embed event channel closed".into(),
                ));
            }
            Err(_) => return Err(PlayheadError::SurfaceInitTimeout(self.ready_timeout)),
        };

        // The ready callback may omit the duration; ask the control API.
        let duration = match ready_duration {
            Some(duration) => Some(duration),
            None => match self.control.duration().await {
                Ok(Some(d)) if d.is_finite() && d >= 0.0 => Some(d.floor() as u64),
                _ => None,
            },
        };

        {
            let mut readiness = self.readiness.write().unwrap();
            readiness.state = ReadyState::Ready;
            readiness.duration_seconds = duration;
        }
        debug!(?duration, "remote surface ready");

        self.flush_pending().await;
        self.spawn_pump(raw);
        Ok(duration)
    }

    pub fn readiness(&self) -> SurfaceReadiness {
        *self.readiness.read().unwrap()
    }

    /// Take the normalized event stream. Can only be done once.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<SurfaceEvent>> {
        self.events_rx.lock().unwrap().take()
    }

    pub async fn position(&self) -> Option<u64> {
        if !self.readiness().is_ready() {
            return None;
        }
        match self.control.current_time().await {
            Ok(Some(t)) if t.is_finite() && t >= 0.0 => Some(t.floor() as u64),
            Ok(_) => None,
            Err(e) => {
                trace!("position query failed: {e:#}");
                None
            }
        }
    }

    pub async fn duration(&self) -> Option<u64> {
        let readiness = self.readiness();
        if readiness.duration_seconds.is_some() {
            return readiness.duration_seconds;
        }
        if !readiness.is_ready() {
            return None;
        }
        let duration = match self.control.duration().await {
            Ok(Some(d)) if d.is_finite() && d >= 0.0 => Some(d.floor() as u64),
            _ => None,
        };
        if duration.is_some() {
            self.readiness.write().unwrap().duration_seconds = duration;
        }
        duration
    }

    /// Request a jump. Resolves with the position the embed reports after the
    /// jump; the remote side may clamp or round.
    pub async fn seek_to(&self, seconds: u64, resume: bool) -> Result<u64, PlayheadError> {
        match self.readiness().state {
            ReadyState::Destroyed => return Err(PlayheadError::SurfaceDestroyed),
            ReadyState::Ready => {}
            _ => {
                let (respond_to, response) = oneshot::channel();
                self.pending_seeks.lock().unwrap().push_back(PendingSeek {
                    seconds,
                    resume,
                    respond_to,
                });
                trace!(seconds, "seek queued until surface is ready");
                // Readiness may have flipped while we queued.
                if self.readiness().is_ready() {
                    self.flush_pending().await;
                }
                return response.await.map_err(|_| PlayheadError::SurfaceDestroyed)?;
            }
        }
        self.apply_seek(seconds, resume).await
    }

    pub async fn play(&self) {
        if !self.readiness().is_ready() {
            trace!("play ignored, surface not ready");
            return;
        }
        if let Err(e) = self.control.play().await {
            warn!("remote play failed: {e:#}");
        }
    }

    pub async fn pause(&self) {
        if !self.readiness().is_ready() {
            trace!("pause ignored, surface not ready");
            return;
        }
        if let Err(e) = self.control.pause().await {
            warn!("remote pause failed: {e:#}");
        }
    }

    /// Idempotent teardown: stops the event pump and fails queued seeks.
    pub fn destroy(&self) {
        {
            let mut readiness = self.readiness.write().unwrap();
            if readiness.state == ReadyState::Destroyed {
                return;
            }
            readiness.state = ReadyState::Destroyed;
        }
        self.cancel.cancel();
        let drained: Vec<PendingSeek> = self.pending_seeks.lock().unwrap().drain(..).collect();
        for pending in drained {
            let _ = pending.respond_to.send(Err(PlayheadError::SurfaceDestroyed));
        }
        debug!("remote surface destroyed");
    }

    async fn apply_seek(&self, seconds: u64, resume: bool) -> Result<u64, PlayheadError> {
        self.control
            .seek_to(seconds, true)
            .await
            .map_err(|e| PlayheadError::SeekRejected(e.to_string()))?;
        if !resume {
            if let Err(e) = self.control.pause().await {
                warn!("pause after seek failed: {e:#}");
            }
        }
        tokio::time::sleep(SEEK_READBACK_DELAY).await;
        let actual = match self.control.current_time().await {
            Ok(Some(t)) if t.is_finite() && t >= 0.0 => t.floor() as u64,
            _ => seconds,
        };
        Ok(actual)
    }

    async fn flush_pending(&self) {
        loop {
            let next = self.pending_seeks.lock().unwrap().pop_front();
            let Some(pending) = next else { break };
            debug!(seconds = pending.seconds, "applying queued seek");
            let result = self.apply_seek(pending.seconds, pending.resume).await;
            let _ = pending.respond_to.send(result);
        }
    }

    fn spawn_pump(&self, mut raw: mpsc::UnboundedReceiver<RemoteEvent>) {
        let events_tx = self.events_tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = raw.recv() => match event {
                        Some(RemoteEvent::StateChange { playing }) => {
                            let _ = events_tx.send(SurfaceEvent::StateChanged { playing });
                        }
                        Some(RemoteEvent::Error(reason)) => {
                            let _ = events_tx.send(SurfaceEvent::Errored(reason));
                        }
                        Some(RemoteEvent::Ready { .. }) => {
                            debug!("duplicate ready event ignored");
                        }
                        None => break,
                    },
                }
            }
            trace!("remote surface event pump stopped");
        });
    }
}
