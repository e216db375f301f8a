use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::traits::{ElementEvent, MediaElement, SurfaceEvent};
use crate::errors::PlayheadError;
use crate::types::{ReadyState, SurfaceReadiness};

struct PendingSeek {
    seconds: u64,
    resume: bool,
    respond_to: oneshot::Sender<Result<u64, PlayheadError>>,
}

/// Adapter over a locally addressable media element.
///
/// Property access is synchronous; readiness means the element has loaded
/// its metadata and reported a duration.
pub struct LocalElementSurface {
    element: Arc<dyn MediaElement>,
    readiness: RwLock<SurfaceReadiness>,
    raw_events: Mutex<Option<mpsc::UnboundedReceiver<ElementEvent>>>,
    events_tx: mpsc::UnboundedSender<SurfaceEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<SurfaceEvent>>>,
    pending_seeks: Mutex<VecDeque<PendingSeek>>,
    cancel: CancellationToken,
    ready_timeout: Duration,
}

impl LocalElementSurface {
    pub fn new(
        element: Arc<dyn MediaElement>,
        events: mpsc::UnboundedReceiver<ElementEvent>,
        ready_timeout: Duration,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            element,
            readiness: RwLock::new(SurfaceReadiness::new()),
            raw_events: Mutex::new(Some(events)),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            pending_seeks: Mutex::new(VecDeque::new()),
            cancel: CancellationToken::new(),
            ready_timeout,
        }
    }

    /// Wait for the element's metadata, bounded by the configured timeout.
    pub async fn initialize(&self) -> Result<Option<u64>, PlayheadError> {
        let mut raw = self
            .raw_events
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| PlayheadError::Backend("surface already initialized".into()))?;

        self.readiness.write().unwrap().state = ReadyState::Initializing;

        let wait_metadata = async {
            loop {
                match raw.recv().await {
                    Some(ElementEvent::LoadedMetadata { duration_seconds }) => {
                        break Some(duration_seconds);
                    }
                    Some(event) => {
                        trace!(?event, "element event before metadata ignored");
                    }
                    None => break None,
                }
            }
        };

        let duration = match timeout(self.ready_timeout, wait_metadata).await {
            Ok(Some(duration)) => Some(duration),
            Ok(None) => {
                return Err(PlayheadError::Backend(
                    "media element event channel closed".into(),
                ));
            }
            Err(_) => return Err(PlayheadError::SurfaceInitTimeout(self.ready_timeout)),
        };

        {
            let mut readiness = self.readiness.write().unwrap();
            readiness.state = ReadyState::Ready;
            readiness.duration_seconds = duration;
        }
        debug!(?duration, "local element surface ready");

        self.flush_pending();
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

    pub fn position(&self) -> Option<u64> {
        if !self.readiness().is_ready() {
            return None;
        }
        let t = self.element.current_time();
        if t.is_finite() && t >= 0.0 {
            Some(t.floor() as u64)
        } else {
            None
        }
    }

    pub fn duration(&self) -> Option<u64> {
        let readiness = self.readiness();
        if readiness.duration_seconds.is_some() {
            return readiness.duration_seconds;
        }
        if !readiness.is_ready() {
            return None;
        }
        let duration = self
            .element
            .duration()
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.floor() as u64);
        if duration.is_some() {
            self.readiness.write().unwrap().duration_seconds = duration;
        }
        duration
    }

    /// Request a jump. The element applies it synchronously and may clamp;
    /// the resolved value is what the element reports afterwards.
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
                trace!(seconds, "seek queued until element metadata loads");
                if self.readiness().is_ready() {
                    self.flush_pending();
                }
                return response.await.map_err(|_| PlayheadError::SurfaceDestroyed)?;
            }
        }
        Ok(self.apply_seek(seconds, resume))
    }

    pub fn play(&self) {
        if !self.readiness().is_ready() {
            trace!("play ignored, element not ready");
            return;
        }
        self.element.play();
    }

    pub fn pause(&self) {
        if !self.readiness().is_ready() {
            trace!("pause ignored, element not ready");
            return;
        }
        self.element.pause();
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
        debug!("local element surface destroyed");
    }

    fn apply_seek(&self, seconds: u64, resume: bool) -> u64 {
        self.element.set_current_time(seconds as f64);
        if !resume && !self.element.paused() {
            self.element.pause();
        }
        let actual = self.element.current_time();
        if actual.is_finite() && actual >= 0.0 {
            actual.floor() as u64
        } else {
            seconds
        }
    }

    fn flush_pending(&self) {
        loop {
            let next = self.pending_seeks.lock().unwrap().pop_front();
            let Some(pending) = next else { break };
            debug!(seconds = pending.seconds, "applying queued seek");
            let result = Ok(self.apply_seek(pending.seconds, pending.resume));
            let _ = pending.respond_to.send(result);
        }
    }

    fn spawn_pump(&self, mut raw: mpsc::UnboundedReceiver<ElementEvent>) {
        let events_tx = self.events_tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = raw.recv() => match event {
                        Some(ElementEvent::Play) => {
                            let _ = events_tx.send(SurfaceEvent::StateChanged { playing: true });
                        }
                        Some(ElementEvent::Pause) => {
                            let _ = events_tx.send(SurfaceEvent::StateChanged { playing: false });
                        }
                        Some(ElementEvent::LoadedMetadata { .. }) => {
                            debug!("duplicate metadata event ignored");
                        }
                        None => break,
                    },
                }
            }
            trace!("local element event pump stopped");
        });
    }
}
