use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use super::local::LocalElementSurface;
use super::remote::RemoteSurface;
use super::traits::{ElementEvent, MediaElement, RemoteEmbed, RemoteEvent, SurfaceEvent};
use crate::errors::PlayheadError;
use crate::types::SurfaceReadiness;

/// Uniform wrapper over both surface backends.
///
/// One adapter instance drives one underlying surface and is exclusively
/// owned by one engine at a time.
pub enum SurfaceAdapter {
    Remote(RemoteSurface),
    Local(LocalElementSurface),
}

impl SurfaceAdapter {
    pub fn remote(
        control: Arc<dyn RemoteEmbed>,
        events: mpsc::UnboundedReceiver<RemoteEvent>,
        ready_timeout: Duration,
    ) -> Self {
        info!("creating remote embed surface adapter");
        SurfaceAdapter::Remote(RemoteSurface::new(control, events, ready_timeout))
    }

    pub fn local(
        element: Arc<dyn MediaElement>,
        events: mpsc::UnboundedReceiver<ElementEvent>,
        ready_timeout: Duration,
    ) -> Self {
        info!("creating local element surface adapter");
        SurfaceAdapter::Local(LocalElementSurface::new(element, events, ready_timeout))
    }

    /// Resolve when the surface signals readiness, with the duration when
    /// known; reject with `SurfaceInitTimeout` after the bounded wait.
    pub async fn initialize(&self) -> Result<Option<u64>, PlayheadError> {
        match self {
            SurfaceAdapter::Remote(s) => s.initialize().await,
            SurfaceAdapter::Local(s) => s.initialize().await,
        }
    }

    pub fn readiness(&self) -> SurfaceReadiness {
        match self {
            SurfaceAdapter::Remote(s) => s.readiness(),
            SurfaceAdapter::Local(s) => s.readiness(),
        }
    }

    /// Last known whole-second position, `None` while not ready.
    pub async fn position(&self) -> Option<u64> {
        match self {
            SurfaceAdapter::Remote(s) => s.position().await,
            SurfaceAdapter::Local(s) => s.position(),
        }
    }

    pub async fn duration(&self) -> Option<u64> {
        match self {
            SurfaceAdapter::Remote(s) => s.duration().await,
            SurfaceAdapter::Local(s) => s.duration(),
        }
    }

    /// Request a jump; resolves with the position the surface reports after
    /// applying it. Queued in call order when the surface is not ready yet.
    pub async fn seek_to(&self, seconds: u64, resume: bool) -> Result<u64, PlayheadError> {
        match self {
            SurfaceAdapter::Remote(s) => s.seek_to(seconds, resume).await,
            SurfaceAdapter::Local(s) => s.seek_to(seconds, resume).await,
        }
    }

    /// Fire-and-forget; silent no-op before readiness.
    pub async fn play(&self) {
        match self {
            SurfaceAdapter::Remote(s) => s.play().await,
            SurfaceAdapter::Local(s) => s.play(),
        }
    }

    /// Fire-and-forget; silent no-op before readiness.
    pub async fn pause(&self) {
        match self {
            SurfaceAdapter::Remote(s) => s.pause().await,
            SurfaceAdapter::Local(s) => s.pause(),
        }
    }

    /// Take the normalized event stream. Can only be done once.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<SurfaceEvent>> {
        match self {
            SurfaceAdapter::Remote(s) => s.take_events(),
            SurfaceAdapter::Local(s) => s.take_events(),
        }
    }

    pub fn destroy(&self) {
        match self {
            SurfaceAdapter::Remote(s) => s.destroy(),
            SurfaceAdapter::Local(s) => s.destroy(),
        }
    }
}
