use anyhow::Result;
use async_trait::async_trait;

/// Callback events delivered by a remotely embedded player.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// The embed finished its asynchronous initialization.
    Ready { duration_seconds: Option<u64> },
    StateChange { playing: bool },
    Error(String),
}

/// Native events delivered by a locally addressable media element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementEvent {
    LoadedMetadata { duration_seconds: u64 },
    Play,
    Pause,
}

/// Normalized event stream both backends expose to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    StateChanged { playing: bool },
    Errored(String),
}

/// Control half of a remotely embedded, asynchronously initialized player.
///
/// Calls are non-blocking requests to the remote side; readiness, state
/// changes and errors come back through the [`RemoteEvent`] channel handed to
/// the adapter. Implementations may silently ignore control calls issued
/// before the embed is ready, the adapter never relies on them succeeding
/// early.
#[async_trait]
pub trait RemoteEmbed: Send + Sync {
    async fn play(&self) -> Result<()>;
    async fn pause(&self) -> Result<()>;
    /// `allow_seek_ahead` lets the remote player seek past its buffered
    /// range instead of snapping to the nearest loaded point.
    async fn seek_to(&self, seconds: u64, allow_seek_ahead: bool) -> Result<()>;
    /// Last position the remote side reports, in seconds. `None` until the
    /// embed can answer.
    async fn current_time(&self) -> Result<Option<f64>>;
    async fn duration(&self) -> Result<Option<f64>>;
}

/// A local media element with synchronous property access.
pub trait MediaElement: Send + Sync {
    fn current_time(&self) -> f64;
    /// The element may clamp or round; read `current_time` back afterwards.
    fn set_current_time(&self, seconds: f64);
    fn duration(&self) -> Option<f64>;
    fn play(&self);
    fn pause(&self);
    fn paused(&self) -> bool;
}
