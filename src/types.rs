use tokio::time::Instant;

use crate::utils::extract_youtube_id;

/// Where a canonical position value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSource {
    Poll,
    UserSeek,
    ExternalReset,
}

/// Who asked for a seek. User scrubs and externally driven resets get
/// different grace windows and drift tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    User,
    External,
}

impl SeekOrigin {
    pub fn position_source(self) -> PositionSource {
        match self {
            SeekOrigin::User => PositionSource::UserSeek,
            SeekOrigin::External => PositionSource::ExternalReset,
        }
    }
}

/// The single value the rest of the application trusts as "where playback
/// currently is". Immutable; a new one replaces the previous atomically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackPosition {
    pub seconds: u64,
    pub source: PositionSource,
    pub observed_at: Instant,
}

impl PlaybackPosition {
    pub fn new(seconds: u64, source: PositionSource, observed_at: Instant) -> Self {
        Self {
            seconds,
            source,
            observed_at,
        }
    }

    pub fn initial() -> Self {
        Self::new(0, PositionSource::Poll, Instant::now())
    }
}

/// A request to jump to a target position, tracked until confirmed or
/// expired. Superseded, never merged: only the most recent token is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekIntent {
    pub target_seconds: u64,
    pub requested_at: Instant,
    pub token: u64,
    pub origin: SeekOrigin,
}

/// Readiness lifecycle of a media surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Uninitialized,
    Initializing,
    Ready,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceReadiness {
    pub state: ReadyState,
    /// Fixed for the lifetime of one loaded media item once known.
    pub duration_seconds: Option<u64>,
}

impl SurfaceReadiness {
    pub fn new() -> Self {
        Self {
            state: ReadyState::Uninitialized,
            duration_seconds: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == ReadyState::Ready
    }
}

impl Default for SurfaceReadiness {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of the reconciliation engine itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
    Destroyed,
}

/// Classification of a media reference into the backend that can play it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    /// A remotely embedded player addressed by video id.
    RemoteEmbed { video_id: String },
    /// A directly addressable media file.
    LocalFile { url: String },
}

impl MediaRef {
    pub fn parse(url: &str) -> Self {
        match extract_youtube_id(url) {
            Some(video_id) => MediaRef::RemoteEmbed { video_id },
            None => MediaRef::LocalFile {
                url: url.to_string(),
            },
        }
    }
}
