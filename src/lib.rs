//! Position reconciliation for externally controlled media surfaces.
//!
//! The engine maintains one canonical playback position for media that is
//! actually played by a surface it does not own, resolving three racing
//! sources of truth: periodic position polling, user seeks that must win for
//! a grace period, and externally driven start-position resets.

pub mod config;
pub mod engine;
pub mod errors;
pub mod surface;
pub mod types;
pub mod utils;

pub use config::{EngineConfig, GuardConfig};
pub use engine::{EngineHandle, ReconciliationEngine, SeekOptions, ValueSubscriber};
pub use errors::PlayheadError;
pub use surface::{
    ElementEvent, MediaElement, RemoteEmbed, RemoteEvent, SurfaceAdapter, SurfaceEvent,
};
pub use types::{
    EngineState, MediaRef, PlaybackPosition, PositionSource, ReadyState, SeekIntent, SeekOrigin,
    SurfaceReadiness,
};
