use std::time::Duration;

use thiserror::Error;

/// Errors the engine and its surface adapters can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayheadError {
    #[error("Surface did not become ready within {0:?}")]
    SurfaceInitTimeout(Duration),

    #[error("Seek rejected by surface: {0}")]
    SeekRejected(String),

    #[error("Surface has been destroyed")]
    SurfaceDestroyed,

    #[error("Backend error: {0}")]
    Backend(String),
}
