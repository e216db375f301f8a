pub mod controller;
pub mod poller;
pub mod reset;
pub mod seek_guard;

pub use controller::{
    EngineCommand, EngineHandle, ReconciliationEngine, SeekOptions, ValueSubscriber,
};
pub use poller::PositionPoller;
pub use reset::ExternalResetHandler;
pub use seek_guard::{SampleDecision, SeekGuard};
