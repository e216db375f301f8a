pub mod adapter;
pub mod local;
pub mod remote;
pub mod traits;

pub use adapter::SurfaceAdapter;
pub use local::LocalElementSurface;
pub use remote::RemoteSurface;
pub use traits::{ElementEvent, MediaElement, RemoteEmbed, RemoteEvent, SurfaceEvent};
