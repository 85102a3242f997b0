pub mod registry;

pub use registry::{Surface, SurfaceId, SurfaceRegistry};
