pub mod buffers;
pub mod camera;
pub mod frame;
pub mod gpu;

pub use camera::{DragButton, OrbitCamera, ProjectionMode};
pub use frame::{RenderOptions, plan_frame};
pub use gpu::GpuState;
