use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::renderer::camera::OrbitCamera;
use crate::scene::{SurfaceId, SurfaceRegistry};

/// Half-length of each coordinate axis.
pub const AXIS_LENGTH: f32 = 10.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    pub show_axes: bool,
    pub show_mesh: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_axes: true,
            show_mesh: true,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DrawCall {
    /// Filled triangles with per-vertex color.
    Surface(SurfaceId),
    /// Black line overlay over the same vertices.
    Wireframe(SurfaceId),
    /// Coordinate axes, drawn without depth testing.
    Axes,
}

#[derive(Debug, PartialEq)]
pub struct FramePlan {
    pub uniforms: FrameUniforms,
    pub draws: Vec<DrawCall>,
}

/// Decides what a frame draws and with which matrices. Reads the registry and
/// camera without touching either.
///
/// Order: every filled surface, then every wireframe if the mesh overlay is
/// on, then the axes so they land on top.
pub fn plan_frame(
    registry: &SurfaceRegistry,
    camera: &OrbitCamera,
    options: &RenderOptions,
    aspect: f32,
) -> FramePlan {
    let uniforms = FrameUniforms {
        model: Mat4::IDENTITY,
        view: camera.view_matrix(),
        projection: camera.projection_matrix(aspect),
    };

    let drawable: Vec<SurfaceId> = registry
        .iter()
        .filter(|(_, s)| s.is_drawable())
        .map(|(id, _)| id)
        .collect();

    let mut draws: Vec<DrawCall> = drawable.iter().map(|&id| DrawCall::Surface(id)).collect();
    if options.show_mesh {
        draws.extend(drawable.iter().map(|&id| DrawCall::Wireframe(id)));
    }
    if options.show_axes {
        draws.push(DrawCall::Axes);
    }

    FramePlan { uniforms, draws }
}

const BRIGHT: f32 = 1.0;
const DIM: f32 = 0.35;

/// Three segments through the origin as six interleaved vertices (position,
/// color). Color fades from dim at the negative end to bright at the positive
/// end: X red, Y blue, Z green.
#[rustfmt::skip]
pub const AXIS_VERTICES: [f32; 6 * 6] = [
    -AXIS_LENGTH, 0.0, 0.0,  DIM, 0.0, 0.0,
    AXIS_LENGTH,  0.0, 0.0,  BRIGHT, 0.0, 0.0,
    0.0, -AXIS_LENGTH, 0.0,  0.0, 0.0, DIM,
    0.0, AXIS_LENGTH,  0.0,  0.0, 0.0, BRIGHT,
    0.0, 0.0, -AXIS_LENGTH,  0.0, DIM, 0.0,
    0.0, 0.0, AXIS_LENGTH,   0.0, BRIGHT, 0.0,
];
