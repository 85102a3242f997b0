use crate::math::GridConfig;
use crate::renderer::camera::{CameraSettings, ProjectionMode};

/// Initial orbit state plus the drag/projection tuning.
#[derive(Copy, Clone, Debug)]
pub struct CameraConfig {
    pub radius: f32,
    /// Azimuth, radians.
    pub theta: f32,
    /// Elevation, radians.
    pub phi: f32,
    pub ortho_half_extent: f32,
    pub settings: CameraSettings,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            radius: 30.0,
            theta: -90.0_f32.to_radians(),
            phi: 0.0,
            ortho_half_extent: 10.0,
            settings: CameraSettings::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StartupSurface {
    pub formula: &'static str,
    pub color: [f32; 3],
}

/// Everything the application needs at startup. Nothing is read from disk or
/// the environment; `RUST_LOG` is handled by the logger alone.
#[derive(Clone, Debug)]
pub struct PlotterConfig {
    pub window_title: &'static str,
    pub window_size: (u32, u32),
    pub grid: GridConfig,
    pub projection: ProjectionMode,
    pub show_axes: bool,
    pub show_mesh: bool,
    pub camera: CameraConfig,
    pub default_color: [f32; 3],
    pub startup_surfaces: Vec<StartupSurface>,
}

impl Default for PlotterConfig {
    fn default() -> Self {
        Self {
            window_title: "3D Function Plotter",
            window_size: (1280, 800),
            grid: GridConfig::default(),
            projection: ProjectionMode::Perspective,
            show_axes: true,
            show_mesh: true,
            camera: CameraConfig::default(),
            default_color: [1.0, 0.0, 0.0],
            startup_surfaces: vec![
                StartupSurface {
                    formula: "x * y",
                    color: [0.3, 0.4, 0.2],
                },
                StartupSurface {
                    formula: "x * x",
                    color: [0.6, 0.2, 0.2],
                },
            ],
        }
    }
}
