use glam::{Mat4, Vec2, Vec3};

use crate::config::CameraConfig;

const MIN_ORTHO_HALF_EXTENT: f32 = 0.1;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProjectionMode {
    Perspective,
    Orthographic,
}

impl ProjectionMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Perspective => "Perspective",
            Self::Orthographic => "Orthographic",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DragButton {
    /// Orbit around the origin.
    Left,
    /// Dolly (perspective) or zoom (orthographic).
    Right,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DragState {
    Idle,
    Orbiting { last: Vec2 },
    Zooming { last: Vec2 },
}

#[derive(Copy, Clone, Debug)]
pub struct CameraSettings {
    pub rotation_scale: f32,
    pub translation_scale: f32,
    /// Closest the perspective dolly may bring the camera to the origin.
    pub min_distance: f32,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            rotation_scale: 0.01,
            translation_scale: 0.04,
            min_distance: 2.0,
            fov_y: 45.0_f32.to_radians(),
            near: 0.1,
            far: 5000.0,
        }
    }
}

/// Orbit camera looking at the origin, driven by pointer drags.
///
/// Only the spherical coordinates are stored; the Cartesian position is
/// derived on demand.
pub struct OrbitCamera {
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
    pub ortho_half_extent: f32,
    pub projection: ProjectionMode,
    pub settings: CameraSettings,
    drag: DragState,
}

impl OrbitCamera {
    pub fn new(config: &CameraConfig, projection: ProjectionMode) -> Self {
        Self {
            radius: config.radius,
            theta: config.theta,
            phi: config.phi.clamp(-max_phi(), max_phi()),
            ortho_half_extent: config.ortho_half_extent.max(MIN_ORTHO_HALF_EXTENT),
            projection,
            settings: config.settings,
            drag: DragState::Idle,
        }
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(&CameraConfig::default(), ProjectionMode::Perspective)
    }
}

/// Largest |phi|, a hair inside 89° so the limit itself is never reached.
fn max_phi() -> f32 {
    89.0_f32.to_radians() - 1e-5
}

impl OrbitCamera {
    pub fn position(&self) -> Vec3 {
        Vec3::new(
            self.radius * self.phi.cos() * self.theta.cos(),
            self.radius * self.phi.sin(),
            self.radius * self.phi.cos() * self.theta.sin(),
        )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let s = &self.settings;
        match self.projection {
            ProjectionMode::Perspective => Mat4::perspective_rh(s.fov_y, aspect, s.near, s.far),
            ProjectionMode::Orthographic => {
                let h = self.ortho_half_extent;
                Mat4::orthographic_rh(-h * aspect, h * aspect, -h, h, s.near, s.far)
            }
        }
    }

    #[cfg(test)]
    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_captured(&self) -> bool {
        self.drag != DragState::Idle
    }

    /// Starts a drag if no other drag holds the pointer. Returns whether the
    /// pointer was captured.
    pub fn pointer_down(&mut self, button: DragButton, pos: Vec2) -> bool {
        if self.is_captured() {
            return false;
        }
        self.drag = match button {
            DragButton::Left => DragState::Orbiting { last: pos },
            DragButton::Right => DragState::Zooming { last: pos },
        };
        true
    }

    /// Ends the drag owned by `button`. Releasing the other button is ignored.
    pub fn pointer_up(&mut self, button: DragButton) -> bool {
        let owns = matches!(
            (self.drag, button),
            (DragState::Orbiting { .. }, DragButton::Left)
                | (DragState::Zooming { .. }, DragButton::Right)
        );
        if owns {
            self.drag = DragState::Idle;
        }
        owns
    }

    pub fn release(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Applies pointer motion to the active drag. Returns whether the camera
    /// changed.
    pub fn pointer_moved(&mut self, pos: Vec2) -> bool {
        match self.drag {
            DragState::Idle => false,
            DragState::Orbiting { last } => {
                self.drag = DragState::Orbiting { last: pos };
                self.orbit(pos - last);
                true
            }
            DragState::Zooming { last } => {
                self.drag = DragState::Zooming { last: pos };
                match self.projection {
                    ProjectionMode::Perspective => self.dolly(pos.y - last.y),
                    ProjectionMode::Orthographic => {
                        self.zoom_ortho(pos.y - last.y);
                        true
                    }
                }
            }
        }
    }

    fn orbit(&mut self, delta: Vec2) {
        let scale = self.settings.rotation_scale;
        self.theta += delta.x * scale;
        self.phi -= delta.y * scale;
        self.phi = self.phi.clamp(-max_phi(), max_phi());
    }

    /// Moves along the view direction; positive `dy` moves toward the origin.
    fn dolly(&mut self, dy: f32) -> bool {
        let step = dy * self.settings.translation_scale;
        let proposed = self.radius - step;
        if step > 0.0 && proposed < self.settings.min_distance {
            log::debug!("dolly refused at radius {:.2}", self.radius);
            return false;
        }
        let position = self.position();
        let toward_origin = -position.normalize_or_zero();
        self.radius = (position + toward_origin * step).length();
        true
    }

    fn zoom_ortho(&mut self, dy: f32) {
        self.ortho_half_extent -= dy * self.settings.translation_scale;
        self.ortho_half_extent = self.ortho_half_extent.max(MIN_ORTHO_HALF_EXTENT);
    }
}
