//! Ordered set of independently configurable surfaces sharing one grid.
//!
//! The registry is the single owner of the grid configuration, the shared
//! index buffers and every surface's CPU-side vertex data. GPU state is
//! derived from it: mutations record what needs uploading in
//! [`PendingUploads`], which the renderer drains after each batch of edits.

use std::collections::BTreeMap;
use std::fmt;

use crate::math::EvalError;
use crate::math::mesh::{self, GridConfig, SurfaceMesh};

/// Stable handle of a surface, unique for the life of the registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u32);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct Surface {
    pub formula: String,
    pub visible: bool,
    pub color: [f32; 3],
    /// Interleaved position.xyz + color.rgb, sized for the current grid.
    pub vertices: Vec<f32>,
    /// Compile error of the current formula, if any.
    pub error: Option<EvalError>,
}

impl Surface {
    /// Whether the render pass should draw this surface.
    pub fn is_drawable(&self) -> bool {
        self.visible && !self.formula.trim().is_empty()
    }
}

/// Triangle and wireframe connectivity for the current subdivisions.
pub struct SharedIndexBuffer {
    subdivisions: u32,
    pub triangles: Vec<u32>,
    pub lines: Vec<u32>,
}

impl SharedIndexBuffer {
    fn new(grid: &GridConfig) -> Self {
        let triangles = mesh::generate_indices(grid);
        let lines = mesh::wireframe_indices(&triangles);
        Self {
            subdivisions: grid.subdivisions,
            triangles,
            lines,
        }
    }

    pub fn subdivisions(&self) -> u32 {
        self.subdivisions
    }
}

/// Work the GPU side must do to catch up with the registry.
#[derive(Debug, Default, PartialEq)]
pub struct PendingUploads {
    pub indices: bool,
    pub surfaces: Vec<SurfaceId>,
    pub released: Vec<SurfaceId>,
}

impl PendingUploads {
    pub fn is_empty(&self) -> bool {
        !self.indices && self.surfaces.is_empty() && self.released.is_empty()
    }
}

pub struct SurfaceRegistry {
    grid: GridConfig,
    indices: SharedIndexBuffer,
    surfaces: BTreeMap<SurfaceId, Surface>,
    next_id: u32,
    default_color: [f32; 3],

    indices_dirty: bool,
    dirty: Vec<SurfaceId>,
    released: Vec<SurfaceId>,
}

impl SurfaceRegistry {
    pub fn new(grid: GridConfig, default_color: [f32; 3]) -> Self {
        Self {
            grid,
            indices: SharedIndexBuffer::new(&grid),
            surfaces: BTreeMap::new(),
            next_id: 0,
            default_color,
            indices_dirty: true,
            dirty: Vec::new(),
            released: Vec::new(),
        }
    }

    pub fn grid(&self) -> GridConfig {
        self.grid
    }

    pub fn indices(&self) -> &SharedIndexBuffer {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn get(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    /// Surfaces in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (SurfaceId, &Surface)> {
        self.surfaces.iter().map(|(id, s)| (*id, s))
    }

    /// Registers a visible surface with an empty formula.
    pub fn add_surface(&mut self) -> SurfaceId {
        let id = SurfaceId(self.next_id);
        self.next_id += 1;

        let color = self.default_color;
        let surface_mesh = SurfaceMesh::generate("", color, &self.grid);
        self.surfaces.insert(
            id,
            Surface {
                formula: String::new(),
                visible: true,
                color,
                vertices: surface_mesh.vertices,
                error: None,
            },
        );
        self.mark_dirty(id);
        log::info!("added surface {id}");
        id
    }

    /// Removes a surface; its GPU buffer is released on the next sync.
    pub fn remove_surface(&mut self, id: SurfaceId) -> bool {
        if self.surfaces.remove(&id).is_none() {
            return false;
        }
        self.dirty.retain(|d| *d != id);
        self.released.push(id);
        log::info!("removed surface {id}");
        true
    }

    /// Replaces a surface's formula, recomputing only its positions.
    pub fn set_formula(&mut self, id: SurfaceId, formula: &str) -> bool {
        let grid = self.grid;
        let Some(surface) = self.surfaces.get_mut(&id) else {
            return false;
        };
        surface.formula = formula.to_owned();
        surface.error = mesh::write_positions(&mut surface.vertices, formula, &grid);
        if let Some(e) = &surface.error {
            log::warn!("surface {id}: formula {formula:?}: {e}");
        }
        self.mark_dirty(id);
        true
    }

    /// Replaces a surface's color, recomputing only its color channels.
    pub fn set_color(&mut self, id: SurfaceId, color: [f32; 3]) -> bool {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            return false;
        };
        let color = color.map(|c| c.clamp(0.0, 1.0));
        surface.color = color;
        mesh::write_colors(&mut surface.vertices, color);
        self.mark_dirty(id);
        true
    }

    /// Visibility is read at render time; nothing is recomputed.
    pub fn set_visible(&mut self, id: SurfaceId, visible: bool) -> bool {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            return false;
        };
        surface.visible = visible;
        true
    }

    /// Applies a new grid configuration. Invalid or unchanged input is a
    /// no-op and returns `false`.
    pub fn set_grid(&mut self, grid_extent: f32, subdivisions: u32) -> bool {
        let Some(grid) = GridConfig::new(grid_extent, subdivisions) else {
            log::debug!("rejected grid extent {grid_extent}, subdivisions {subdivisions}");
            return false;
        };
        if grid == self.grid {
            return false;
        }
        self.grid = grid;
        self.on_grid_config_changed();
        log::info!(
            "grid extent {}, {} subdivisions",
            grid.grid_extent,
            grid.subdivisions
        );
        true
    }

    /// Rebuilds the shared indices once, then every surface's vertices.
    pub fn on_grid_config_changed(&mut self) {
        let grid = self.grid;
        if self.indices.subdivisions() != grid.subdivisions {
            self.indices = SharedIndexBuffer::new(&grid);
            self.indices_dirty = true;
        }

        let ids: Vec<SurfaceId> = self.surfaces.keys().copied().collect();
        for id in ids {
            if let Some(surface) = self.surfaces.get_mut(&id) {
                let surface_mesh = SurfaceMesh::generate(&surface.formula, surface.color, &grid);
                surface.vertices = surface_mesh.vertices;
                if let Some(e) = &surface_mesh.error {
                    log::warn!("surface {id}: formula {:?}: {e}", surface.formula);
                }
                surface.error = surface_mesh.error;
            }
            self.mark_dirty(id);
        }
    }

    /// Hands over everything changed since the last call.
    pub fn take_pending(&mut self) -> PendingUploads {
        PendingUploads {
            indices: std::mem::take(&mut self.indices_dirty),
            surfaces: std::mem::take(&mut self.dirty),
            released: std::mem::take(&mut self.released),
        }
    }

    fn mark_dirty(&mut self, id: SurfaceId) {
        if !self.dirty.contains(&id) {
            self.dirty.push(id);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const RED: [f32; 3] = [1.0, 0.0, 0.0];

    fn registry(grid_extent: f32, subdivisions: u32) -> SurfaceRegistry {
        SurfaceRegistry::new(GridConfig::new(grid_extent, subdivisions).unwrap(), RED)
    }

    #[test]
    fn test_add_surface_defaults() {
        let mut reg = registry(10.0, 4);
        let id = reg.add_surface();
        let s = reg.get(id).unwrap();
        assert_eq!(s.formula, "");
        assert!(s.visible);
        assert_eq!(s.color, RED);
        assert_eq!(s.vertices.len(), 5 * 5 * 6);
        assert!(!s.is_drawable());
    }

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let mut reg = registry(10.0, 4);
        let a = reg.add_surface();
        let b = reg.add_surface();
        assert!(reg.remove_surface(a));
        let c = reg.add_surface();
        assert_ne!(a, c);
        assert_ne!(b, c);
        let order: Vec<_> = reg.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![b, c]);
    }

    #[test]
    fn test_initial_pending_uploads() {
        let mut reg = registry(10.0, 4);
        let a = reg.add_surface();
        let pending = reg.take_pending();
        assert!(pending.indices);
        assert_eq!(pending.surfaces, vec![a]);
        assert!(reg.take_pending().is_empty());
    }

    #[test]
    fn test_set_formula_touches_one_surface() {
        let mut reg = registry(10.0, 2);
        let a = reg.add_surface();
        let b = reg.add_surface();
        reg.take_pending();

        let other_before = reg.get(b).unwrap().vertices.clone();
        assert!(reg.set_formula(a, "x*y"));

        let pending = reg.take_pending();
        assert!(!pending.indices);
        assert_eq!(pending.surfaces, vec![a]);
        assert_eq!(reg.get(b).unwrap().vertices, other_before);

        let s = reg.get(a).unwrap();
        assert!(s.error.is_none());
        assert!(s.is_drawable());
        // corner (x=-5, y=-5)
        assert_eq!(s.vertices[1], 25.0);
    }

    #[test]
    fn test_set_formula_records_error() {
        let mut reg = registry(10.0, 2);
        let a = reg.add_surface();
        reg.set_formula(a, "q*2");
        let s = reg.get(a).unwrap();
        assert_eq!(s.error, Some(EvalError::InvalidVariable("q".to_owned())));
        assert!(s.vertices.chunks_exact(6).all(|v| v[1] == 0.0));

        reg.set_formula(a, "x");
        assert!(reg.get(a).unwrap().error.is_none());
    }

    #[test]
    fn test_set_color_keeps_positions() {
        let mut reg = registry(10.0, 2);
        let a = reg.add_surface();
        reg.set_formula(a, "x + y");
        reg.take_pending();
        let before = reg.get(a).unwrap().vertices.clone();

        assert!(reg.set_color(a, [0.1, 0.2, 1.5]));
        let s = reg.get(a).unwrap();
        assert_eq!(s.color, [0.1, 0.2, 1.0]);
        for (v, old) in s.vertices.chunks_exact(6).zip(before.chunks_exact(6)) {
            assert_eq!(v[..3], old[..3]);
            assert_eq!(v[3..], [0.1, 0.2, 1.0]);
        }
        assert_eq!(reg.take_pending().surfaces, vec![a]);
    }

    #[test]
    fn test_set_visible_needs_no_upload() {
        let mut reg = registry(10.0, 2);
        let a = reg.add_surface();
        reg.set_formula(a, "x");
        reg.take_pending();

        assert!(reg.set_visible(a, false));
        assert!(!reg.get(a).unwrap().is_drawable());
        assert!(reg.take_pending().is_empty());
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut reg = registry(10.0, 2);
        let a = reg.add_surface();
        reg.remove_surface(a);
        reg.take_pending();

        assert!(!reg.remove_surface(a));
        assert!(!reg.set_formula(a, "x"));
        assert!(!reg.set_color(a, RED));
        assert!(!reg.set_visible(a, false));
        assert!(reg.take_pending().is_empty());
    }

    #[test]
    fn test_remove_releases_buffer() {
        let mut reg = registry(10.0, 2);
        let a = reg.add_surface();
        let b = reg.add_surface();
        reg.set_formula(a, "x");

        assert!(reg.remove_surface(a));
        assert!(reg.get(a).is_none());
        assert_eq!(reg.len(), 1);

        let pending = reg.take_pending();
        assert_eq!(pending.released, vec![a]);
        assert_eq!(pending.surfaces, vec![b]);
        // Shared indices survive a single removal
        assert_eq!(reg.indices().triangles.len(), 2 * 2 * 6);
    }

    #[test]
    fn test_grid_change_resizes_everything() {
        let mut reg = registry(10.0, 10);
        let a = reg.add_surface();
        let b = reg.add_surface();
        reg.set_formula(a, "x*y");
        reg.take_pending();
        assert_eq!(reg.indices().triangles.len(), 600);

        assert!(reg.set_grid(10.0, 20));
        assert_eq!(reg.indices().triangles.len(), 2400);
        assert_eq!(reg.indices().lines.len(), 4800);
        assert_eq!(reg.indices().subdivisions(), 20);
        for (_, s) in reg.iter() {
            assert_eq!(s.vertices.len(), 21 * 21 * 6);
        }

        let pending = reg.take_pending();
        assert!(pending.indices);
        assert_eq!(pending.surfaces, vec![a, b]);
    }

    #[test]
    fn test_extent_change_keeps_indices() {
        let mut reg = registry(10.0, 2);
        let a = reg.add_surface();
        reg.set_formula(a, "x*y");
        reg.take_pending();

        assert!(reg.set_grid(20.0, 2));
        let pending = reg.take_pending();
        assert!(!pending.indices);
        assert_eq!(pending.surfaces, vec![a]);
        assert_eq!(reg.get(a).unwrap().vertices[1], 100.0);
    }

    #[test]
    fn test_invalid_grid_rejected() {
        let mut reg = registry(10.0, 4);
        reg.take_pending();
        assert!(!reg.set_grid(0.0, 4));
        assert!(!reg.set_grid(-3.0, 4));
        assert!(!reg.set_grid(10.0, 1));
        assert!(!reg.set_grid(10.0, 0));
        assert!(!reg.set_grid(10.0, 2500));
        assert!(!reg.set_grid(10.0, 65536));
        assert!(!reg.set_grid(10.0, 4));
        assert_eq!(reg.grid(), GridConfig::new(10.0, 4).unwrap());
        assert!(reg.take_pending().is_empty());
    }
}
