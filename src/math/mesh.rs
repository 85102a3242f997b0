use crate::math::expr::{EvalError, Program};

/// Floats per interleaved vertex: position.xyz then color.rgb.
pub const FLOATS_PER_VERTEX: usize = 6;

/// Upper bound on subdivisions. At this size the wireframe index buffer
/// (48 bytes per cell) stays under wgpu's default 256 MiB `max_buffer_size`,
/// and every vertex index fits in a `u32`.
pub const MAX_SUBDIVISIONS: u32 = 2048;

/// Sampling domain shared by every surface.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridConfig {
    pub grid_extent: f32,
    pub subdivisions: u32,
}

impl GridConfig {
    /// Returns `None` for a non-positive extent, fewer than two subdivisions
    /// or more than [`MAX_SUBDIVISIONS`], mirroring what the UI accepts.
    pub fn new(grid_extent: f32, subdivisions: u32) -> Option<Self> {
        if !(grid_extent > 0.0) || subdivisions <= 1 || subdivisions > MAX_SUBDIVISIONS {
            return None;
        }
        Some(Self {
            grid_extent,
            subdivisions,
        })
    }

    pub fn vertices_per_axis(&self) -> usize {
        self.subdivisions as usize + 1
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices_per_axis() * self.vertices_per_axis()
    }

    pub fn float_count(&self) -> usize {
        self.vertex_count() * FLOATS_PER_VERTEX
    }

    pub fn index_count(&self) -> usize {
        let n = self.subdivisions as usize;
        n * n * 6
    }

    /// World-space coordinate of grid line `i` along either axis.
    pub fn coord(&self, i: usize) -> f32 {
        let start = -self.grid_extent / 2.0;
        let step = self.grid_extent / self.subdivisions as f32;
        start + i as f32 * step
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grid_extent: 20.0,
            subdivisions: 20,
        }
    }
}

/// Triangle list covering the grid, two triangles per cell.
///
/// Depends only on `subdivisions`; every surface shares the result.
pub fn generate_indices(grid: &GridConfig) -> Vec<u32> {
    let n = grid.subdivisions as usize;
    let per_axis = grid.vertices_per_axis();
    let mut indices = Vec::with_capacity(grid.index_count());

    for i in 0..n {
        let row1 = (i * per_axis) as u32;
        let row2 = ((i + 1) * per_axis) as u32;
        for j in 0..n as u32 {
            indices.extend_from_slice(&[row1 + j, row2 + j, row1 + j + 1]);
            indices.extend_from_slice(&[row1 + j + 1, row2 + j, row2 + j + 1]);
        }
    }

    indices
}

/// Line list tracing the three edges of every triangle, for the wireframe
/// overlay.
pub fn wireframe_indices(triangles: &[u32]) -> Vec<u32> {
    let mut lines = Vec::with_capacity(triangles.len() * 2);
    for tri in triangles.chunks_exact(3) {
        lines.extend_from_slice(&[tri[0], tri[1], tri[1], tri[2], tri[2], tri[0]]);
    }
    lines
}

/// Writes vertex positions for `formula` into an interleaved buffer.
///
/// Heights go on the second component (Y-up). An empty formula yields a flat
/// grid without evaluating anything; a malformed one yields a flat grid and
/// the compile error.
pub fn write_positions(
    vertices: &mut [f32],
    formula: &str,
    grid: &GridConfig,
) -> Option<EvalError> {
    let (program, error) = if formula.trim().is_empty() {
        (None, None)
    } else {
        match Program::compile(formula) {
            Ok(p) => (Some(p), None),
            Err(e) => (None, Some(e)),
        }
    };

    let per_axis = grid.vertices_per_axis();
    for i in 0..per_axis {
        let x = grid.coord(i);
        for j in 0..per_axis {
            let y = grid.coord(j);
            let z = program
                .as_ref()
                .map_or(0.0, |p| p.eval(x as f64, y as f64) as f32);

            let base = (i * per_axis + j) * FLOATS_PER_VERTEX;
            vertices[base] = x;
            vertices[base + 1] = z;
            vertices[base + 2] = y;
        }
    }

    error
}

/// Fills the color slot of every interleaved vertex.
pub fn write_colors(vertices: &mut [f32], color: [f32; 3]) {
    for vertex in vertices.chunks_exact_mut(FLOATS_PER_VERTEX) {
        vertex[3..].copy_from_slice(&color);
    }
}

/// Interleaved vertex data for one surface, plus any formula error.
pub struct SurfaceMesh {
    pub vertices: Vec<f32>,
    pub error: Option<EvalError>,
}

impl SurfaceMesh {
    pub fn generate(formula: &str, color: [f32; 3], grid: &GridConfig) -> Self {
        let mut vertices = vec![0.0; grid.float_count()];
        let error = write_positions(&mut vertices, formula, grid);
        write_colors(&mut vertices, color);
        Self { vertices, error }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn height_at(mesh: &SurfaceMesh, grid: &GridConfig, i: usize, j: usize) -> [f32; 3] {
        let base = (i * grid.vertices_per_axis() + j) * FLOATS_PER_VERTEX;
        [
            mesh.vertices[base],
            mesh.vertices[base + 1],
            mesh.vertices[base + 2],
        ]
    }

    #[test]
    fn test_grid_config_validation() {
        assert!(GridConfig::new(10.0, 2).is_some());
        assert!(GridConfig::new(0.0, 10).is_none());
        assert!(GridConfig::new(-1.0, 10).is_none());
        assert!(GridConfig::new(f32::NAN, 10).is_none());
        assert!(GridConfig::new(10.0, 1).is_none());
        assert!(GridConfig::new(10.0, 0).is_none());
    }

    fn grid(subdivisions: u32) -> GridConfig {
        GridConfig {
            grid_extent: 10.0,
            subdivisions,
        }
    }

    #[test]
    fn test_subdivision_limit() {
        assert!(GridConfig::new(20.0, MAX_SUBDIVISIONS).is_some());
        assert!(GridConfig::new(20.0, MAX_SUBDIVISIONS + 1).is_none());
        assert!(GridConfig::new(20.0, 2500).is_none());
        assert!(GridConfig::new(20.0, 65536).is_none());
        assert!(GridConfig::new(20.0, u32::MAX).is_none());
    }

    #[test]
    fn test_largest_grid_fits_gpu_limits() {
        let grid = GridConfig::new(20.0, MAX_SUBDIVISIONS).unwrap();
        let max_buffer_size = wgpu::Limits::default().max_buffer_size;

        // Wireframe lines hold two indices per triangle index
        let line_bytes = (grid.index_count() * 2 * std::mem::size_of::<u32>()) as u64;
        let vertex_bytes = (grid.float_count() * std::mem::size_of::<f32>()) as u64;
        assert!(line_bytes <= max_buffer_size);
        assert!(vertex_bytes <= max_buffer_size);
        assert!(grid.vertex_count() <= u32::MAX as usize);
    }

    #[test]
    fn test_index_count_law() {
        for n in [1, 2, 3, 10, 20, 57] {
            let grid = grid(n);
            assert_eq!(grid.index_count(), (n * n * 6) as usize);
            assert_eq!(generate_indices(&grid).len(), grid.index_count());
        }
    }

    #[test]
    fn test_indices_idempotent() {
        assert_eq!(generate_indices(&grid(13)), generate_indices(&grid(13)));
    }

    #[test]
    fn test_winding() {
        // 2x2 cells, 3 vertices per axis
        let indices = generate_indices(&grid(2));
        assert_eq!(&indices[..6], &[0, 3, 1, 1, 3, 4]);
        assert_eq!(&indices[6..12], &[1, 4, 2, 2, 4, 5]);
        assert_eq!(&indices[12..18], &[3, 6, 4, 4, 6, 7]);
        assert_eq!(&indices[18..], &[4, 7, 5, 5, 7, 8]);
        assert!(indices.iter().all(|&i| i < 9));
    }

    #[test]
    fn test_wireframe_indices() {
        let lines = wireframe_indices(&[0, 3, 1, 1, 3, 4]);
        assert_eq!(lines, vec![0, 3, 3, 1, 1, 0, 1, 3, 3, 4, 4, 1]);
        assert_eq!(wireframe_indices(&generate_indices(&grid(4))).len(), 4 * 4 * 12);
    }

    #[test]
    fn test_vertex_count_law() {
        for n in [2, 5, 20] {
            let grid = GridConfig::new(7.0, n).unwrap();
            let mesh = SurfaceMesh::generate("x", [0.0; 3], &grid);
            assert_eq!(grid.vertex_count(), ((n + 1) * (n + 1)) as usize);
            assert_eq!(mesh.vertices.len(), grid.vertex_count() * 6);
        }
    }

    #[test]
    fn test_corner_heights() {
        let grid = GridConfig::new(10.0, 2).unwrap();
        let mesh = SurfaceMesh::generate("x*y", [1.0, 0.5, 0.25], &grid);
        assert_eq!(mesh.vertices.len(), 9 * 6);
        assert!(mesh.error.is_none());

        assert_eq!(height_at(&mesh, &grid, 0, 0), [-5.0, 25.0, -5.0]);
        assert_eq!(height_at(&mesh, &grid, 0, 2), [-5.0, -25.0, 5.0]);
        assert_eq!(height_at(&mesh, &grid, 1, 1), [0.0, 0.0, 0.0]);
        assert_eq!(height_at(&mesh, &grid, 2, 2), [5.0, 25.0, 5.0]);

        for vertex in mesh.vertices.chunks_exact(6) {
            assert_eq!(&vertex[3..], &[1.0, 0.5, 0.25]);
        }
    }

    #[test]
    fn test_row_major_ordering() {
        let grid = GridConfig::new(4.0, 4).unwrap();
        let mesh = SurfaceMesh::generate("x", [0.0; 3], &grid);
        // Outer loop over i (x), inner over j (y)
        assert_eq!(height_at(&mesh, &grid, 1, 0), [-1.0, -1.0, -2.0]);
        assert_eq!(mesh.vertices[6..9], [-2.0, -2.0, -1.0]);
    }

    #[test]
    fn test_empty_and_broken_formulas_are_flat() {
        let grid = GridConfig::new(10.0, 4).unwrap();

        let empty = SurfaceMesh::generate("", [0.0; 3], &grid);
        assert!(empty.error.is_none());
        assert!(empty.vertices.chunks_exact(6).all(|v| v[1] == 0.0));

        let broken = SurfaceMesh::generate("x*(y", [0.0; 3], &grid);
        assert_eq!(broken.error, Some(EvalError::UnbalancedParentheses));
        assert!(broken.vertices.chunks_exact(6).all(|v| v[1] == 0.0));
        assert_eq!(broken.vertices.len(), grid.float_count());
    }

    #[test]
    fn test_write_colors_keeps_positions() {
        let grid = GridConfig::new(10.0, 3).unwrap();
        let mut mesh = SurfaceMesh::generate("x + y", [0.0; 3], &grid);
        let before = mesh.vertices.clone();
        write_colors(&mut mesh.vertices, [0.2, 0.4, 0.6]);
        for (a, b) in mesh.vertices.chunks_exact(6).zip(before.chunks_exact(6)) {
            assert_eq!(a[..3], b[..3]);
            assert_eq!(a[3..], [0.2, 0.4, 0.6]);
        }
    }
}
