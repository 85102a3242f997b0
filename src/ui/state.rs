use std::collections::BTreeMap;

use crate::config::PlotterConfig;
use crate::math::GridConfig;
use crate::renderer::{ProjectionMode, RenderOptions};
use crate::scene::{SurfaceId, SurfaceRegistry};

/// Text buffer behind one surface row.
pub struct SurfaceRow {
    pub formula: String,
    pub preset: Option<usize>,
}

pub struct UiState {
    pub grid_text: String,
    pub divisions_text: String,

    pub projection: ProjectionMode,
    pub show_axes: bool,
    pub show_mesh: bool,
    pub show_help: bool,

    rows: BTreeMap<SurfaceId, SurfaceRow>,
}

impl UiState {
    pub fn new(config: &PlotterConfig) -> Self {
        Self {
            grid_text: format_grid(&config.grid).0,
            divisions_text: format_grid(&config.grid).1,
            projection: config.projection,
            show_axes: config.show_axes,
            show_mesh: config.show_mesh,
            show_help: true,
            rows: BTreeMap::new(),
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            show_axes: self.show_axes,
            show_mesh: self.show_mesh,
        }
    }

    /// Grid extent and subdivisions typed into the properties box, if both
    /// parse and form a valid grid.
    pub fn parsed_grid(&self) -> Option<(f32, u32)> {
        parse_grid(&self.grid_text, &self.divisions_text)
    }

    /// Row buffer for `id`, seeded from the registry the first time it is
    /// seen.
    pub fn row_mut(&mut self, id: SurfaceId, formula: &str) -> &mut SurfaceRow {
        self.rows.entry(id).or_insert_with(|| SurfaceRow {
            formula: formula.to_owned(),
            preset: None,
        })
    }

    /// Drops row buffers of surfaces the registry no longer has.
    pub fn retain_rows(&mut self, registry: &SurfaceRegistry) {
        self.rows.retain(|id, _| registry.get(*id).is_some());
    }

    #[cfg(test)]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

fn format_grid(grid: &GridConfig) -> (String, String) {
    (format!("{}", grid.grid_extent), format!("{}", grid.subdivisions))
}

/// Accepts only input that parses in full and passes [`GridConfig::new`].
pub fn parse_grid(extent: &str, divisions: &str) -> Option<(f32, u32)> {
    let extent: f32 = extent.trim().parse().ok()?;
    let divisions = parse_divisions(divisions.trim())?;
    GridConfig::new(extent, divisions).map(|g| (g.grid_extent, g.subdivisions))
}

/// Whole numbers only, though "20.0" is as good as "20".
fn parse_divisions(text: &str) -> Option<u32> {
    if let Ok(n) = text.parse::<u32>() {
        return Some(n);
    }
    let value: f64 = text.parse().ok()?;
    if value.fract() != 0.0 || !(0.0..=u32::MAX as f64).contains(&value) {
        return None;
    }
    Some(value as u32)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_grid() {
        assert_eq!(parse_grid("20", "20"), Some((20.0, 20)));
        assert_eq!(parse_grid(" 12.5 ", "8"), Some((12.5, 8)));
        assert_eq!(parse_grid("", "20"), None);
        assert_eq!(parse_grid("abc", "20"), None);
        assert_eq!(parse_grid("20", "4.5"), None);
        assert_eq!(parse_grid("0", "20"), None);
        assert_eq!(parse_grid("-3", "20"), None);
        assert_eq!(parse_grid("20", "1"), None);
        assert_eq!(parse_grid("20", "-2"), None);
        assert_eq!(parse_grid("20", "5000"), None);
    }

    #[test]
    fn test_parse_whole_float_divisions() {
        assert_eq!(parse_grid("20", "20.0"), Some((20.0, 20)));
        assert_eq!(parse_grid("20", " 8. "), Some((20.0, 8)));
        assert_eq!(parse_grid("20", "1e1"), Some((20.0, 10)));
        assert_eq!(parse_grid("20", "20.5"), None);
        assert_eq!(parse_grid("20", "NaN"), None);
        assert_eq!(parse_grid("20", "inf"), None);
        assert_eq!(parse_grid("20", "-4.0"), None);
    }

    #[test]
    fn test_initial_state() {
        let config = PlotterConfig::default();
        let state = UiState::new(&config);
        assert_eq!(state.parsed_grid(), Some((20.0, 20)));
        assert_eq!(state.projection, ProjectionMode::Perspective);
        assert_eq!(state.render_options(), RenderOptions::default());
    }

    #[test]
    fn test_rows_follow_registry() {
        let mut registry = SurfaceRegistry::new(GridConfig::default(), [1.0, 0.0, 0.0]);
        let a = registry.add_surface();
        let b = registry.add_surface();
        registry.set_formula(a, "x * y");

        let mut state = UiState::new(&PlotterConfig::default());
        assert_eq!(state.row_mut(a, "x * y").formula, "x * y");
        state.row_mut(b, "").formula.push('x');
        // seeded once, later calls keep the edit
        assert_eq!(state.row_mut(b, "").formula, "x");

        registry.remove_surface(a);
        state.retain_rows(&registry);
        assert_eq!(state.row_count(), 1);
    }
}
