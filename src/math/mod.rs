pub mod expr;
pub mod mesh;
pub mod presets;

pub use expr::{EvalError, evaluate};
pub use mesh::{FLOATS_PER_VERTEX, GridConfig};
pub use presets::FORMULA_PRESETS;
