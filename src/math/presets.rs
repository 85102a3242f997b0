pub struct FormulaPreset {
    pub name: &'static str,
    pub description: &'static str,
    pub formula: &'static str,
}

pub const FORMULA_PRESETS: &[FormulaPreset] = &[
    FormulaPreset {
        name: "Saddle",
        description: "Hyperbolic paraboloid",
        formula: "x * y",
    },
    FormulaPreset {
        name: "Parabolic Trough",
        description: "Constant along y",
        formula: "x * x",
    },
    FormulaPreset {
        name: "Paraboloid",
        description: "Bowl opening upward",
        formula: "(x^2 + y^2) / 10",
    },
    FormulaPreset {
        name: "Sine Wave",
        description: "Product of two sines",
        formula: "3 * sin(x / 2) * cos(y / 2)",
    },
    FormulaPreset {
        name: "Ripple",
        description: "Radial wave",
        formula: "4 * sin(sqrt(x^2 + y^2)) / (sqrt(x^2 + y^2) + 1)",
    },
    FormulaPreset {
        name: "Gaussian",
        description: "Bell centred on the origin",
        formula: "8 * exp(-(x^2 + y^2) / 20)",
    },
    FormulaPreset {
        name: "Plane",
        description: "Tilted plane",
        formula: "x / 2 - y / 4",
    },
];

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::expr::Program;

    #[test]
    fn test_presets_compile() {
        for preset in FORMULA_PRESETS {
            assert!(
                Program::compile(preset.formula).is_ok(),
                "preset {} failed to compile",
                preset.name
            );
        }
    }
}
