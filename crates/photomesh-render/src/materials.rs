//! Material metadata for label and density grids.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::color_maps::ColorMap;

/// One stop of a color ramp, in linear RGBA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    /// Position along the ramp, in `[0, 1]`.
    pub position: f32,
    pub color: Vec4,
}

/// Shading description for one grid.
///
/// Label grids get a single base color; density grids get a full ramp that the
/// renderer evaluates against the normalized density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridMaterial {
    /// Name of the grid this material shades.
    pub grid: String,
    /// Linear RGBA base color.
    pub base_color: Vec4,
    /// Linear color ramp (empty for solid materials).
    pub ramp: Vec<ColorStop>,
}

impl GridMaterial {
    /// A solid material sampled from `color_map` at `t`.
    pub fn solid(grid: impl Into<String>, color_map: &ColorMap, t: f32) -> Self {
        Self {
            grid: grid.into(),
            base_color: color_map.sample_linear(t).extend(1.0),
            ramp: Vec::new(),
        }
    }

    /// A ramp material carrying every stop of `color_map`.
    pub fn ramp(grid: impl Into<String>, color_map: &ColorMap) -> Self {
        Self {
            grid: grid.into(),
            base_color: color_map.sample_linear(1.0).extend(1.0),
            ramp: color_map.linear_stops(),
        }
    }

    /// Whether the material is a color ramp.
    pub fn is_ramp(&self) -> bool {
        !self.ramp.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_vs_ramp() {
        let map = ColorMap::from_hex("bw", &["#000000", "#ffffff"]).unwrap();
        let solid = GridMaterial::solid("label_0", &map, 0.0);
        assert!(!solid.is_ramp());
        assert_eq!(solid.base_color, Vec4::new(0.0, 0.0, 0.0, 1.0));

        let ramp = GridMaterial::ramp("density", &map);
        assert!(ramp.is_ramp());
        assert_eq!(ramp.ramp.len(), 2);
    }
}
