//! Optical material parameters attached to mesh regions.

use serde::{Deserialize, Serialize};

/// Optical properties of a tissue region, in per-millimetre units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpticalProperties {
    /// Absorption coefficient `mua` (1/mm).
    #[serde(rename = "mua")]
    pub absorption: f64,
    /// Scattering coefficient `mus` (1/mm).
    #[serde(rename = "mus")]
    pub scattering: f64,
    /// Scattering anisotropy `g`.
    #[serde(rename = "g")]
    pub anisotropy: f64,
    /// Refractive index `n`.
    #[serde(rename = "n")]
    pub refractive_index: f64,
}

impl Default for OpticalProperties {
    fn default() -> Self {
        Self {
            absorption: 0.001,
            scattering: 0.1,
            anisotropy: 0.0,
            refractive_index: 1.37,
        }
    }
}

impl OpticalProperties {
    /// Row layout expected by the simulation engine: `[mua, mus, g, n]`.
    pub fn as_row(&self) -> [f64; 4] {
        [
            self.absorption,
            self.scattering,
            self.anisotropy,
            self.refractive_index,
        ]
    }
}
