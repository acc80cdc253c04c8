//! Color map system.
//!
//! Color maps are defined by an ordered list of hex colors. Stops are evenly spaced
//! over `[0, 1]`: the first at 0, the last at 1, interior stops `1/(N-1)` apart.
//! Hex colors are display (sRGB) values and are gamma-decoded before they reach a
//! material.

use std::collections::HashMap;

use glam::{Vec3, Vec4};
use photomesh_core::{PhotomeshError, Result};

use crate::materials::ColorStop;

/// Decodes one sRGB channel in `[0, 1]` to linear light.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Parses `#RRGGBB` or `RRGGBB` into an sRGB color in `[0, 1]`.
pub fn parse_hex_color(hex: &str) -> Option<Vec3> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Vec3::new(
        f32::from(channel(0)?) / 255.0,
        f32::from(channel(2)?) / 255.0,
        f32::from(channel(4)?) / 255.0,
    ))
}

/// A color map for mapping scalar values to colors.
#[derive(Debug, Clone)]
pub struct ColorMap {
    /// Color map name.
    pub name: String,
    /// sRGB color samples (evenly spaced from 0 to 1).
    pub colors: Vec<Vec3>,
}

impl ColorMap {
    /// Creates a new color map.
    pub fn new(name: impl Into<String>, colors: Vec<Vec3>) -> Self {
        Self {
            name: name.into(),
            colors,
        }
    }

    /// Creates a color map from hex color strings.
    pub fn from_hex(name: impl Into<String>, hex: &[&str]) -> Result<Self> {
        let name = name.into();
        if hex.is_empty() {
            return Err(PhotomeshError::validation(format!(
                "color map '{name}' has no colors"
            )));
        }
        let colors = hex
            .iter()
            .map(|h| {
                parse_hex_color(h).ok_or_else(|| {
                    PhotomeshError::format(format!("colormap.{name}"), format!("invalid hex color '{h}'"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(name, colors))
    }

    /// Stop positions: `i / (N - 1)`, or a single stop at 0.
    pub fn positions(&self) -> Vec<f32> {
        match self.colors.len() {
            0 => Vec::new(),
            1 => vec![0.0],
            n => (0..n).map(|i| i as f32 / (n - 1) as f32).collect(),
        }
    }

    /// Samples the color map at a given value (0 to 1), in sRGB.
    pub fn sample(&self, t: f32) -> Vec3 {
        let t = t.clamp(0.0, 1.0);

        if self.colors.is_empty() {
            return Vec3::ZERO;
        }

        if self.colors.len() == 1 {
            return self.colors[0];
        }

        let n = self.colors.len() - 1;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let idx = (t * n as f32).floor() as usize;
        let idx = idx.min(n - 1);
        let frac = t * n as f32 - idx as f32;

        self.colors[idx].lerp(self.colors[idx + 1], frac)
    }

    /// Samples the color map and decodes the result to linear RGB.
    pub fn sample_linear(&self, t: f32) -> Vec3 {
        let c = self.sample(t);
        Vec3::new(srgb_to_linear(c.x), srgb_to_linear(c.y), srgb_to_linear(c.z))
    }

    /// The ramp handed to a material: evenly spaced stops with linear RGBA colors.
    pub fn linear_stops(&self) -> Vec<ColorStop> {
        self.positions()
            .into_iter()
            .zip(&self.colors)
            .map(|(position, c)| ColorStop {
                position,
                color: Vec4::new(srgb_to_linear(c.x), srgb_to_linear(c.y), srgb_to_linear(c.z), 1.0),
            })
            .collect()
    }
}

/// Registry for managing color maps.
#[derive(Default)]
pub struct ColorMapRegistry {
    color_maps: HashMap<String, ColorMap>,
}

impl ColorMapRegistry {
    /// Creates a new color map registry with default color maps.
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register_defaults();
        registry
    }

    fn register_defaults(&mut self) {
        let defaults: [(&str, &[&str]); 5] = [
            (
                "jet",
                &["#00007f", "#0000ff", "#007fff", "#00ffff", "#7fff7f", "#ffff00", "#ff7f00", "#ff0000", "#7f0000"],
            ),
            (
                "viridis",
                &["#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6ece58", "#b5de2b", "#fde725"],
            ),
            ("hot", &["#0b0000", "#ff0000", "#ffff00", "#ffffff"]),
            ("gray", &["#000000", "#ffffff"]),
            ("coolwarm", &["#3b4cc0", "#8db0fe", "#dddddd", "#f49a7b", "#b40426"]),
        ];
        for (name, hex) in defaults {
            match ColorMap::from_hex(name, hex) {
                Ok(map) => self.register(map),
                Err(e) => log::error!("built-in color map '{name}' is invalid: {e}"),
            }
        }
    }

    /// Registers a color map.
    pub fn register(&mut self, color_map: ColorMap) {
        self.color_maps.insert(color_map.name.clone(), color_map);
    }

    /// Gets a color map by name.
    pub fn get(&self, name: &str) -> Option<&ColorMap> {
        self.color_maps.get(name)
    }

    /// Gets a color map by name, failing with a validation error when unknown.
    pub fn require(&self, name: &str) -> Result<&ColorMap> {
        self.get(name)
            .ok_or_else(|| PhotomeshError::validation(format!("unknown color map '{name}'")))
    }

    /// Returns all color map names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.color_maps.keys().map(String::as_str)
    }
}
