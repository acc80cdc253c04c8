//! Label and density grids built from volumetric images.
//!
//! In label mode every integer label in `[floor(min), floor(max) + 1)` becomes a
//! sparse mask grid; in continuous mode the field is normalized into a single
//! density grid. Both carry the volume's grid-to-world transform unchanged.

use std::path::{Path, PathBuf};

use glam::DMat4;
use serde::{Deserialize, Serialize};

use photomesh_core::workdir::{write_atomic, LABEL_GRID_PREFIX};
use photomesh_core::{PhotomeshError, Result};
use photomesh_render::{ColorMapRegistry, GridMaterial};

/// Upper bound on the number of label grids built from one volume.
pub const MAX_LABELS: usize = 1 << 16;

/// A dense 3-D scalar array with its grid-to-world transform.
///
/// Voxel `(i, j, k)` is stored at `i + dims[0] * (j + dims[1] * k)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub dims: [usize; 3],
    pub data: Vec<f64>,
    pub transform: DMat4,
}

impl Volume {
    /// Creates a volume, checking that `data` fills `dims` exactly.
    pub fn new(dims: [usize; 3], data: Vec<f64>, transform: DMat4) -> Result<Self> {
        let expected = dims.iter().product::<usize>();
        if data.len() != expected {
            return Err(PhotomeshError::validation(format!(
                "volume of size {}x{}x{} needs {expected} voxels, got {}",
                dims[0],
                dims[1],
                dims[2],
                data.len()
            )));
        }
        Ok(Self {
            dims,
            data,
            transform,
        })
    }

    /// Linear index of voxel `(i, j, k)`.
    pub fn linear_index(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.dims[0] * (j + self.dims[1] * k)
    }

    fn range(&self) -> Result<(f64, f64)> {
        if self.data.is_empty() {
            return Err(PhotomeshError::validation("volume is empty"));
        }
        if let Some(pos) = self.data.iter().position(|v| !v.is_finite()) {
            return Err(PhotomeshError::validation(format!(
                "volume has a non-finite value at voxel {pos}"
            )));
        }
        Ok(self
            .data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v))))
    }
}

/// How voxel values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GridMode {
    /// Integer labels, one mask grid per label ("model view").
    #[default]
    Labels,
    /// A continuous field, normalized to `[0, 1]` ("result view").
    Continuous,
}

/// Contents of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridData {
    /// Sorted linear indices of the active voxels.
    Mask(Vec<usize>),
    /// Normalized value per voxel.
    Density(Vec<f32>),
}

/// One named grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedGrid {
    pub name: String,
    /// The label value for mask grids.
    pub label: Option<i64>,
    pub dims: [usize; 3],
    pub data: GridData,
}

impl NamedGrid {
    /// Number of active voxels (mask) or voxels (density).
    pub fn len(&self) -> usize {
        match &self.data {
            GridData::Mask(active) => active.len(),
            GridData::Density(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Grids built from one volume, with their materials and shared transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelGridSet {
    pub grids: Vec<NamedGrid>,
    /// One material per grid, in the same order.
    pub materials: Vec<GridMaterial>,
    pub transform: DMat4,
}

impl LabelGridSet {
    /// Writes each grid with its material to `<dir>/labelgrid_<name>.json`.
    pub fn write_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.grids
            .iter()
            .zip(&self.materials)
            .map(|(grid, material)| {
                let path = dir.join(format!("{LABEL_GRID_PREFIX}_{}.json", grid.name));
                let body = serde_json::json!({
                    "grid": grid,
                    "material": material,
                    "transform": self.transform,
                });
                write_atomic(&path, &serde_json::to_vec(&body)?)?;
                Ok(path)
            })
            .collect()
    }
}

/// Digits used for label grid names: `max(1, ceil(log10(count)))`.
pub fn label_digits(count: usize) -> usize {
    let mut digits = 0;
    let mut span = 1usize;
    while span < count {
        span = span.saturating_mul(10);
        digits += 1;
    }
    digits.max(1)
}

/// Builds the grids for `volume` in `mode`, coloring them with `colormap`.
pub fn build(
    volume: &Volume,
    mode: GridMode,
    colormap: &str,
    registry: &ColorMapRegistry,
) -> Result<LabelGridSet> {
    let map = registry.require(colormap)?;
    let (min, max) = volume.range()?;

    let (grids, materials) = match mode {
        GridMode::Labels => {
            let grids = label_grids(volume, min, max)?;
            #[allow(clippy::cast_precision_loss)]
            let last = grids.len().saturating_sub(1).max(1) as f32;
            #[allow(clippy::cast_precision_loss)]
            let materials = grids
                .iter()
                .enumerate()
                .map(|(i, g)| GridMaterial::solid(g.name.clone(), map, i as f32 / last))
                .collect();
            (grids, materials)
        }
        GridMode::Continuous => {
            let grid = density_grid(volume, min, max);
            let material = GridMaterial::ramp(grid.name.clone(), map);
            (vec![grid], vec![material])
        }
    };
    log::info!(
        "built {} {:?} grid(s) from a {}x{}x{} volume",
        grids.len(),
        mode,
        volume.dims[0],
        volume.dims[1],
        volume.dims[2]
    );

    Ok(LabelGridSet {
        grids,
        materials,
        transform: volume.transform,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn label_grids(volume: &Volume, min: f64, max: f64) -> Result<Vec<NamedGrid>> {
    let span = max.floor() - min.floor() + 1.0;
    if span > MAX_LABELS as f64 {
        return Err(PhotomeshError::validation(format!(
            "{span} labels exceed the limit of {MAX_LABELS}"
        )));
    }
    let base = min.floor();
    let lo = base as i64;
    let count = span as usize;
    let width = label_digits(count);

    let mut active: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (idx, &v) in volume.data.iter().enumerate() {
        if v.fract() == 0.0 {
            active[(v - base) as usize].push(idx);
        }
    }

    Ok(active
        .into_iter()
        .enumerate()
        .map(|(i, voxels)| NamedGrid {
            name: format!("label_{i:0width$}"),
            label: Some(lo.saturating_add(i as i64)),
            dims: volume.dims,
            data: GridData::Mask(voxels),
        })
        .collect())
}

#[allow(clippy::cast_possible_truncation)]
fn density_grid(volume: &Volume, min: f64, max: f64) -> NamedGrid {
    let span = max - min;
    let values = volume
        .data
        .iter()
        .map(|&v| if span > 0.0 { ((v - min) / span) as f32 } else { 0.0 })
        .collect();
    NamedGrid {
        name: "density".to_string(),
        label: None,
        dims: volume.dims,
        data: GridData::Density(values),
    }
}
