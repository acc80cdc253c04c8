//! Per-vertex weight fields.
//!
//! A scalar field (e.g. log-fluence at each mesh node) is normalized to `[0, 1]` and
//! quantized to `2^bits - 1` levels; vertices sharing a level form one weight group.

use photomesh_core::{PhotomeshError, Result};

/// Quantization depth used for simulation results.
pub const DEFAULT_WEIGHT_BITS: u32 = 10;

/// Vertices sharing one quantized weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightGroup {
    pub weight: f32,
    pub vertices: Vec<u32>,
}

/// Normalizes `values` to `[0, 1]`, mapping everything to 0 when the field is constant.
///
/// Non-finite entries are ignored for the range and map to `None`.
pub fn normalize(values: &[f64]) -> Vec<Option<f64>> {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = max - min;
    values
        .iter()
        .map(|&v| {
            v.is_finite()
                .then(|| if span > 0.0 { (v - min) / span } else { 0.0 })
        })
        .collect()
}

/// Groups vertices by their quantized normalized value.
///
/// Only non-empty groups are returned, in ascending weight order. Vertices with a
/// non-finite value belong to no group.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn quantize(values: &[f64], bits: u32) -> Result<Vec<WeightGroup>> {
    if !(1..=16).contains(&bits) {
        return Err(PhotomeshError::validation(format!(
            "weight depth must be between 1 and 16 bits, got {bits}"
        )));
    }
    let levels = (1u32 << bits) - 1;
    let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); levels as usize + 1];
    let mut skipped = 0usize;

    for (i, w) in normalize(values).into_iter().enumerate() {
        let Ok(vertex) = u32::try_from(i) else {
            return Err(PhotomeshError::validation("weight field has too many vertices"));
        };
        match w {
            Some(w) => buckets[(w * f64::from(levels)).round() as usize].push(vertex),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        log::debug!("{skipped} vertices with non-finite values left out of weight groups");
    }

    Ok(buckets
        .into_iter()
        .enumerate()
        .filter(|(_, v)| !v.is_empty())
        .map(|(level, vertices)| WeightGroup {
            weight: level as f32 / levels as f32,
            vertices,
        })
        .collect())
}
