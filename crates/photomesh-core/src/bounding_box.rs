//! Axis-aligned bounding boxes with "empty" sentinels.
//!
//! An empty box has `min = +inf` and `max = -inf` in every component, so that
//! folding it into an accumulator with componentwise `min`/`max` leaves the
//! accumulator untouched (`min(x, inf) == x`).

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    /// The empty box: `+inf` minimum, `-inf` maximum.
    pub const EMPTY: Self = Self {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    /// Creates a box from explicit corners.
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Computes the box of a point set. Returns [`BoundingBox::EMPTY`] for no points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a DVec3>) -> Self {
        let mut bbox = Self::EMPTY;
        for p in points {
            bbox.include_point(*p);
        }
        bbox
    }

    /// Grows the box to contain a point.
    pub fn include_point(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grows the box to contain another box. Empty boxes have no effect.
    pub fn include_box(&mut self, other: &BoundingBox) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Returns true while any component still holds a sentinel.
    pub fn is_empty(&self) -> bool {
        !self.min.is_finite() || !self.max.is_finite()
    }

    /// Center of the box, or `None` when empty.
    pub fn center(&self) -> Option<DVec3> {
        (!self.is_empty()).then(|| (self.min + self.max) * 0.5)
    }

    /// Edge lengths of the box, or `None` when empty.
    pub fn extent(&self) -> Option<DVec3> {
        (!self.is_empty()).then(|| self.max - self.min)
    }

    /// Length of the box diagonal; `0.0` when empty.
    pub fn diagonal(&self) -> f64 {
        self.extent().map_or(0.0, DVec3::length)
    }

    /// Returns true if the two boxes overlap (touching counts), with slack `eps`.
    pub fn overlaps(&self, other: &BoundingBox, eps: f64) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x <= other.max.x + eps
            && other.min.x <= self.max.x + eps
            && self.min.y <= other.max.y + eps
            && other.min.y <= self.max.y + eps
            && self.min.z <= other.max.z + eps
            && other.min.z <= self.max.z + eps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_sentinels() {
        let bbox = BoundingBox::EMPTY;
        assert!(bbox.is_empty());
        assert_eq!(bbox.min, DVec3::splat(f64::INFINITY));
        assert_eq!(bbox.max, DVec3::splat(f64::NEG_INFINITY));
        assert!(bbox.center().is_none());
        assert_eq!(bbox.diagonal(), 0.0);
    }

    #[test]
    fn test_include_then_empty_is_unchanged() {
        let mut acc = BoundingBox::EMPTY;
        let cube = BoundingBox::from_points(&[DVec3::splat(-1.0), DVec3::splat(1.0)]);
        acc.include_box(&cube);
        assert_eq!(acc.min, DVec3::splat(-1.0));
        assert_eq!(acc.max, DVec3::splat(1.0));

        acc.include_box(&BoundingBox::EMPTY);
        assert_eq!(acc.min, DVec3::splat(-1.0));
        assert_eq!(acc.max, DVec3::splat(1.0));
    }

    #[test]
    fn test_min_with_infinity_is_identity() {
        let x = 3.25_f64;
        assert_eq!(x.min(f64::INFINITY), x);
        assert_eq!(x.max(f64::NEG_INFINITY), x);
    }

    #[test]
    fn test_overlaps() {
        let a = BoundingBox::new(DVec3::ZERO, DVec3::ONE);
        let b = BoundingBox::new(DVec3::splat(0.5), DVec3::splat(2.0));
        let c = BoundingBox::new(DVec3::splat(3.0), DVec3::splat(4.0));
        assert!(a.overlaps(&b, 0.0));
        assert!(!a.overlaps(&c, 0.0));
        assert!(!a.overlaps(&BoundingBox::EMPTY, 1.0));
    }

    proptest! {
        #[test]
        fn prop_box_contains_all_points(
            pts in prop::collection::vec((-100.0f64..100.0, -100.0f64..100.0, -100.0f64..100.0), 1..32)
        ) {
            let points: Vec<DVec3> = pts.iter().map(|&(x, y, z)| DVec3::new(x, y, z)).collect();
            let bbox = BoundingBox::from_points(&points);
            prop_assert!(!bbox.is_empty());
            for p in &points {
                prop_assert!(p.cmpge(bbox.min).all() && p.cmple(bbox.max).all());
            }
        }
    }
}
