//! Self- and mutual-intersection resolution.
//!
//! Faces are split along the segments where they cross other faces, so the
//! intersection curves become edges of the mesh. Two solvers share one splitting
//! core and differ only in their orientation predicate:
//!
//! - [`ExactSolver`] snaps coordinates to an integer lattice and evaluates
//!   orientations exactly in `i128`; it reports [`ResolveError::Unavailable`] when
//!   the geometry cannot be represented on the lattice.
//! - [`FastSolver`] evaluates orientations in `f64` with a relative tolerance.
//!
//! Intersection points are identified by what produced them (an edge piercing a
//! triangle, or two edges crossing), never by position, so both sides of a shared
//! edge receive exactly the same points. Faces no intersection touches keep their
//! original polygon. Coplanar overlapping faces are left unsplit.

mod exact;
mod fast;
mod split;
mod triangulate;

use thiserror::Error;

use photomesh_core::PhotomeshError;

use super::PolyMesh;

pub use exact::ExactSolver;
pub use fast::FastSolver;

/// Failure of an intersection solver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The solver cannot handle this input; another solver may.
    #[error("solver unavailable: {0}")]
    Unavailable(String),

    /// The solver ran and failed.
    #[error("intersection resolution failed: {0}")]
    Failed(String),
}

impl From<ResolveError> for PhotomeshError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Unavailable(msg) => PhotomeshError::Dependency(msg),
            ResolveError::Failed(msg) => PhotomeshError::validation(msg),
        }
    }
}

/// A mutual-intersection solver.
pub trait IntersectionSolver {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Splits the faces of `mesh` along their mutual intersections.
    fn resolve(&self, mesh: &PolyMesh) -> Result<PolyMesh, ResolveError>;
}

/// Runs `primary`, and `fallback` only if `primary` reports itself unavailable.
///
/// Returns the resolved mesh and the name of the solver that produced it. Any other
/// failure of `primary` is returned as is.
pub fn resolve_with_fallback(
    mesh: &PolyMesh,
    primary: &dyn IntersectionSolver,
    fallback: &dyn IntersectionSolver,
) -> Result<(PolyMesh, &'static str), ResolveError> {
    match primary.resolve(mesh) {
        Ok(resolved) => Ok((resolved, primary.name())),
        Err(ResolveError::Unavailable(reason)) => {
            log::warn!(
                "{} solver unavailable ({reason}), falling back to {}",
                primary.name(),
                fallback.name()
            );
            fallback.resolve(mesh).map(|r| (r, fallback.name()))
        }
        Err(err) => Err(err),
    }
}

/// Orientation predicate over the vertices of the mesh being resolved.
///
/// Returns a value whose sign is the orientation of `d` relative to the plane
/// through `a`, `b`, `c` (positive when `d` is on the side the normal
/// `(b - a) x (c - a)` points to), and exactly zero when the four are coplanar.
pub(crate) trait Orientation {
    fn orient(&self, a: u32, b: u32, c: u32, d: u32) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Primitive;
    use glam::{DMat4, DVec3};
    use std::cell::Cell;

    struct Scripted {
        name: &'static str,
        result: Result<(), ResolveError>,
        calls: Cell<usize>,
    }

    impl Scripted {
        fn new(name: &'static str, result: Result<(), ResolveError>) -> Self {
            Self {
                name,
                result,
                calls: Cell::new(0),
            }
        }
    }

    impl IntersectionSolver for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        fn resolve(&self, mesh: &PolyMesh) -> Result<PolyMesh, ResolveError> {
            self.calls.set(self.calls.get() + 1);
            self.result.clone().map(|()| mesh.clone())
        }
    }

    fn overlapping_cubes() -> PolyMesh {
        let mut mesh = Primitive::cube().to_mesh();
        let shifted = Primitive::cube()
            .to_mesh()
            .transformed(&DMat4::from_translation(DVec3::new(1.0, 0.3, 0.2)));
        mesh.append(&shifted);
        mesh
    }

    #[test]
    fn test_fallback_only_on_unavailable() {
        let mesh = overlapping_cubes();
        let primary = Scripted::new("primary", Err(ResolveError::Unavailable("no lattice".into())));
        let fallback = Scripted::new("fallback", Ok(()));
        let (_, used) = resolve_with_fallback(&mesh, &primary, &fallback).unwrap();
        assert_eq!(used, "fallback");
        assert_eq!(fallback.calls.get(), 1);

        let primary = Scripted::new("primary", Err(ResolveError::Failed("boom".into())));
        let fallback = Scripted::new("fallback", Ok(()));
        let err = resolve_with_fallback(&mesh, &primary, &fallback).unwrap_err();
        assert_eq!(err, ResolveError::Failed("boom".into()));
        assert_eq!(fallback.calls.get(), 0);
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let mesh = overlapping_cubes();
        let fallback = Scripted::new("fallback", Ok(()));
        let (resolved, used) = resolve_with_fallback(&mesh, &ExactSolver::default(), &fallback).unwrap();
        assert_eq!(used, "exact");
        assert!(resolved.face_count() > 6);
        assert_eq!(fallback.calls.get(), 0);
    }

    #[test]
    fn test_error_conversion() {
        let err: PhotomeshError = ResolveError::Unavailable("x".into()).into();
        assert!(matches!(err, PhotomeshError::Dependency(_)));
        let err: PhotomeshError = ResolveError::Failed("y".into()).into();
        assert!(matches!(err, PhotomeshError::Validation(_)));
    }
}
