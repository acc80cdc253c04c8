use glam::DVec3;

use super::split::split_intersections;
use super::{IntersectionSolver, Orientation, ResolveError};
use crate::scene::PolyMesh;

/// Bits of the integer lattice coordinates are snapped to.
const LATTICE_BITS: i32 = 30;

/// Smallest feature, relative to the largest coordinate, the lattice can keep apart.
const MIN_RELATIVE_FEATURE: f64 = 1.0 / 16_777_216.0;

/// Solver with exact orientation predicates on an integer lattice.
///
/// Coordinates are scaled by a power of two so the largest lands just below
/// `2^30`, rounded, and all orientation determinants are then evaluated without
/// rounding in `i128`. Inputs whose small features would not survive the rounding
/// are reported as [`ResolveError::Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSolver;

struct Lattice {
    points: Vec<[i64; 3]>,
}

impl Lattice {
    #[allow(clippy::cast_possible_truncation)]
    fn build(vertices: &[DVec3]) -> Result<Self, ResolveError> {
        if let Some(bad) = vertices.iter().position(|v| !v.is_finite()) {
            return Err(ResolveError::Unavailable(format!(
                "vertex {bad} has a non-finite coordinate"
            )));
        }
        let max_abs = vertices
            .iter()
            .map(|v| v.abs().max_element())
            .fold(0.0f64, f64::max);
        if max_abs == 0.0 {
            return Ok(Self {
                points: vec![[0; 3]; vertices.len()],
            });
        }

        let exponent = LATTICE_BITS - max_abs.log2().ceil() as i32;
        let scale = 2f64.powi(exponent);
        let points = vertices
            .iter()
            .map(|v| (*v * scale).round().to_array().map(|c| c as i64))
            .collect();
        Ok(Self { points })
    }

    fn orient(&self, a: u32, b: u32, c: u32, d: u32) -> i128 {
        let p = |i: u32| self.points[i as usize].map(i128::from);
        let (a, b, c, d) = (p(a), p(b), p(c), p(d));
        let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let w = [d[0] - a[0], d[1] - a[1], d[2] - a[2]];
        u[0] * (v[1] * w[2] - v[2] * w[1]) - u[1] * (v[0] * w[2] - v[2] * w[0])
            + u[2] * (v[0] * w[1] - v[1] * w[0])
    }
}

impl Orientation for Lattice {
    #[allow(clippy::cast_precision_loss)]
    fn orient(&self, a: u32, b: u32, c: u32, d: u32) -> f64 {
        Lattice::orient(self, a, b, c, d) as f64
    }
}

/// Rejects meshes with edges too short for the lattice, or triangles the
/// snapping collapses.
fn check_features(mesh: &PolyMesh, lattice: &Lattice) -> Result<(), ResolveError> {
    let max_abs = mesh
        .vertices
        .iter()
        .map(|v| v.abs().max_element())
        .fold(0.0f64, f64::max);
    let floor = max_abs * MIN_RELATIVE_FEATURE;

    for (f, face) in mesh.faces.iter().enumerate() {
        for (k, &a) in face.iter().enumerate() {
            let b = face[(k + 1) % face.len()];
            let len = mesh.vertices[a as usize].distance(mesh.vertices[b as usize]);
            if len > 0.0 && len < floor {
                return Err(ResolveError::Unavailable(format!(
                    "face {f} has an edge of length {len:e}, below the lattice resolution {floor:e}"
                )));
            }
        }
        for w in face[1..].windows(2) {
            let [a, b, c] = [face[0], w[0], w[1]];
            let [pa, pb, pc] = [a, b, c].map(|i| mesh.vertices[i as usize]);
            let degenerate = (pb - pa).cross(pc - pa) == DVec3::ZERO;
            if !degenerate && lattice_collinear(lattice, a, b, c) {
                return Err(ResolveError::Unavailable(format!(
                    "face {f} collapses when snapped to the lattice"
                )));
            }
        }
    }
    Ok(())
}

fn lattice_collinear(lattice: &Lattice, a: u32, b: u32, c: u32) -> bool {
    let p = |i: u32| lattice.points[i as usize].map(i128::from);
    let (a, b, c) = (p(a), p(b), p(c));
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    u[1] * v[2] - u[2] * v[1] == 0 && u[2] * v[0] - u[0] * v[2] == 0 && u[0] * v[1] - u[1] * v[0] == 0
}

impl IntersectionSolver for ExactSolver {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn resolve(&self, mesh: &PolyMesh) -> Result<PolyMesh, ResolveError> {
        if mesh.is_empty() {
            return Ok(mesh.clone());
        }
        mesh.validate("mesh")
            .map_err(|e| ResolveError::Failed(e.to_string()))?;
        let lattice = Lattice::build(&mesh.vertices)?;
        check_features(mesh, &lattice)?;
        split_intersections(mesh, &lattice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Primitive;
    use glam::DMat4;
    use std::collections::HashMap;

    fn overlapping_cubes() -> PolyMesh {
        let mut mesh = Primitive::cube().to_mesh();
        let shifted = Primitive::cube()
            .to_mesh()
            .transformed(&DMat4::from_translation(DVec3::new(1.0, 0.3, 0.2)));
        mesh.append(&shifted);
        mesh
    }

    fn edge_uses(mesh: &PolyMesh) -> HashMap<(u32, u32), usize> {
        let mut uses = HashMap::new();
        for face in &mesh.faces {
            for (k, &a) in face.iter().enumerate() {
                let b = face[(k + 1) % face.len()];
                *uses.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        uses
    }

    fn signed_volume(mesh: &PolyMesh) -> f64 {
        mesh.faces
            .iter()
            .flat_map(|f| f[1..].windows(2).map(move |w| [f[0], w[0], w[1]]))
            .map(|[a, b, c]| {
                let [pa, pb, pc] = [a, b, c].map(|i| mesh.vertices[i as usize]);
                pa.dot(pb.cross(pc)) / 6.0
            })
            .sum()
    }

    #[test]
    fn test_disjoint_meshes_unchanged() {
        let mut mesh = Primitive::cube().to_mesh();
        mesh.append(
            &Primitive::cube()
                .to_mesh()
                .transformed(&DMat4::from_translation(DVec3::new(5.0, 0.0, 0.0))),
        );
        let resolved = ExactSolver.resolve(&mesh).unwrap();
        assert_eq!(resolved, mesh);
    }

    #[test]
    fn test_overlapping_cubes_are_split_watertight() {
        let mesh = overlapping_cubes();
        let resolved = ExactSolver.resolve(&mesh).unwrap();
        assert!(resolved.face_count() > mesh.face_count());
        assert!(resolved.vertex_count() > mesh.vertex_count());
        for (edge, count) in edge_uses(&resolved) {
            assert_eq!(count % 2, 0, "edge {edge:?} used {count} time(s)");
        }
        // Splitting only subdivides faces, so the enclosed volume is unchanged.
        assert!((signed_volume(&resolved) - signed_volume(&mesh)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_mesh() {
        let resolved = ExactSolver.resolve(&PolyMesh::default()).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_tiny_feature_next_to_huge_coordinate() {
        let mut mesh = Primitive::cube()
            .to_mesh()
            .transformed(&DMat4::from_scale(DVec3::splat(1e-3)));
        mesh.append(&PolyMesh::new(
            vec![
                DVec3::new(1e12, 0.0, 0.0),
                DVec3::new(1e12, 1.0e9, 0.0),
                DVec3::new(1e12, 0.0, 1.0e9),
            ],
            vec![vec![0, 1, 2]],
        ));
        let err = ExactSolver.resolve(&mesh).unwrap_err();
        assert!(matches!(err, ResolveError::Unavailable(_)), "{err:?}");
    }

    #[test]
    fn test_non_finite_coordinates() {
        let mesh = PolyMesh::new(
            vec![DVec3::ZERO, DVec3::X, DVec3::new(f64::NAN, 0.0, 1.0)],
            vec![vec![0, 1, 2]],
        );
        assert!(matches!(
            ExactSolver.resolve(&mesh),
            Err(ResolveError::Unavailable(_))
        ));
    }

    #[test]
    fn test_lattice_orientation_is_exact() {
        let lattice = Lattice::build(&[
            DVec3::ZERO,
            DVec3::X,
            DVec3::Y,
            DVec3::new(0.3, 0.3, 0.0),
            DVec3::new(0.3, 0.3, 1e-6),
        ])
        .unwrap();
        assert_eq!(Lattice::orient(&lattice, 0, 1, 2, 3), 0);
        assert!(Lattice::orient(&lattice, 0, 1, 2, 4) > 0);
        assert!(Lattice::orient(&lattice, 0, 2, 1, 4) < 0);
    }
}
