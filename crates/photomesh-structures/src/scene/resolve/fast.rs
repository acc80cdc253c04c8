use glam::DVec3;

use super::split::split_intersections;
use super::{IntersectionSolver, Orientation, ResolveError};
use crate::scene::PolyMesh;

/// Solver with floating-point orientation predicates.
///
/// Determinants smaller than `tolerance * L^3`, where `L` is the diagonal of the
/// mesh bounds, are treated as coplanar. Always available, but near-degenerate
/// configurations may be classified inconsistently.
#[derive(Debug, Clone, Copy)]
pub struct FastSolver {
    pub tolerance: f64,
}

impl Default for FastSolver {
    fn default() -> Self {
        Self { tolerance: 1e-10 }
    }
}

struct Float<'a> {
    vertices: &'a [DVec3],
    eps: f64,
}

impl Orientation for Float<'_> {
    fn orient(&self, a: u32, b: u32, c: u32, d: u32) -> f64 {
        let p = |i: u32| self.vertices[i as usize];
        let (a, b, c, d) = (p(a), p(b), p(c), p(d));
        let det = (b - a).cross(c - a).dot(d - a);
        if det.abs() < self.eps {
            0.0
        } else {
            det
        }
    }
}

impl IntersectionSolver for FastSolver {
    fn name(&self) -> &'static str {
        "fast"
    }

    fn resolve(&self, mesh: &PolyMesh) -> Result<PolyMesh, ResolveError> {
        if mesh.is_empty() {
            return Ok(mesh.clone());
        }
        if mesh.vertices.iter().any(|v| !v.is_finite()) {
            return Err(ResolveError::Failed(
                "mesh has non-finite coordinates".into(),
            ));
        }
        let size = mesh.bounds().diagonal();
        let kernel = Float {
            vertices: &mesh.vertices,
            eps: self.tolerance * size * size * size,
        };
        split_intersections(mesh, &kernel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::resolve::resolve_with_fallback;
    use crate::scene::resolve::ExactSolver;
    use crate::scene::Primitive;
    use glam::DMat4;

    #[test]
    fn test_crossing_triangles_share_segment() {
        // A horizontal triangle and a vertical one passing through it.
        let mesh = PolyMesh::new(
            vec![
                DVec3::new(-1.0, -1.0, 0.0),
                DVec3::new(2.0, -1.0, 0.0),
                DVec3::new(-1.0, 2.0, 0.0),
                DVec3::new(0.2, -0.5, -1.0),
                DVec3::new(0.2, 0.8, -1.0),
                DVec3::new(0.2, 0.1, 1.0),
            ],
            vec![vec![0, 1, 2], vec![3, 4, 5]],
        );
        let resolved = FastSolver::default().resolve(&mesh).unwrap();
        assert_eq!(resolved.vertex_count(), 8);
        assert!(resolved.face_count() > 2);
        let (p, q) = (6u32, 7u32);
        let faces_with_segment = resolved
            .faces
            .iter()
            .filter(|f| f.contains(&p) && f.contains(&q))
            .count();
        // Both sides of the crossing carry the segment as an edge.
        assert!(faces_with_segment >= 4);
        for &v in &[p, q] {
            assert!(resolved.vertices[v as usize].z.abs() < 1e-12);
            assert!((resolved.vertices[v as usize].x - 0.2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_fallback_handles_what_exact_refuses() {
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
        let (resolved, used) =
            resolve_with_fallback(&mesh, &ExactSolver, &FastSolver::default()).unwrap();
        assert_eq!(used, "fast");
        assert_eq!(resolved.face_count(), mesh.face_count());
    }
}
