//! Quality-driven triangulation of polygon faces.

use glam::DVec3;

use super::PolyMesh;

/// Normalized triangle quality: 1 for equilateral, 0 for degenerate.
fn quality(a: DVec3, b: DVec3, c: DVec3) -> f64 {
    let area2 = (b - a).cross(c - a).length();
    let edges = (b - a).length_squared() + (c - b).length_squared() + (a - c).length_squared();
    if edges == 0.0 {
        0.0
    } else {
        // 4 * sqrt(3) * area / sum of squared edges, with area2 = 2 * area.
        2.0 * 3f64.sqrt() * area2 / edges
    }
}

fn quad(vertices: &[DVec3], f: [u32; 4]) -> [[u32; 3]; 2] {
    let p = f.map(|i| vertices[i as usize]);
    let split_02 = quality(p[0], p[1], p[2]).min(quality(p[0], p[2], p[3]));
    let split_13 = quality(p[1], p[2], p[3]).min(quality(p[1], p[3], p[0]));
    if split_13 > split_02 {
        [[f[1], f[2], f[3]], [f[1], f[3], f[0]]]
    } else {
        [[f[0], f[1], f[2]], [f[0], f[2], f[3]]]
    }
}

/// Ear clipping that always removes the best-shaped valid ear.
fn polygon(vertices: &[DVec3], face: &[u32]) -> Vec<[u32; 3]> {
    let pts: Vec<DVec3> = face.iter().map(|&i| vertices[i as usize]).collect();
    let normal = pts
        .iter()
        .zip(pts.iter().cycle().skip(1))
        .fold(DVec3::ZERO, |n, (a, b)| n + a.cross(*b));
    if normal == DVec3::ZERO {
        return fan(face);
    }

    let mut ring: Vec<usize> = (0..face.len()).collect();
    let mut out = Vec::with_capacity(face.len() - 2);
    while ring.len() > 3 {
        let n = ring.len();
        let mut best: Option<(usize, f64)> = None;
        for k in 0..n {
            let (i, j, l) = (ring[(k + n - 1) % n], ring[k], ring[(k + 1) % n]);
            let (a, b, c) = (pts[i], pts[j], pts[l]);
            if (b - a).cross(c - b).dot(normal) <= 0.0 {
                continue;
            }
            let blocked = ring
                .iter()
                .filter(|&&m| m != i && m != j && m != l)
                .any(|&m| inside(pts[m], a, b, c, normal));
            if blocked {
                continue;
            }
            let q = quality(a, b, c);
            if best.map_or(true, |(_, bq)| q > bq) {
                best = Some((k, q));
            }
        }
        let Some((k, _)) = best else {
            log::debug!("no valid ear in a {}-gon, using a fan", face.len());
            let rest: Vec<u32> = ring.iter().map(|&r| face[r]).collect();
            out.extend(fan(&rest));
            return out;
        };
        out.push([
            face[ring[(k + n - 1) % n]],
            face[ring[k]],
            face[ring[(k + 1) % n]],
        ]);
        ring.remove(k);
    }
    out.push([face[ring[0]], face[ring[1]], face[ring[2]]]);
    out
}

fn inside(p: DVec3, a: DVec3, b: DVec3, c: DVec3, normal: DVec3) -> bool {
    (b - a).cross(p - a).dot(normal) >= 0.0
        && (c - b).cross(p - b).dot(normal) >= 0.0
        && (a - c).cross(p - c).dot(normal) >= 0.0
}

fn fan(face: &[u32]) -> Vec<[u32; 3]> {
    face[1..].windows(2).map(|w| [face[0], w[0], w[1]]).collect()
}

/// Triangulates every face with more than three corners.
///
/// Quads take the diagonal whose worse triangle is better shaped; larger polygons
/// are ear-clipped, best ear first. Triangles pass through, vertices are untouched
/// and the winding of each face is preserved.
pub fn tessellate(mesh: &PolyMesh) -> PolyMesh {
    let mut faces = Vec::with_capacity(mesh.faces.len() * 2);
    for face in &mesh.faces {
        match face.len() {
            0..=3 => faces.push(face.clone()),
            4 => {
                let f = [face[0], face[1], face[2], face[3]];
                faces.extend(quad(&mesh.vertices, f).map(|t| t.to_vec()));
            }
            _ => faces.extend(polygon(&mesh.vertices, face).into_iter().map(|t| t.to_vec())),
        }
    }
    PolyMesh::new(mesh.vertices.clone(), faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Primitive;

    fn area(mesh: &PolyMesh) -> f64 {
        mesh.faces
            .iter()
            .flat_map(|f| f[1..].windows(2).map(move |w| [f[0], w[0], w[1]]))
            .map(|[a, b, c]| {
                let [pa, pb, pc] = [a, b, c].map(|i| mesh.vertices[i as usize]);
                (pb - pa).cross(pc - pa).length() * 0.5
            })
            .sum()
    }

    #[test]
    fn test_cube_becomes_twelve_triangles() {
        let cube = Primitive::cube().to_mesh();
        let tris = tessellate(&cube);
        assert!(tris.is_triangulated());
        assert_eq!(tris.face_count(), 12);
        assert_eq!(tris.vertices, cube.vertices);
        assert!((area(&tris) - 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_quad_picks_short_diagonal() {
        // A rhombus: the short diagonal gives two fat triangles.
        let mesh = PolyMesh::new(
            vec![
                DVec3::new(-3.0, 0.0, 0.0),
                DVec3::new(0.0, -1.0, 0.0),
                DVec3::new(3.0, 0.0, 0.0),
                DVec3::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2, 3]],
        );
        let tris = tessellate(&mesh);
        assert_eq!(tris.faces, vec![vec![1, 2, 3], vec![1, 3, 0]]);
    }

    #[test]
    fn test_concave_polygon() {
        // An L shape with a reflex corner at vertex 3.
        let mesh = PolyMesh::new(
            vec![
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(2.0, 0.0, 0.0),
                DVec3::new(2.0, 1.0, 0.0),
                DVec3::new(1.0, 1.0, 0.0),
                DVec3::new(1.0, 2.0, 0.0),
                DVec3::new(0.0, 2.0, 0.0),
            ],
            vec![vec![0, 1, 2, 3, 4, 5]],
        );
        let tris = tessellate(&mesh);
        assert_eq!(tris.face_count(), 4);
        assert!((area(&tris) - 3.0).abs() < 1e-12);
        for f in &tris.faces {
            let [a, b, c] = [f[0], f[1], f[2]].map(|i| tris.vertices[i as usize]);
            assert!((b - a).cross(c - a).z > 0.0);
        }
    }

    #[test]
    fn test_sphere_keeps_triangles() {
        let sphere = Primitive::uv_sphere(1.0).to_mesh();
        let tris = tessellate(&sphere);
        assert!(tris.is_triangulated());
        let existing = sphere.faces.iter().filter(|f| f.len() == 3).count();
        let quads = sphere.faces.iter().filter(|f| f.len() == 4).count();
        assert_eq!(tris.face_count(), existing + 2 * quads);
    }
}
