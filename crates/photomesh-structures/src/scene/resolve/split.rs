//! Splitting core shared by the intersection solvers.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use glam::DVec3;

use super::triangulate::retriangulate;
use super::{Orientation, ResolveError};
use crate::scene::PolyMesh;

type Edge = (u32, u32);

fn edge(a: u32, b: u32) -> Edge {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Identity of an intersection point, derived from the features that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum PointKey {
    /// An existing vertex.
    Vertex(u32),
    /// An edge piercing the interior of a fan triangle.
    EdgeFace(Edge, usize),
    /// Two edges crossing.
    EdgeEdge(Edge, Edge),
}

/// Where a point lies within one fan triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Loc {
    Corner,
    Edge(Edge),
    Interior,
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    key: PointKey,
    pos: DVec3,
    /// Location in the first triangle of the pair.
    first: Loc,
    /// Location in the second triangle of the pair.
    second: Loc,
}

#[derive(Debug, Clone, Copy)]
struct FanTri {
    face: usize,
    v: [u32; 3],
    min: DVec3,
    max: DVec3,
}

fn sign_split(values: &[f64; 3]) -> (bool, bool) {
    (
        values.iter().any(|&x| x > 0.0),
        values.iter().any(|&x| x < 0.0),
    )
}

fn separated(values: &[f64; 3]) -> bool {
    values.iter().all(|&x| x > 0.0)
        || values.iter().all(|&x| x < 0.0)
        || values.iter().all(|&x| x == 0.0)
}

/// Where the segment `p`-`q` (with plane orientations `op`, `oq` relative to `tri`)
/// meets `tri`, if it does.
#[allow(clippy::too_many_arguments)]
fn pierce(
    kernel: &dyn Orientation,
    vertices: &[DVec3],
    p: u32,
    q: u32,
    op: f64,
    oq: f64,
    tri: [u32; 3],
    tri_id: usize,
) -> Option<(PointKey, DVec3, Loc, Loc)> {
    if (op == 0.0 && oq == 0.0) || (op > 0.0 && oq > 0.0) || (op < 0.0 && oq < 0.0) {
        return None;
    }
    let [a, b, c] = tri;
    let s = [
        kernel.orient(p, q, a, b),
        kernel.orient(p, q, b, c),
        kernel.orient(p, q, c, a),
    ];
    let (pos, neg) = sign_split(&s);
    if pos && neg {
        return None;
    }

    let on_segment_end = if op == 0.0 {
        Some(p)
    } else if oq == 0.0 {
        Some(q)
    } else {
        None
    };
    let own_edge = edge(p, q);
    let own_loc = if on_segment_end.is_some() {
        Loc::Corner
    } else {
        Loc::Edge(own_edge)
    };

    let tri_edges = [edge(a, b), edge(b, c), edge(c, a)];
    let zero = s.map(|x| x == 0.0);
    let (tri_loc, tri_vertex) = match zero {
        [true, true, _] => (Loc::Corner, Some(b)),
        [_, true, true] => (Loc::Corner, Some(c)),
        [true, _, true] => (Loc::Corner, Some(a)),
        [true, false, false] => (Loc::Edge(tri_edges[0]), None),
        [false, true, false] => (Loc::Edge(tri_edges[1]), None),
        [false, false, true] => (Loc::Edge(tri_edges[2]), None),
        [false, false, false] => (Loc::Interior, None),
    };

    let key = match (on_segment_end, tri_vertex, tri_loc) {
        (Some(v), _, _) | (None, Some(v), _) => PointKey::Vertex(v),
        (None, None, Loc::Edge(e)) => PointKey::EdgeEdge(own_edge.min(e), own_edge.max(e)),
        (None, None, _) => PointKey::EdgeFace(own_edge, tri_id),
    };
    let pos = match key {
        PointKey::Vertex(v) => vertices[v as usize],
        _ => {
            let t = op / (op - oq);
            let (vp, vq) = (vertices[p as usize], vertices[q as usize]);
            vp + (vq - vp) * t
        }
    };
    Some((key, pos, own_loc, tri_loc))
}

/// The intersection segment of two fan triangles, as its two end points.
fn intersect_pair(
    kernel: &dyn Orientation,
    vertices: &[DVec3],
    t1: (usize, [u32; 3]),
    t2: (usize, [u32; 3]),
) -> Option<[Hit; 2]> {
    let (i1, [a, b, c]) = t1;
    let (i2, [d, e, f]) = t2;

    // All on one side, or coplanar: no crossing segment.
    let o2 = [d, e, f].map(|x| kernel.orient(a, b, c, x));
    if separated(&o2) {
        return None;
    }
    let o1 = [a, b, c].map(|x| kernel.orient(d, e, f, x));
    if separated(&o1) {
        return None;
    }

    let mut hits: Vec<Hit> = Vec::with_capacity(6);
    let t1v = [a, b, c];
    let t2v = [d, e, f];
    for i in 0..3 {
        let (p, q) = (t1v[i], t1v[(i + 1) % 3]);
        if let Some((key, pos, own, tri)) = pierce(kernel, vertices, p, q, o1[i], o1[(i + 1) % 3], t2v, i2) {
            hits.push(Hit { key, pos, first: own, second: tri });
        }
    }
    for i in 0..3 {
        let (p, q) = (t2v[i], t2v[(i + 1) % 3]);
        if let Some((key, pos, own, tri)) = pierce(kernel, vertices, p, q, o2[i], o2[(i + 1) % 3], t1v, i1) {
            hits.push(Hit { key, pos, first: tri, second: own });
        }
    }

    let mut distinct: Vec<Hit> = Vec::with_capacity(hits.len());
    for hit in hits {
        if !distinct.iter().any(|h| h.key == hit.key) {
            distinct.push(hit);
        }
    }
    match distinct.len() {
        0 | 1 => None,
        2 => Some([distinct[0], distinct[1]]),
        _ => {
            let mut best = (0, 1, -1.0);
            for i in 0..distinct.len() {
                for j in i + 1..distinct.len() {
                    let d = distinct[i].pos.distance_squared(distinct[j].pos);
                    if d > best.2 {
                        best = (i, j, d);
                    }
                }
            }
            Some([distinct[best.0], distinct[best.1]])
        }
    }
}

fn fan_triangles(mesh: &PolyMesh) -> (Vec<FanTri>, Vec<std::ops::Range<usize>>) {
    let mut tris = Vec::new();
    let mut ranges = Vec::with_capacity(mesh.faces.len());
    for (face, poly) in mesh.faces.iter().enumerate() {
        let start = tris.len();
        for w in poly[1..].windows(2) {
            let v = [poly[0], w[0], w[1]];
            let pts = v.map(|i| mesh.vertices[i as usize]);
            tris.push(FanTri {
                face,
                v,
                min: pts[0].min(pts[1]).min(pts[2]),
                max: pts[0].max(pts[1]).max(pts[2]),
            });
        }
        ranges.push(start..tris.len());
    }
    (tris, ranges)
}

fn is_degenerate(mesh: &PolyMesh, v: [u32; 3]) -> bool {
    let [a, b, c] = v.map(|i| mesh.vertices[i as usize]);
    (b - a).cross(c - a) == DVec3::ZERO
}

fn shares_edge(a: [u32; 3], b: [u32; 3]) -> bool {
    a.iter().filter(|v| b.contains(v)).count() >= 2
}

/// Candidate pairs whose boxes overlap, by sweeping along x.
fn candidate_pairs(tris: &[FanTri], slack: f64) -> Vec<(usize, usize)> {
    let mut order: Vec<usize> = (0..tris.len()).collect();
    order.sort_by(|&i, &j| tris[i].min.x.total_cmp(&tris[j].min.x));
    let mut pairs = Vec::new();
    for (n, &i) in order.iter().enumerate() {
        for &j in &order[n + 1..] {
            if tris[j].min.x > tris[i].max.x + slack {
                break;
            }
            let overlap = tris[i].min.y <= tris[j].max.y + slack
                && tris[j].min.y <= tris[i].max.y + slack
                && tris[i].min.z <= tris[j].max.z + slack
                && tris[j].min.z <= tris[i].max.z + slack;
            if overlap {
                pairs.push((i.min(j), i.max(j)));
            }
        }
    }
    pairs.sort_unstable();
    pairs
}

/// Splits the faces of `mesh` along their mutual intersections.
pub(super) fn split_intersections(
    mesh: &PolyMesh,
    kernel: &dyn Orientation,
) -> Result<PolyMesh, ResolveError> {
    mesh.validate("mesh")
        .map_err(|e| ResolveError::Failed(e.to_string()))?;

    let (tris, ranges) = fan_triangles(mesh);
    let slack = mesh.bounds().diagonal() * 1e-12;

    let mut vertices = mesh.vertices.clone();
    let mut ids: HashMap<PointKey, u32> = HashMap::new();
    let mut edge_points: BTreeMap<Edge, BTreeSet<u32>> = BTreeMap::new();
    let mut interior: Vec<BTreeSet<u32>> = vec![BTreeSet::new(); tris.len()];
    let mut constraints: Vec<Vec<(u32, u32)>> = vec![Vec::new(); tris.len()];
    let mut crossings = 0usize;

    for (i, j) in candidate_pairs(&tris, slack) {
        let (t1, t2) = (&tris[i], &tris[j]);
        if t1.face == t2.face
            || shares_edge(t1.v, t2.v)
            || is_degenerate(mesh, t1.v)
            || is_degenerate(mesh, t2.v)
        {
            continue;
        }
        let Some(hits) = intersect_pair(kernel, &mesh.vertices, (i, t1.v), (j, t2.v)) else {
            continue;
        };
        crossings += 1;

        let mut segment = [0u32; 2];
        for (slot, hit) in segment.iter_mut().zip(hits) {
            let id = match hit.key {
                PointKey::Vertex(v) => v,
                key => *ids.entry(key).or_insert_with(|| {
                    vertices.push(hit.pos);
                    u32::try_from(vertices.len() - 1).unwrap_or(u32::MAX)
                }),
            };
            for (loc, tri) in [(hit.first, i), (hit.second, j)] {
                match loc {
                    Loc::Corner => {}
                    Loc::Edge(e) => {
                        edge_points.entry(e).or_default().insert(id);
                    }
                    Loc::Interior => {
                        interior[tri].insert(id);
                    }
                }
            }
            *slot = id;
        }
        if segment[0] != segment[1] {
            constraints[i].push((segment[0], segment[1]));
            constraints[j].push((segment[0], segment[1]));
        }
    }

    if vertices.len() > u32::MAX as usize {
        return Err(ResolveError::Failed("too many vertices after splitting".into()));
    }

    let no_points = BTreeSet::new();
    let points_on = |a: u32, b: u32| edge_points.get(&edge(a, b)).unwrap_or(&no_points);
    let touched = |t: usize| {
        let [a, b, c] = tris[t].v;
        !interior[t].is_empty()
            || !constraints[t].is_empty()
            || !points_on(a, b).is_empty()
            || !points_on(b, c).is_empty()
            || !points_on(c, a).is_empty()
    };

    let mut faces = Vec::with_capacity(mesh.faces.len());
    let mut split_faces = 0usize;
    for (face, range) in mesh.faces.iter().zip(&ranges) {
        if !range.clone().any(touched) {
            faces.push(face.clone());
            continue;
        }
        split_faces += 1;
        for t in range.clone() {
            let [a, b, c] = tris[t].v;
            if !touched(t) {
                faces.push(vec![a, b, c]);
                continue;
            }
            let sides = [
                points_on(a, b).iter().copied().collect::<Vec<_>>(),
                points_on(b, c).iter().copied().collect::<Vec<_>>(),
                points_on(c, a).iter().copied().collect::<Vec<_>>(),
            ];
            let interior_points: Vec<u32> = interior[t].iter().copied().collect();
            for tri in retriangulate(&vertices, tris[t].v, &sides, &interior_points, &constraints[t]) {
                faces.push(tri.to_vec());
            }
        }
    }

    log::debug!(
        "resolved {crossings} crossing triangle pair(s): {} new vertices, {split_faces} face(s) split",
        vertices.len() - mesh.vertices.len()
    );
    Ok(PolyMesh::new(vertices, faces))
}
