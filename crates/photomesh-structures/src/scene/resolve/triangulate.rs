//! Retriangulation of one triangle after intersection points were added to it.
//!
//! Works in the triangle's plane: edge points are inserted by splitting boundary
//! edges in order, interior points by splitting the triangle (or the edge) that
//! contains them, and each intersection segment is then recovered as an edge by
//! flipping the edges it crosses.

use std::collections::{HashMap, HashSet};

use glam::{DVec2, DVec3};

/// Relative tolerance for 2-D orientation tests, scaled by the squared size of
/// the triangle.
const AREA_EPS: f64 = 1e-10;

struct Local {
    ids: Vec<u32>,
    pts: Vec<DVec2>,
    tris: Vec<[usize; 3]>,
    lookup: HashMap<u32, usize>,
    fixed: HashSet<(usize, usize)>,
    eps: f64,
}

impl Local {
    fn orient(&self, a: usize, b: usize, c: usize) -> f64 {
        (self.pts[b] - self.pts[a]).perp_dot(self.pts[c] - self.pts[a])
    }

    fn add_point(&mut self, id: u32, p: DVec2) -> usize {
        let local = self.pts.len();
        self.ids.push(id);
        self.pts.push(p);
        self.lookup.insert(id, local);
        local
    }

    /// Triangle holding the directed edge `u -> v`, with its opposite vertex.
    fn directed(&self, u: usize, v: usize) -> Option<(usize, usize)> {
        self.tris.iter().enumerate().find_map(|(t, tri)| {
            (0..3).find_map(|k| {
                (tri[k] == u && tri[(k + 1) % 3] == v).then_some((t, tri[(k + 2) % 3]))
            })
        })
    }

    fn has_edge(&self, u: usize, v: usize) -> bool {
        self.directed(u, v).is_some() || self.directed(v, u).is_some()
    }

    /// Splits edge `u`-`v` at `p`, on both sides when it is shared.
    fn split_edge(&mut self, u: usize, v: usize, p: usize) {
        if let Some((t, x)) = self.directed(u, v) {
            self.tris[t] = [u, p, x];
            self.tris.push([p, v, x]);
        }
        if let Some((t, y)) = self.directed(v, u) {
            self.tris[t] = [v, p, y];
            self.tris.push([p, u, y]);
        }
        if self.fixed.remove(&key(u, v)) {
            self.fixed.insert(key(u, p));
            self.fixed.insert(key(p, v));
        }
    }

    /// Inserts an interior point, or returns the existing vertex it coincides with.
    fn insert_interior(&mut self, id: u32, p: DVec2) {
        let mut best: Option<(usize, f64)> = None;
        let mut found = None;
        for (t, tri) in self.tris.iter().enumerate() {
            let [a, b, c] = *tri;
            let o = [
                orient_pt(self.pts[b], self.pts[c], p),
                orient_pt(self.pts[c], self.pts[a], p),
                orient_pt(self.pts[a], self.pts[b], p),
            ];
            let worst = o.iter().copied().fold(f64::INFINITY, f64::min);
            if worst >= -self.eps {
                found = Some((t, o));
                break;
            }
            if best.map_or(true, |(_, w)| worst > w) {
                best = Some((t, worst));
            }
        }

        let (t, o) = match (found, best) {
            (Some(hit), _) => hit,
            (None, Some((t, _))) => (t, [1.0; 3]),
            (None, None) => return,
        };
        let [a, b, c] = self.tris[t];
        let near: Vec<usize> = (0..3).filter(|&k| o[k].abs() <= self.eps).collect();
        match near.as_slice() {
            [] => {
                let local = self.add_point(id, p);
                self.tris[t] = [a, b, local];
                self.tris.push([b, c, local]);
                self.tris.push([c, a, local]);
            }
            [k] => {
                let local = self.add_point(id, p);
                let (u, v) = match k {
                    0 => (b, c),
                    1 => (c, a),
                    _ => (a, b),
                };
                self.split_edge(u, v, local);
            }
            [k1, k2, ..] => {
                // Coincides with the corner shared by the two near-zero edges.
                let corner = [a, b, c]
                    .into_iter()
                    .enumerate()
                    .find(|(k, _)| k != k1 && k != k2)
                    .map_or(a, |(_, v)| v);
                self.lookup.insert(id, corner);
            }
        }
    }

    /// Flips the edges crossing `p`-`q` until it is an edge of the triangulation.
    fn recover(&mut self, p: usize, q: usize, depth: usize) {
        if p == q || self.has_edge(p, q) {
            self.fixed.insert(key(p, q));
            return;
        }
        if depth > 32 {
            return;
        }

        // A vertex lying on the segment splits it in two.
        let d = self.pts[q] - self.pts[p];
        let len2 = d.length_squared();
        let between = (0..self.pts.len())
            .filter(|&r| r != p && r != q)
            .filter(|&r| {
                let t = (self.pts[r] - self.pts[p]).dot(d);
                self.orient(p, q, r).abs() <= self.eps && t > 0.0 && t < len2
            })
            .min_by(|&r, &s| {
                let tr = (self.pts[r] - self.pts[p]).dot(d);
                let ts = (self.pts[s] - self.pts[p]).dot(d);
                tr.total_cmp(&ts)
            });
        if let Some(r) = between {
            self.recover(p, r, depth + 1);
            self.recover(r, q, depth + 1);
            return;
        }

        let limit = 4 * self.tris.len() * self.tris.len() + 16;
        for _ in 0..limit {
            let crossing = self.crossing_edges(p, q);
            if crossing.is_empty() {
                break;
            }
            let flipped = crossing.into_iter().any(|(u, w)| self.try_flip(u, w));
            if !flipped {
                log::debug!("could not recover intersection edge {}-{}", self.ids[p], self.ids[q]);
                return;
            }
        }
        if self.has_edge(p, q) {
            self.fixed.insert(key(p, q));
        }
    }

    fn crossing_edges(&self, p: usize, q: usize) -> Vec<(usize, usize)> {
        let eps = self.eps;
        let strictly_opposite = |x: f64, y: f64| (x > eps && y < -eps) || (x < -eps && y > eps);
        let mut out = Vec::new();
        for tri in &self.tris {
            for k in 0..3 {
                let (u, w) = (tri[k], tri[(k + 1) % 3]);
                if u > w || [u, w].contains(&p) || [u, w].contains(&q) {
                    continue;
                }
                if strictly_opposite(self.orient(p, q, u), self.orient(p, q, w))
                    && strictly_opposite(self.orient(u, w, p), self.orient(u, w, q))
                {
                    out.push((u, w));
                }
            }
        }
        out
    }

    /// Flips edge `u`-`w` if it is interior, unconstrained and its quad is convex.
    fn try_flip(&mut self, u: usize, w: usize) -> bool {
        if self.fixed.contains(&key(u, w)) {
            return false;
        }
        let (Some((t1, x)), Some((t2, y))) = (self.directed(u, w), self.directed(w, u)) else {
            return false;
        };
        let (ox, oy) = (self.orient(x, y, u), self.orient(x, y, w));
        if !((ox > self.eps && oy < -self.eps) || (ox < -self.eps && oy > self.eps)) {
            return false;
        }
        self.tris[t1] = [u, y, x];
        self.tris[t2] = [y, w, x];
        true
    }
}

fn key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

fn orient_pt(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

/// Projects onto the coordinate plane most aligned with the triangle, flipped so
/// the corners come out counter-clockwise.
fn projector(corners: [DVec3; 3]) -> impl Fn(DVec3) -> DVec2 {
    let n = (corners[1] - corners[0]).cross(corners[2] - corners[0]);
    let a = n.abs();
    let (axis_u, axis_v) = if a.z >= a.x && a.z >= a.y {
        (0, 1)
    } else if a.x >= a.y {
        (1, 2)
    } else {
        (2, 0)
    };
    let raw = move |p: DVec3| DVec2::new(p[axis_u], p[axis_v]);
    let [pa, pb, pc] = corners.map(raw);
    let flip = orient_pt(pa, pb, pc) < 0.0;
    move |p: DVec3| {
        let q = raw(p);
        if flip {
            DVec2::new(q.x, -q.y)
        } else {
            q
        }
    }
}

/// Retriangulates the triangle `corners` with extra points on its sides
/// (`sides[k]` lies on the edge from corner `k` to corner `k + 1`), interior
/// points, and segments to be recovered as edges. Output triangles keep the
/// winding of `corners`.
pub(super) fn retriangulate(
    vertices: &[DVec3],
    corners: [u32; 3],
    sides: &[Vec<u32>; 3],
    interior: &[u32],
    constraints: &[(u32, u32)],
) -> Vec<[u32; 3]> {
    let corner_pos = corners.map(|i| vertices[i as usize]);
    let project = projector(corner_pos);
    let corner_2d = corner_pos.map(&project);
    let scale = (corner_2d[1] - corner_2d[0])
        .length_squared()
        .max((corner_2d[2] - corner_2d[1]).length_squared())
        .max((corner_2d[0] - corner_2d[2]).length_squared());

    let mut local = Local {
        ids: Vec::new(),
        pts: Vec::new(),
        tris: vec![[0, 1, 2]],
        lookup: HashMap::new(),
        fixed: HashSet::new(),
        eps: AREA_EPS * scale,
    };
    for (id, p) in corners.iter().zip(corner_2d) {
        local.add_point(*id, p);
    }

    for (k, side) in sides.iter().enumerate() {
        let (start, end) = (k, (k + 1) % 3);
        let origin = corner_pos[start];
        let mut ordered: Vec<u32> = side
            .iter()
            .copied()
            .filter(|id| !local.lookup.contains_key(id))
            .collect();
        ordered.sort_by(|&i, &j| {
            let di = vertices[i as usize].distance_squared(origin);
            let dj = vertices[j as usize].distance_squared(origin);
            di.total_cmp(&dj)
        });
        let mut prev = start;
        for id in ordered {
            let p = local.add_point(id, project(vertices[id as usize]));
            local.split_edge(prev, end, p);
            prev = p;
        }
    }

    for &id in interior {
        if !local.lookup.contains_key(&id) {
            local.insert_interior(id, project(vertices[id as usize]));
        }
    }

    for &(g1, g2) in constraints {
        if let (Some(&p), Some(&q)) = (local.lookup.get(&g1), local.lookup.get(&g2)) {
            local.recover(p, q, 0);
        }
    }

    local
        .tris
        .iter()
        .map(|tri| tri.map(|l| local.ids[l]))
        .collect()
}
