//! Parametric primitives and their polygon form.
//!
//! Faces are wound counter-clockwise when seen from outside.

use std::f64::consts::PI;

use glam::DVec3;

use super::PolyMesh;

/// A parametric object baked to polygons during realization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    /// Axis-aligned box centered at the origin.
    Cuboid { size: DVec3 },
    /// Latitude/longitude sphere centered at the origin.
    UvSphere {
        radius: f64,
        segments: u32,
        rings: u32,
    },
    /// Capped cylinder along z, centered at the origin.
    Cylinder {
        radius: f64,
        depth: f64,
        segments: u32,
    },
}

impl Primitive {
    /// The default cube: edge length 2.
    pub fn cube() -> Self {
        Self::Cuboid {
            size: DVec3::splat(2.0),
        }
    }

    pub fn uv_sphere(radius: f64) -> Self {
        Self::UvSphere {
            radius,
            segments: 32,
            rings: 16,
        }
    }

    pub fn cylinder(radius: f64, depth: f64) -> Self {
        Self::Cylinder {
            radius,
            depth,
            segments: 32,
        }
    }

    /// Bakes the primitive to a polygon mesh. Returns an empty mesh for
    /// degenerate parameters.
    pub fn to_mesh(&self) -> PolyMesh {
        match *self {
            Self::Cuboid { size } => cuboid(size * 0.5),
            Self::UvSphere {
                radius,
                segments,
                rings,
            } => {
                if segments < 3 || rings < 2 {
                    PolyMesh::default()
                } else {
                    uv_sphere(radius, segments, rings)
                }
            }
            Self::Cylinder {
                radius,
                depth,
                segments,
            } => {
                if segments < 3 {
                    PolyMesh::default()
                } else {
                    cylinder(radius, depth, segments)
                }
            }
        }
    }
}

fn cuboid(h: DVec3) -> PolyMesh {
    let vertices = vec![
        DVec3::new(-h.x, -h.y, -h.z),
        DVec3::new(h.x, -h.y, -h.z),
        DVec3::new(h.x, h.y, -h.z),
        DVec3::new(-h.x, h.y, -h.z),
        DVec3::new(-h.x, -h.y, h.z),
        DVec3::new(h.x, -h.y, h.z),
        DVec3::new(h.x, h.y, h.z),
        DVec3::new(-h.x, h.y, h.z),
    ];
    let faces = vec![
        vec![0, 3, 2, 1],
        vec![4, 5, 6, 7],
        vec![0, 1, 5, 4],
        vec![1, 2, 6, 5],
        vec![2, 3, 7, 6],
        vec![3, 0, 4, 7],
    ];
    PolyMesh::new(vertices, faces)
}

fn ring(radius: f64, z: f64, segments: u32) -> impl Iterator<Item = DVec3> {
    (0..segments).map(move |j| {
        let phi = 2.0 * PI * f64::from(j) / f64::from(segments);
        DVec3::new(radius * phi.cos(), radius * phi.sin(), z)
    })
}

fn uv_sphere(radius: f64, segments: u32, rings: u32) -> PolyMesh {
    let mut vertices = vec![DVec3::new(0.0, 0.0, radius)];
    for i in 1..rings {
        let theta = PI * f64::from(i) / f64::from(rings);
        vertices.extend(ring(radius * theta.sin(), radius * theta.cos(), segments));
    }
    let south = u32::try_from(vertices.len()).unwrap_or(u32::MAX);
    vertices.push(DVec3::new(0.0, 0.0, -radius));

    let at = |i: u32, j: u32| 1 + (i - 1) * segments + j % segments;
    let mut faces = Vec::new();
    for j in 0..segments {
        faces.push(vec![0, at(1, j), at(1, j + 1)]);
    }
    for i in 1..rings - 1 {
        for j in 0..segments {
            faces.push(vec![at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1)]);
        }
    }
    for j in 0..segments {
        faces.push(vec![at(rings - 1, j), south, at(rings - 1, j + 1)]);
    }
    PolyMesh::new(vertices, faces)
}

fn cylinder(radius: f64, depth: f64, segments: u32) -> PolyMesh {
    let mut vertices: Vec<DVec3> = ring(radius, -depth * 0.5, segments).collect();
    vertices.extend(ring(radius, depth * 0.5, segments));

    let mut faces = Vec::new();
    for j in 0..segments {
        let k = (j + 1) % segments;
        faces.push(vec![j, k, segments + k, segments + j]);
    }
    faces.push((segments..2 * segments).collect());
    faces.push((0..segments).rev().collect());
    PolyMesh::new(vertices, faces)
}
