//! Scene geometry handed over by the editor, and the preparation steps applied to it.
//!
//! Objects arrive with a world transform and either polygon data, a parametric
//! primitive, or no geometry at all (cameras, lights, empties). The steps here turn
//! them into a single triangulated polygon soup ready for export:
//! [`realize`], [`merge`], [`resolve`] and [`tessellate`].

pub mod merge;
pub mod primitives;
pub mod realize;
pub mod resolve;
pub mod tessellate;

use glam::{DMat4, DVec3};

use photomesh_core::{BoundingBox, PhotomeshError, Result};

use crate::document::{FaceArray, FaceKind};

pub use merge::merge;
pub use primitives::Primitive;
pub use realize::realize;
pub use resolve::{resolve_with_fallback, ExactSolver, FastSolver, IntersectionSolver, ResolveError};
pub use tessellate::tessellate;

/// A polygon soup: vertices and faces of arbitrary arity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolyMesh {
    pub vertices: Vec<DVec3>,
    pub faces: Vec<Vec<u32>>,
}

impl PolyMesh {
    pub fn new(vertices: Vec<DVec3>, faces: Vec<Vec<u32>>) -> Self {
        Self { vertices, faces }
    }

    /// Returns true if the mesh has no faces or no vertices.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty() || self.vertices.is_empty()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns true if every face is a triangle.
    pub fn is_triangulated(&self) -> bool {
        self.faces.iter().all(|f| f.len() == 3)
    }

    /// Checks face arity (at least 3) and index range.
    pub fn validate(&self, name: &str) -> Result<()> {
        let n = self.vertices.len();
        for (i, face) in self.faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(PhotomeshError::validation(format!(
                    "{name}: face {i} has only {} vertices",
                    face.len()
                )));
            }
            if let Some(&bad) = face.iter().find(|&&v| v as usize >= n) {
                return Err(PhotomeshError::validation(format!(
                    "{name}: face {i} references vertex {bad} of {n}"
                )));
            }
        }
        Ok(())
    }

    /// Returns a copy with every vertex mapped through `transform`.
    #[must_use]
    pub fn transformed(&self, transform: &DMat4) -> Self {
        Self {
            vertices: self
                .vertices
                .iter()
                .map(|&v| transform.transform_point3(v))
                .collect(),
            faces: self.faces.clone(),
        }
    }

    /// Appends `other`, offsetting its indices past the current vertices.
    #[allow(clippy::cast_possible_truncation)]
    pub fn append(&mut self, other: &PolyMesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|f| f.iter().map(|&i| i + offset).collect::<Vec<u32>>()),
        );
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_points(&self.vertices)
    }

    /// The faces as an exchange array: `tri3` when all faces are triangles,
    /// otherwise `poly`.
    pub fn face_array(&self) -> (FaceKind, FaceArray) {
        let kind = if self.is_triangulated() {
            FaceKind::Tri3
        } else {
            FaceKind::Poly
        };
        (kind, FaceArray::from_polygons(self.faces.clone()))
    }
}

/// What a scene object carries.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectData {
    Mesh(PolyMesh),
    Primitive(Primitive),
    Camera,
    Light,
    Empty,
}

impl ObjectData {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Mesh(_) => "mesh",
            Self::Primitive(_) => "primitive",
            Self::Camera => "camera",
            Self::Light => "light",
            Self::Empty => "empty",
        }
    }
}

/// A selected editor object with its world transform.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub transform: DMat4,
    pub data: ObjectData,
}

impl SceneObject {
    /// Creates an object at the origin.
    pub fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            transform: DMat4::IDENTITY,
            data,
        }
    }

    /// Creates a mesh object at the origin.
    pub fn mesh(name: impl Into<String>, mesh: PolyMesh) -> Self {
        Self::new(name, ObjectData::Mesh(mesh))
    }

    #[must_use]
    pub fn with_transform(mut self, transform: DMat4) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_translation(mut self, offset: DVec3) -> Self {
        self.transform = DMat4::from_translation(offset) * self.transform;
        self
    }
}

/// An object with concrete polygon data, as produced by [`realize`].
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingObject {
    pub name: String,
    pub transform: DMat4,
    /// Geometry in object-local coordinates.
    pub mesh: PolyMesh,
}

impl WorkingObject {
    /// The geometry in world coordinates.
    pub fn world_mesh(&self) -> PolyMesh {
        if self.transform == DMat4::IDENTITY {
            self.mesh.clone()
        } else {
            self.mesh.transformed(&self.transform)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> PolyMesh {
        PolyMesh::new(vec![DVec3::ZERO, DVec3::X, DVec3::Y], vec![vec![0, 1, 2]])
    }

    #[test]
    fn test_append_offsets_indices() {
        let mut a = triangle();
        a.append(&triangle());
        assert_eq!(a.vertex_count(), 6);
        assert_eq!(a.faces[1], vec![3, 4, 5]);
        assert!(a.validate("a").is_ok());
    }

    #[test]
    fn test_validate() {
        let bad = PolyMesh::new(vec![DVec3::ZERO], vec![vec![0, 1, 2]]);
        assert!(bad.validate("bad").is_err());
        let degenerate = PolyMesh::new(vec![DVec3::ZERO, DVec3::X], vec![vec![0, 1]]);
        assert!(degenerate.validate("deg").is_err());
    }

    #[test]
    fn test_face_array_kind() {
        assert_eq!(triangle().face_array().0, FaceKind::Tri3);
        let quad = PolyMesh::new(
            vec![DVec3::ZERO, DVec3::X, DVec3::ONE, DVec3::Y],
            vec![vec![0, 1, 2, 3]],
        );
        assert_eq!(quad.face_array().0, FaceKind::Poly);
    }

    #[test]
    fn test_world_mesh_applies_transform() {
        let obj = WorkingObject {
            name: "t".into(),
            transform: DMat4::from_translation(DVec3::new(0.0, 0.0, 2.0)),
            mesh: triangle(),
        };
        assert_eq!(obj.world_mesh().vertices[1], DVec3::new(1.0, 0.0, 2.0));
    }
}
