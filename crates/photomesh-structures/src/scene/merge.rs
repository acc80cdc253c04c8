//! Joining several working objects into one.

use glam::DMat4;

use super::{PolyMesh, WorkingObject};

/// Combines two or more objects into a single object in world coordinates.
///
/// Each object's transform is baked into its vertices before concatenation, and
/// the result carries the identity transform and the first object's name. Zero or
/// one object passes through unchanged.
pub fn merge(objects: Vec<WorkingObject>) -> Vec<WorkingObject> {
    if objects.len() < 2 {
        return objects;
    }
    let mut mesh = PolyMesh::default();
    for object in &objects {
        mesh.append(&object.world_mesh());
    }
    log::debug!(
        "merged {} objects into {} vertices and {} faces",
        objects.len(),
        mesh.vertex_count(),
        mesh.face_count()
    );
    vec![WorkingObject {
        name: objects[0].name.clone(),
        transform: DMat4::IDENTITY,
        mesh,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Primitive;
    use glam::DVec3;

    fn cube(name: &str, offset: DVec3) -> WorkingObject {
        WorkingObject {
            name: name.into(),
            transform: DMat4::from_translation(offset),
            mesh: Primitive::cube().to_mesh(),
        }
    }

    #[test]
    fn test_merge_bakes_transforms() {
        let merged = merge(vec![cube("A", DVec3::ZERO), cube("B", DVec3::new(10.0, 0.0, 0.0))]);
        assert_eq!(merged.len(), 1);
        let object = &merged[0];
        assert_eq!(object.name, "A");
        assert_eq!(object.transform, DMat4::IDENTITY);
        assert_eq!(object.mesh.vertex_count(), 16);
        assert_eq!(object.mesh.face_count(), 12);
        assert_eq!(object.mesh.vertices[8], DVec3::new(9.0, -1.0, -1.0));
        assert_eq!(object.mesh.faces[6], vec![8, 11, 10, 9]);
    }

    #[test]
    fn test_single_object_passes_through() {
        let single = vec![cube("A", DVec3::new(0.0, 0.0, 3.0))];
        let merged = merge(single.clone());
        assert_eq!(merged, single);
        assert_eq!(merge(merged.clone()), merged);
    }
}
