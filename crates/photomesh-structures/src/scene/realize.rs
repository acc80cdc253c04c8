//! Conversion of selected objects into concrete polygon meshes.

use photomesh_core::Result;

use super::{ObjectData, SceneObject, WorkingObject};

/// Bakes every object into a [`WorkingObject`].
///
/// Primitives are converted to polygons. Cameras, lights, empties and meshes
/// without geometry are dropped with a warning. Meshes with out-of-range indices
/// are rejected.
pub fn realize(objects: &[SceneObject]) -> Result<Vec<WorkingObject>> {
    let mut realized = Vec::with_capacity(objects.len());
    for object in objects {
        let mesh = match &object.data {
            ObjectData::Mesh(mesh) => mesh.clone(),
            ObjectData::Primitive(primitive) => primitive.to_mesh(),
            other => {
                log::warn!(
                    "skipping '{}': a {} has no geometry",
                    object.name,
                    other.kind_name()
                );
                continue;
            }
        };
        if mesh.is_empty() {
            log::warn!("skipping '{}': mesh has no faces", object.name);
            continue;
        }
        mesh.validate(&object.name)?;
        realized.push(WorkingObject {
            name: object.name.clone(),
            transform: object.transform,
            mesh,
        });
    }
    log::debug!("realized {} of {} object(s)", realized.len(), objects.len());
    Ok(realized)
}
