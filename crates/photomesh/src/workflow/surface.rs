//! Surface processing of selected objects, and surface import.

use std::path::{Path, PathBuf};

use glam::DMat4;
use serde::{Deserialize, Serialize};

use photomesh_core::{Artifact, PhotomeshError, Result, WorkDir};
use photomesh_structures::document::{self, FaceKind, MeshDocument};
use photomesh_structures::scene::{self, PolyMesh, SceneObject, WorkingObject};

use crate::engine::EngineGateway;

/// Engine function that processes exported surfaces.
pub const SURFACE_FUNCTION: &str = "blender2surf";

/// Engine function that reads a surface file into a mesh structure.
pub const IMPORT_FUNCTION: &str = "surf2jmesh";

/// Provenance written into exported surface documents.
pub const SURFACE_COMMENT: &str = "Object surface mesh created by photomesh";

/// What the engine does with the exported surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceAction {
    /// Only write the exchange document.
    Export,
    BooleanResolve,
    BooleanFirst,
    BooleanSecond,
    BooleanDiff,
    BooleanAnd,
    BooleanOr,
    BooleanDecouple,
    Simplify,
    Remesh,
    Smooth,
    Reorient,
    /// Fix self-intersections and fill holes.
    #[default]
    Repair,
}

impl SurfaceAction {
    /// Name the engine script expects.
    pub fn name(self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::BooleanResolve => "boolean-resolve",
            Self::BooleanFirst => "boolean-first",
            Self::BooleanSecond => "boolean-second",
            Self::BooleanDiff => "boolean-diff",
            Self::BooleanAnd => "boolean-and",
            Self::BooleanOr => "boolean-or",
            Self::BooleanDecouple => "boolean-decouple",
            Self::Simplify => "simplify",
            Self::Remesh => "remesh",
            Self::Smooth => "smooth",
            Self::Reorient => "reorient",
            Self::Repair => "repair",
        }
    }
}

/// Settings of one surface-processing run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceRequest {
    pub action: SurfaceAction,
    /// Action parameter (simplification ratio, smoothing iterations, ...).
    pub level: f64,
    /// Triangulate objects before export.
    pub triangulate: bool,
}

impl Default for SurfaceRequest {
    fn default() -> Self {
        Self {
            action: SurfaceAction::Repair,
            level: 1.0,
            triangulate: true,
        }
    }
}

/// Outcome of [`process`].
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceOutcome {
    /// The exported document.
    pub document_path: PathBuf,
    /// Surfaces returned by the engine; empty for [`SurfaceAction::Export`].
    pub surfaces: Vec<WorkingObject>,
}

/// Builds the surface document: one `MeshGroup` entry per object, in world
/// coordinates and named after the object.
pub fn export_document(objects: &[WorkingObject], request: &SurfaceRequest) -> MeshDocument {
    let mut doc = MeshDocument::new().with_comment(SURFACE_COMMENT);
    for object in objects {
        let mut mesh = object.world_mesh();
        if request.triangulate {
            mesh = scene::tessellate(&mesh);
        }
        let (kind, faces) = mesh.face_array();
        let mut group = MeshDocument::new().with_object_name(object.name.clone());
        group.vertices = mesh.vertices;
        group.push_faces(kind, faces);
        doc.groups.push(group);
    }
    doc.params.insert("action", request.action.name());
    doc.params.insert("level", request.level);
    doc
}

/// Exports the selected objects and, unless the action is
/// [`SurfaceAction::Export`], has the engine process them.
pub fn process(
    gateway: &mut EngineGateway,
    workdir: &WorkDir,
    selection: &[SceneObject],
    request: &SurfaceRequest,
    unique_runs: bool,
) -> Result<SurfaceOutcome> {
    let objects = scene::realize(selection)?;
    if objects.is_empty() {
        return Err(PhotomeshError::validation("no mesh-like object selected"));
    }
    let run = workdir.begin_run(unique_runs)?;
    let document_path = run.path(Artifact::BlenderSurf);
    document::save(&export_document(&objects, request), &document_path)?;

    if request.action == SurfaceAction::Export {
        return Ok(SurfaceOutcome {
            document_path,
            surfaces: Vec::new(),
        });
    }

    gateway.enter_run(&run);
    let output = run.path(Artifact::SurfaceMesh);
    let doc = gateway
        .run(SURFACE_FUNCTION, &document_path, Some(&output))?
        .ok_or_else(|| PhotomeshError::NotFound(output.clone()))?;
    Ok(SurfaceOutcome {
        document_path,
        surfaces: surfaces_from(&doc, "surf_"),
    })
}

/// Reads a surface file through the engine.
pub fn import(gateway: &mut EngineGateway, path: &Path) -> Result<WorkingObject> {
    if !path.is_file() {
        return Err(PhotomeshError::NotFound(path.to_path_buf()));
    }
    let doc = gateway.fetch_document(IMPORT_FUNCTION, path)?;
    surfaces_from(&doc, "importedsurf_")
        .into_iter()
        .next()
        .map(|mut object| {
            object.name = "importedsurf".to_string();
            object
        })
        .ok_or_else(|| PhotomeshError::format(IMPORT_FUNCTION, "returned mesh has no faces"))
}

/// One mesh per sub-document (or the top level when there are none), named from
/// the document or `<prefix><n>`.
fn surfaces_from(doc: &MeshDocument, prefix: &str) -> Vec<WorkingObject> {
    let parts: Vec<&MeshDocument> = if doc.groups.is_empty() {
        vec![doc]
    } else {
        doc.groups.iter().collect()
    };
    parts
        .into_iter()
        .enumerate()
        .filter(|(_, part)| !part.faces.is_empty())
        .map(|(i, part)| {
            let faces = part
                .faces
                .iter()
                .filter(|(key, _)| key.kind != FaceKind::Tet4)
                .flat_map(|(_, array)| array.to_polygons())
                .collect();
            WorkingObject {
                name: part
                    .info
                    .object_name
                    .clone()
                    .unwrap_or_else(|| format!("{prefix}{}", i + 1)),
                transform: DMat4::IDENTITY,
                mesh: PolyMesh::new(part.vertices.clone(), faces),
            }
        })
        .collect()
}
