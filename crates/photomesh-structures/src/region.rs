//! Region reconstruction.
//!
//! Turns the face/element arrays of a decoded document into named regions, each
//! holding only the vertices it references, and accumulates their bounding boxes.

use glam::DVec3;

use photomesh_core::{BoundingBox, OpticalProperties, Result};

use crate::document::{FaceArray, FaceKind, MeshDocument};

/// Source position used when the reconstructed geometry has no extent.
pub const FALLBACK_SOURCE_POSITION: DVec3 = DVec3::new(0.0, 0.0, 5.0);

/// A named sub-mesh with its own vertex subset and bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub kind: FaceKind,
    /// Vertices referenced by the region, in ascending source order.
    pub vertices: Vec<DVec3>,
    /// Faces indexing into [`Region::vertices`].
    pub faces: FaceArray,
    /// Index in the source document of each entry of [`Region::vertices`].
    pub source_indices: Vec<u32>,
    pub bounds: BoundingBox,
    pub optics: Option<OpticalProperties>,
}

impl Region {
    /// Builds a region from one face array of a shared vertex set.
    ///
    /// Every index must be below `vertices.len()`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_faces(
        name: impl Into<String>,
        kind: FaceKind,
        vertices: &[DVec3],
        faces: &FaceArray,
    ) -> Result<Self> {
        let name = name.into();
        faces.validate(vertices.len(), &name)?;

        let mut remap: Vec<Option<u32>> = vec![None; vertices.len()];
        for i in faces.indices() {
            remap[i as usize] = Some(0);
        }
        let mut source_indices = Vec::new();
        let mut local = Vec::new();
        for (i, slot) in remap.iter_mut().enumerate() {
            if slot.is_some() {
                *slot = Some(local.len() as u32);
                source_indices.push(i as u32);
                local.push(vertices[i]);
            }
        }
        let faces = faces.map_indices(|i| remap[i as usize].unwrap_or(i));
        let bounds = BoundingBox::from_points(&local);

        Ok(Self {
            name,
            kind,
            vertices: local,
            faces,
            source_indices,
            bounds,
            optics: None,
        })
    }

    /// Assigns the default optical properties.
    #[must_use]
    pub fn with_default_optics(mut self) -> Self {
        self.optics = Some(OpticalProperties::default());
        self
    }
}

/// Regions of a document plus their aggregate bounding box.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reconstruction {
    pub regions: Vec<Region>,
    pub bounds: BoundingBox,
}

impl Reconstruction {
    /// Adds a region, folding its box into the aggregate.
    pub fn push(&mut self, region: Region) {
        self.bounds.include_box(&region.bounds);
        self.regions.push(region);
    }

    /// Where to place a light source: centered above the geometry, one tenth of
    /// its height over the top face, or a fixed position when there is no geometry.
    pub fn source_position(&self) -> DVec3 {
        match (self.bounds.center(), self.bounds.extent()) {
            (Some(center), Some(extent)) => {
                DVec3::new(center.x, center.y, self.bounds.max.z + 0.1 * extent.z)
            }
            _ => FALLBACK_SOURCE_POSITION,
        }
    }

    /// Looks up a region by name.
    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }
}

/// Reconstructs every face array of `doc` as a region named `<prefix><n>` (1-based),
/// each carrying the default optical properties.
///
/// Sub-documents follow the top-level arrays; a sub-document with a single array
/// and an object name keeps that name.
pub fn reconstruct(doc: &MeshDocument, prefix: &str) -> Result<Reconstruction> {
    let mut out = Reconstruction::default();
    let mut n = 0usize;

    for (key, array) in &doc.faces {
        n += 1;
        let region = Region::from_faces(format!("{prefix}{n}"), key.kind, &doc.vertices, array)?
            .with_default_optics();
        log::debug!("region {} from {key}: {} faces", region.name, array.len());
        out.push(region);
    }

    for group in &doc.groups {
        let named = group.faces.len() == 1;
        for (key, array) in &group.faces {
            n += 1;
            let name = match (&group.info.object_name, named) {
                (Some(object), true) => object.clone(),
                _ => format!("{prefix}{n}"),
            };
            let region = Region::from_faces(name, key.kind, &group.vertices, array)?;
            out.push(region.with_default_optics());
        }
    }

    if out.bounds.is_empty() {
        log::warn!("reconstructed geometry is empty; geometry-based placement is disabled");
    }
    Ok(out)
}
