//! Meshing of volumetric images, and label-grid previews of volumes.

use std::path::{Path, PathBuf};

use serde::Serialize;

use photomesh_core::options::{ImageType, SurfaceExtraction, VolumeMeshingParams};
use photomesh_core::workdir::write_atomic;
use photomesh_core::{Artifact, PhotomeshError, Result, WorkDir};
use photomesh_render::ColorMapRegistry;
use photomesh_structures::label_grid::{self, GridMode, LabelGridSet, Volume};
use photomesh_structures::region::{self, Reconstruction};

use crate::engine::EngineGateway;
use crate::pipeline::REGION_PREFIX;

/// Engine function that meshes a volumetric image.
pub const VOLUME_FUNCTION: &str = "nii2mesh";

#[derive(Serialize)]
struct ImageRequest<'a> {
    niipath: &'a str,
    maxvol: f64,
    radbound: f64,
    distbound: f64,
    isovalue: f64,
    imagetype: ImageType,
    method: SurfaceExtraction,
}

/// Writes the image path and meshing parameters the engine reads.
pub fn write_image_request(
    run: &WorkDir,
    image: &Path,
    params: &VolumeMeshingParams,
) -> Result<PathBuf> {
    let image = image.to_string_lossy();
    let request = ImageRequest {
        niipath: &image,
        maxvol: params.max_volume,
        radbound: params.radius_bound,
        distbound: params.distance_bound,
        isovalue: params.isovalue,
        imagetype: params.image_type,
        method: params.method,
    };
    let path = run.path(Artifact::NiiPath);
    write_atomic(&path, &serde_json::to_vec_pretty(&request)?)?;
    Ok(path)
}

/// Meshes the image at `image` and reconstructs the returned regions.
pub fn mesh_image(
    gateway: &mut EngineGateway,
    workdir: &WorkDir,
    image: &Path,
    params: &VolumeMeshingParams,
    unique_runs: bool,
) -> Result<Reconstruction> {
    if image.as_os_str().is_empty() {
        return Err(PhotomeshError::validation("no volume image selected"));
    }
    if !image.is_file() {
        return Err(PhotomeshError::NotFound(image.to_path_buf()));
    }
    let run = workdir.begin_run(unique_runs)?;
    gateway.enter_run(&run);
    let request = write_image_request(&run, image, params)?;
    let output = run.path(Artifact::RegionMesh);
    let doc = gateway
        .run(VOLUME_FUNCTION, &request, Some(&output))?
        .ok_or_else(|| PhotomeshError::NotFound(output.clone()))?;
    let reconstruction = region::reconstruct(&doc, REGION_PREFIX)?;
    log::info!(
        "{} produced {} region(s)",
        image.display(),
        reconstruction.regions.len()
    );
    Ok(reconstruction)
}

/// Builds the label grids of `volume` and writes them next to the run's outputs.
pub fn preview_labels(
    volume: &Volume,
    mode: GridMode,
    colormap: &str,
    registry: &ColorMapRegistry,
    run: &WorkDir,
) -> Result<(LabelGridSet, Vec<PathBuf>)> {
    let set = label_grid::build(volume, mode, colormap, registry)?;
    run.ensure()?;
    let files = set.write_files(run.root())?;
    log::debug!("wrote {} label grid file(s)", files.len());
    Ok((set, files))
}
