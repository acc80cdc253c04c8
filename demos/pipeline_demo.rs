//! Demo of the staged meshing pipeline.
//!
//! Builds two overlapping cubes and a sphere, runs the pipeline through export
//! and prints what each stage produced. With `--engine` the exported document
//! is also meshed by the engine configured in `photomesh.json` (or GNU Octave
//! on the `PATH`) and the returned regions are listed.
//!
//! A label-grid preview of a small synthetic volume is written alongside.

use std::path::Path;

use glam::DMat4;
use photomesh::workflow::volume;
use photomesh::*;

fn scene() -> Vec<SceneObject> {
    vec![
        SceneObject::new("Cube", ObjectData::Primitive(Primitive::cube())),
        SceneObject::new("Cube.001", ObjectData::Primitive(Primitive::cube()))
            .with_translation(DVec3::new(1.0, 0.3, 0.2)),
        SceneObject::new("Sphere", ObjectData::Primitive(Primitive::uv_sphere(0.6)))
            .with_translation(DVec3::new(-3.0, 0.0, 0.0)),
        SceneObject::new("Camera", ObjectData::Camera),
    ]
}

/// A 4x4x2 volume with three labels.
fn phantom() -> Result<Volume> {
    let data = (0..32)
        .map(|i| match i % 16 {
            0..=5 => 0.0,
            6..=11 => 1.0,
            _ => 2.0,
        })
        .collect();
    Volume::new([4, 4, 2], data, DMat4::IDENTITY)
}

fn main() -> Result<()> {
    init_logging();

    let with_engine = std::env::args().any(|a| a == "--engine");
    let config = if Path::new("photomesh.json").is_file() {
        Config::load("photomesh.json")?
    } else {
        Config::default()
    };
    let workdir = WorkDir::from_config(&config);
    println!("working directory: {}", workdir.root().display());

    let mut pipeline = Pipeline::new(scene(), PipelineConfig::from(&config), workdir.clone());
    if with_engine {
        pipeline = pipeline.with_gateway(EngineGateway::from_options(&config.engine, &workdir));
    }

    while let Some(stage) = pipeline.step()? {
        let state = pipeline.state();
        let faces: usize = state.objects.iter().map(|o| o.mesh.face_count()).sum();
        println!(
            "{}. {:<10} objects: {}, faces: {faces}",
            stage.number(),
            stage.name(),
            state.objects.len()
        );
        if stage == Stage::Resolve {
            println!("   intersections resolved by the {} solver", state.solver.unwrap_or("-"));
        }
        if stage == Stage::Export {
            if let Some(path) = &state.document_path {
                println!("   wrote {}", path.display());
            }
            if !with_engine {
                break;
            }
        }
    }

    if let Some(reconstruction) = &pipeline.state().reconstruction {
        for region in &reconstruction.regions {
            println!(
                "{}: {} {} element(s) over {} vertices",
                region.name,
                region.faces.len(),
                region.kind.name(),
                region.vertices.len()
            );
        }
    }

    let (grids, files) = volume::preview_labels(
        &phantom()?,
        GridMode::Labels,
        "jet",
        &ColorMapRegistry::new(),
        &workdir,
    )?;
    for (grid, file) in grids.grids.iter().zip(&files) {
        println!("{}: {} voxel(s) -> {}", grid.name, grid.len(), file.display());
    }
    Ok(())
}
