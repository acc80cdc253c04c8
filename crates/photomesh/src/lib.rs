//! photomesh: mesh and volume exchange between a 3D scene and an external
//! meshing/simulation engine.
//!
//! # Quick Start
//!
//! ```no_run
//! use photomesh::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let config = Config::default();
//!     let workdir = WorkDir::from_config(&config);
//!     let scene = vec![
//!         SceneObject::new("Cube", ObjectData::Primitive(Primitive::cube())),
//!         SceneObject::new("Sphere", ObjectData::Primitive(Primitive::uv_sphere(0.8)))
//!             .with_translation(DVec3::new(1.0, 0.0, 0.0)),
//!     ];
//!
//!     let gateway = EngineGateway::from_options(&config.engine, &workdir);
//!     let mut pipeline = Pipeline::new(scene, PipelineConfig::from(&config), workdir)
//!         .with_gateway(gateway);
//!     let state = pipeline.run_through(StopAfter::All)?;
//!     for region in &state.reconstruction.as_ref().unwrap().regions {
//!         println!("{}: {} faces", region.name, region.faces.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`pipeline`]: the staged controller (`Realize → Merge → Resolve →
//!   Tessellate → Export → RunEngine`)
//! - [`engine`]: backends for the external engine and the session gateway
//! - [`workflow`]: volume-image meshing, surface processing and simulation
//!
//! Documents, regions, label grids and scene geometry live in
//! `photomesh-structures`; errors and configuration in `photomesh-core`.

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod engine;
pub mod pipeline;
pub mod workflow;

// Re-export core types
pub use photomesh_core::{
    BackendKind, BoundingBox, Config, DMat4, DVec3, EngineOptions, MeshingParams,
    OpticalProperties, PhotomeshError, Result, SimulationParams, SourceParams,
    VolumeMeshingParams, WorkDir,
};

// Re-export render types
pub use photomesh_render::{ColorMap, ColorMapRegistry, GridMaterial};

// Re-export structures
pub use photomesh_structures::{
    FaceArray, FaceKind, GridMode, LabelGridSet, MeshDocument, ObjectData, PolyMesh, Primitive,
    Reconstruction, Region, SceneObject, Volume, WorkingObject,
};

pub use engine::{EngineBackend, EngineGateway, ProcessBackend};
pub use pipeline::{Pipeline, PipelineConfig, PipelineState, Stage, StopAfter};

/// Initializes `env_logger` from `RUST_LOG`.
///
/// Safe to call more than once; later calls do nothing.
pub fn init_logging() {
    if env_logger::try_init().is_ok() {
        log::debug!("photomesh {} logging initialized", env!("CARGO_PKG_VERSION"));
    }
}
