//! Staged geometry-preparation pipeline.
//!
//! The selected scene objects go through six ordered stages:
//! `Realize → Merge → Resolve → Tessellate → Export → RunEngine`.
//! [`Pipeline::step`] runs exactly the next stage and [`Pipeline::run_through`]
//! runs up to a requested one, so intermediate states can be previewed without
//! paying for the later, more expensive stages.
//!
//! A failing stage aborts the run with [`PhotomeshError::Stage`]. Nothing is
//! rolled back: the state as of the last completed stage stays inspectable.

mod stage;

use std::path::PathBuf;

use photomesh_core::{Artifact, Config, MeshingParams, PhotomeshError, Result, WorkDir};
use photomesh_structures::document::{self, MeshDocument};
use photomesh_structures::region::{self, Reconstruction};
use photomesh_structures::scene::{
    self, resolve_with_fallback, ExactSolver, FastSolver, IntersectionSolver, PolyMesh,
    SceneObject, WorkingObject,
};

use crate::engine::EngineGateway;

pub use stage::{Stage, StopAfter};

/// Engine function that meshes an exported scene.
pub const MESH_FUNCTION: &str = "blender2mesh";

/// Name prefix of regions reconstructed from the engine output.
pub const REGION_PREFIX: &str = "region_";

/// Provenance written into exported documents.
pub const EXPORT_COMMENT: &str = "Created by photomesh";

/// Per-run settings of the pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineConfig {
    pub meshing: MeshingParams,
    /// Give the run its own working subdirectory.
    pub unique_runs: bool,
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            meshing: config.meshing.clone(),
            unique_runs: config.unique_runs,
        }
    }
}

/// Everything the pipeline has produced so far.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    /// Working objects, as of the last completed geometry stage.
    pub objects: Vec<WorkingObject>,
    /// Which intersection solver produced the resolved geometry.
    pub solver: Option<&'static str>,
    /// The exported document and where it was written.
    pub document: Option<MeshDocument>,
    pub document_path: Option<PathBuf>,
    /// The document returned by the engine and its regions.
    pub output: Option<MeshDocument>,
    pub reconstruction: Option<Reconstruction>,
}

/// The pipeline controller.
pub struct Pipeline {
    config: PipelineConfig,
    scene: Vec<SceneObject>,
    workdir: WorkDir,
    gateway: Option<EngineGateway>,
    primary: Box<dyn IntersectionSolver>,
    fallback: Box<dyn IntersectionSolver>,
    state: PipelineState,
    completed: Option<Stage>,
}

impl Pipeline {
    /// Creates a pipeline over the selected `scene` objects.
    ///
    /// Resolution uses [`ExactSolver`] with [`FastSolver`] as fallback. Without a
    /// gateway, the run can go as far as [`Stage::Export`].
    pub fn new(scene: Vec<SceneObject>, config: PipelineConfig, workdir: WorkDir) -> Self {
        Self {
            config,
            scene,
            workdir,
            gateway: None,
            primary: Box::new(ExactSolver),
            fallback: Box::new(FastSolver::default()),
            state: PipelineState::default(),
            completed: None,
        }
    }

    #[must_use]
    pub fn with_gateway(mut self, gateway: EngineGateway) -> Self {
        self.gateway = Some(gateway);
        self
    }

    #[must_use]
    pub fn with_solvers(
        mut self,
        primary: Box<dyn IntersectionSolver>,
        fallback: Box<dyn IntersectionSolver>,
    ) -> Self {
        self.primary = primary;
        self.fallback = fallback;
        self
    }

    /// The last stage that completed.
    pub fn completed(&self) -> Option<Stage> {
        self.completed
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Gives up the pipeline, keeping what it produced.
    pub fn into_state(self) -> PipelineState {
        self.state
    }

    /// Runs the next stage.
    ///
    /// Returns the stage that ran, or `None` if every stage has completed.
    pub fn step(&mut self) -> Result<Option<Stage>> {
        let next = match self.completed {
            None => Some(Stage::Realize),
            Some(stage) => stage.next(),
        };
        let Some(stage) = next else {
            return Ok(None);
        };

        log::info!("stage {stage}: start");
        self.execute(stage).map_err(|e| {
            log::warn!("stage {stage} failed: {e}");
            e.in_stage(stage.name())
        })?;
        self.completed = Some(stage);
        log::info!("stage {stage}: done");
        Ok(Some(stage))
    }

    /// Runs stages in order until `stop` has completed.
    ///
    /// Stages that already ran are not repeated.
    pub fn run_through(&mut self, stop: impl Into<StopAfter>) -> Result<&PipelineState> {
        let last = stop.into().last_stage();
        while self.completed.map_or(true, |done| done < last) {
            if self.step()?.is_none() {
                break;
            }
        }
        Ok(&self.state)
    }

    fn execute(&mut self, stage: Stage) -> Result<()> {
        match stage {
            Stage::Realize => self.realize(),
            Stage::Merge => {
                self.state.objects = scene::merge(std::mem::take(&mut self.state.objects));
                Ok(())
            }
            Stage::Resolve => self.resolve(),
            Stage::Tessellate => {
                self.tessellate();
                Ok(())
            }
            Stage::Export => self.export(),
            Stage::RunEngine => self.run_engine(),
        }
    }

    fn realize(&mut self) -> Result<()> {
        self.state.objects = scene::realize(&self.scene)?;
        if self.state.objects.is_empty() {
            log::warn!("no mesh-like object selected");
        }
        Ok(())
    }

    fn resolve(&mut self) -> Result<()> {
        for object in &mut self.state.objects {
            let (mesh, used) =
                resolve_with_fallback(&object.mesh, self.primary.as_ref(), self.fallback.as_ref())?;
            log::debug!(
                "'{}' resolved by the {used} solver: {} -> {} faces",
                object.name,
                object.mesh.face_count(),
                mesh.face_count()
            );
            object.mesh = mesh;
            self.state.solver = Some(used);
        }
        Ok(())
    }

    fn tessellate(&mut self) {
        if !self.config.meshing.triangulate {
            log::debug!("triangulation disabled");
            return;
        }
        for object in &mut self.state.objects {
            object.mesh = scene::tessellate(&object.mesh);
        }
    }

    /// The document the export stage writes, built from the current working objects.
    pub fn export_document(&self) -> Result<MeshDocument> {
        let mut world = PolyMesh::default();
        for object in &self.state.objects {
            world.append(&object.world_mesh());
        }
        if world.is_empty() {
            return Err(PhotomeshError::validation("nothing to export: no faces"));
        }

        let m = &self.config.meshing;
        let (kind, faces) = world.face_array();
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut doc = MeshDocument::new().with_comment(format!("{EXPORT_COMMENT} on {stamp}"));
        doc.vertices = world.vertices;
        doc.push_faces(kind, faces);
        doc.params.insert("maxvol", m.max_volume);
        doc.params.insert("keepratio", m.keep_ratio);
        doc.params.insert("mergetol", m.merge_tolerance);
        doc.params.insert("dorepair", m.repair);
        doc.params.insert("tetgenopt", m.engine_flags.as_str());
        if let Some(divisor) = m.voxel_divisor {
            doc.params.insert("voxelres", divisor);
        }
        Ok(doc)
    }

    fn export(&mut self) -> Result<()> {
        let doc = self.export_document()?;
        let run = self.workdir.begin_run(self.config.unique_runs)?;
        let path = run.path(Artifact::BlenderMesh);
        document::save(&doc, &path)?;
        log::info!(
            "exported {} vertices and {} faces to {}",
            doc.vertices.len(),
            doc.face_count(),
            path.display()
        );
        self.workdir = run;
        self.state.document = Some(doc);
        self.state.document_path = Some(path);
        Ok(())
    }

    fn run_engine(&mut self) -> Result<()> {
        let input = self
            .state
            .document_path
            .clone()
            .ok_or_else(|| PhotomeshError::validation("no exported document to mesh"))?;
        let gateway = self
            .gateway
            .as_mut()
            .ok_or_else(|| PhotomeshError::Dependency("no engine backend configured".into()))?;

        let artifact = if self.config.meshing.surface_only {
            Artifact::RegionMesh
        } else {
            Artifact::VolumeMesh
        };
        gateway.enter_run(&self.workdir);
        let output_path = self.workdir.path(artifact);
        let output = gateway
            .run(MESH_FUNCTION, &input, Some(&output_path))?
            .ok_or_else(|| PhotomeshError::NotFound(output_path.clone()))?;
        let reconstruction = region::reconstruct(&output, REGION_PREFIX)?;
        log::info!(
            "engine returned {} region(s) from {}",
            reconstruction.regions.len(),
            output_path.display()
        );
        self.state.output = Some(output);
        self.state.reconstruction = Some(reconstruction);
        Ok(())
    }
}
