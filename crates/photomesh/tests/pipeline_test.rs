//! End-to-end pipeline runs against a scripted engine backend.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use photomesh::engine::{BackendError, OutputConvention};
use photomesh::pipeline::MESH_FUNCTION;
use photomesh::*;
use photomesh_structures::document::{self, FaceArray};
use photomesh_structures::scene::{IntersectionSolver, ResolveError};

/// Stands in for the meshing engine: reads the exported document and writes a
/// surface array plus a one-tetrahedron array next to it.
struct FakeMesher {
    calls: Arc<Mutex<Vec<OutputConvention>>>,
    run_dirs: Arc<Mutex<Vec<PathBuf>>>,
    reject_nargout: bool,
}

impl EngineBackend for FakeMesher {
    fn name(&self) -> &str {
        "fake-mesher"
    }

    fn add_search_path(&mut self, _path: &Path) -> std::result::Result<(), BackendError> {
        Ok(())
    }

    fn set_run_dir(&mut self, dir: &Path) {
        self.run_dirs.lock().unwrap().push(dir.to_path_buf());
    }

    fn invoke(
        &mut self,
        function: &str,
        args: &[Value],
        _expected_outputs: usize,
        convention: OutputConvention,
    ) -> std::result::Result<Option<Value>, BackendError> {
        self.calls.lock().unwrap().push(convention);
        if self.reject_nargout && convention == OutputConvention::Nargout {
            return Err(BackendError::Execution(
                "error: blender2mesh: function called with too many outputs".into(),
            ));
        }
        assert_eq!(function, MESH_FUNCTION);
        let input = PathBuf::from(args[0].as_str().unwrap());
        let exported = document::load(&input).map_err(|e| BackendError::Execution(e.to_string()))?;

        let mut out = MeshDocument::new();
        out.vertices = exported.vertices.clone();
        out.faces = exported.faces.clone();
        out.push_faces(FaceKind::Tet4, FaceArray::from_rows(&[[0u32, 1, 2, 3]]));
        document::save(&out, &input.with_file_name("volumemesh.jmsh"))
            .map_err(|e| BackendError::Execution(e.to_string()))?;
        Ok(None)
    }
}

fn scene() -> Vec<SceneObject> {
    vec![
        SceneObject::new("Cube", ObjectData::Primitive(Primitive::cube())),
        SceneObject::new("Cube.001", ObjectData::Primitive(Primitive::cube()))
            .with_translation(DVec3::new(1.0, 0.3, 0.2)),
        SceneObject::new("Light", ObjectData::Light),
    ]
}

fn gateway(reject_nargout: bool) -> (EngineGateway, Arc<Mutex<Vec<OutputConvention>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let backend = FakeMesher {
        calls: Arc::clone(&calls),
        run_dirs: Arc::default(),
        reject_nargout,
    };
    (
        EngineGateway::new(Box::new(backend), vec![PathBuf::from("script")]),
        calls,
    )
}

fn recording_gateway(run_dirs: &Arc<Mutex<Vec<PathBuf>>>) -> EngineGateway {
    let backend = FakeMesher {
        calls: Arc::default(),
        run_dirs: Arc::clone(run_dirs),
        reject_nargout: false,
    };
    EngineGateway::new(Box::new(backend), Vec::new())
}

#[test]
fn test_full_run_reconstructs_regions() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let (gw, calls) = gateway(false);
    let mut pipeline = Pipeline::new(scene(), PipelineConfig::default(), WorkDir::new(dir.path()))
        .with_gateway(gw);

    let state = pipeline.run_through(StopAfter::All).unwrap();
    let reconstruction = state.reconstruction.as_ref().unwrap();
    assert_eq!(reconstruction.regions.len(), 2);
    assert_eq!(reconstruction.regions[0].name, "region_1");
    assert_eq!(reconstruction.regions[1].kind, FaceKind::Tet4);
    for region in &reconstruction.regions {
        let n = u32::try_from(region.vertices.len()).unwrap();
        assert!(region.faces.indices().all(|i| i < n));
    }
    assert!(!reconstruction.bounds.is_empty());
    assert_eq!(pipeline.completed(), Some(Stage::RunEngine));
    assert_eq!(*calls.lock().unwrap(), vec![OutputConvention::Nargout]);

    // Nothing left to run.
    assert_eq!(pipeline.step().unwrap(), None);
}

#[test]
fn test_full_run_survives_output_convention_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let (gw, calls) = gateway(true);
    let mut pipeline = Pipeline::new(scene(), PipelineConfig::default(), WorkDir::new(dir.path()))
        .with_gateway(gw);
    let state = pipeline.run_through(StopAfter::All).unwrap();
    assert_eq!(state.reconstruction.as_ref().unwrap().regions.len(), 2);
    assert_eq!(
        *calls.lock().unwrap(),
        vec![OutputConvention::Nargout, OutputConvention::Nout]
    );
}

#[test]
fn test_stale_output_never_read() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("volumemesh.jmsh"), "{\"stale\": true}").unwrap();

    // An engine that "succeeds" without writing anything.
    struct Silent;
    impl EngineBackend for Silent {
        fn name(&self) -> &str {
            "silent"
        }
        fn add_search_path(&mut self, _: &Path) -> std::result::Result<(), BackendError> {
            Ok(())
        }
        fn invoke(
            &mut self,
            _: &str,
            _: &[Value],
            _: usize,
            _: OutputConvention,
        ) -> std::result::Result<Option<Value>, BackendError> {
            Ok(None)
        }
    }

    let mut pipeline = Pipeline::new(scene(), PipelineConfig::default(), WorkDir::new(dir.path()))
        .with_gateway(EngineGateway::new(Box::new(Silent), Vec::new()));
    let err = pipeline.run_through(StopAfter::All).unwrap_err();
    assert_eq!(err.stage(), Some("run-engine"));
    assert!(matches!(err.root_cause(), PhotomeshError::NotFound(_)));
}

struct Unavailable;

impl IntersectionSolver for Unavailable {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn resolve(&self, _mesh: &PolyMesh) -> std::result::Result<PolyMesh, ResolveError> {
        Err(ResolveError::Unavailable("simulated".into()))
    }
}

#[test]
fn test_resolve_falls_back_when_exact_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = Pipeline::new(scene(), PipelineConfig::default(), WorkDir::new(dir.path()))
        .with_solvers(
            Box::new(Unavailable),
            Box::new(photomesh_structures::FastSolver::default()),
        );
    let state = pipeline.run_through(Stage::Resolve).unwrap();
    assert_eq!(state.solver, Some("fast"));
    assert_eq!(state.objects.len(), 1);
    assert!(state.objects[0].mesh.face_count() > 12);
}

#[test]
fn test_triangulation_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let single = vec![SceneObject::new("Cube", ObjectData::Primitive(Primitive::cube()))];
    let config = PipelineConfig {
        meshing: MeshingParams {
            triangulate: false,
            ..MeshingParams::default()
        },
        unique_runs: false,
    };
    let mut pipeline = Pipeline::new(single, config, WorkDir::new(dir.path()));
    pipeline.run_through(Stage::Export).unwrap();
    let doc = document::load(dir.path().join("blendermesh.jmsh")).unwrap();
    assert_eq!(doc.faces[0].0.kind, FaceKind::Poly);
    assert_eq!(doc.face_count(), 6);
}

#[test]
fn test_unique_runs_use_fresh_directories() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        unique_runs: true,
        ..PipelineConfig::default()
    };
    let mut first = Pipeline::new(scene(), config.clone(), WorkDir::new(dir.path()));
    let mut second = Pipeline::new(scene(), config, WorkDir::new(dir.path()));
    first.run_through(Stage::Export).unwrap();
    second.run_through(Stage::Export).unwrap();
    let a = first.state().document_path.clone().unwrap();
    let b = second.state().document_path.clone().unwrap();
    assert_ne!(a, b);
    assert!(a.is_file() && b.is_file());
}

#[test]
fn test_unique_runs_exchange_results_in_their_own_directory() {
    let dir = tempfile::tempdir().unwrap();
    let run_dirs = Arc::new(Mutex::new(Vec::new()));
    let config = PipelineConfig {
        unique_runs: true,
        ..PipelineConfig::default()
    };
    let mut documents = Vec::new();
    for _ in 0..2 {
        let mut pipeline = Pipeline::new(scene(), config.clone(), WorkDir::new(dir.path()))
            .with_gateway(recording_gateway(&run_dirs));
        let state = pipeline.run_through(StopAfter::All).unwrap();
        documents.push(state.document_path.clone().unwrap());
    }

    let run_dirs = run_dirs.lock().unwrap();
    assert_eq!(run_dirs.len(), 2);
    assert_ne!(run_dirs[0], run_dirs[1]);
    for (run_dir, document) in run_dirs.iter().zip(&documents) {
        assert_eq!(Some(run_dir.as_path()), document.parent());
        assert_ne!(run_dir.as_path(), dir.path());
    }
}
