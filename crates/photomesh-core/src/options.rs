//! Configuration options for photomesh.
//!
//! Every run receives its parameters explicitly through these structs; there is no
//! process-wide default state. The UI layer (out of scope) fills them in.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PhotomeshError, Result};

/// Parameters for converting a scene into a tetrahedral mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshingParams {
    /// Maximum tetrahedron volume.
    pub max_volume: f64,
    /// Fraction of surface edges kept during simplification (0-1).
    pub keep_ratio: f64,
    /// Tolerance to merge nodes (0 to disable).
    pub merge_tolerance: f64,
    /// Repair the surface before meshing (single object only).
    pub repair: bool,
    /// Return the triangular surface mesh only (no tetrahedral mesh).
    pub surface_only: bool,
    /// Convert quads and n-gons to triangles before export.
    pub triangulate: bool,
    /// Additional flags passed verbatim to the tetrahedral mesher.
    pub engine_flags: String,
    /// Optional voxel-grid resolution divisor for voxel-based meshing.
    pub voxel_divisor: Option<f64>,
}

impl Default for MeshingParams {
    fn default() -> Self {
        Self {
            max_volume: 1.0,
            keep_ratio: 1.0,
            merge_tolerance: 0.0,
            repair: false,
            surface_only: false,
            triangulate: true,
            engine_flags: String::new(),
            voxel_divisor: None,
        }
    }
}

/// Kind of volumetric image being meshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ImageType {
    /// Integer labels, one region per label.
    #[default]
    MultiLabel,
    /// A single foreground/background mask.
    Binary,
    /// Continuous intensities, thresholded at the isovalue.
    Grayscale,
}

/// Surface extraction method for volumetric images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceExtraction {
    #[default]
    Auto,
    CgalMesh,
    CgalSurf,
    Simplify,
}

/// Parameters for converting a 3-D image into a mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeMeshingParams {
    /// Maximum tetrahedron volume.
    pub max_volume: f64,
    /// Maximum surface triangle diameter.
    pub radius_bound: f64,
    /// Maximum deviation from the true boundary.
    pub distance_bound: f64,
    /// Isovalue used to create the surface.
    pub isovalue: f64,
    pub image_type: ImageType,
    pub method: SurfaceExtraction,
}

impl Default for VolumeMeshingParams {
    fn default() -> Self {
        Self {
            max_volume: 100.0,
            radius_bound: 10.0,
            distance_bound: 1.0,
            isovalue: 0.5,
            image_type: ImageType::MultiLabel,
            method: SurfaceExtraction::Auto,
        }
    }
}

/// Parameters for a mesh-based Monte Carlo photon simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Number of photons to launch.
    pub photons: f64,
    /// Time gate width (s).
    pub time_end: f64,
    /// Time gate step (s).
    pub time_step: f64,
    /// Whether photons reflect at refractive index mismatches.
    pub reflect: bool,
    /// Whether the output is normalized.
    pub normalize: bool,
    /// Basis order (0 or 1).
    pub basis_order: u32,
    /// Ray tracer (`elem` or `grid`).
    pub method: String,
    /// Output quantity (`flux`, `fluence` or `energy`).
    pub output_type: String,
    /// GPU id mask, `-1` for CPU.
    pub gpu_id: String,
    /// Debug flags.
    pub debug_level: String,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            photons: 10000.0,
            time_end: 5e-9,
            time_step: 5e-9,
            reflect: true,
            normalize: true,
            basis_order: 1,
            method: "elem".to_string(),
            output_type: "flux".to_string(),
            gpu_id: "1".to_string(),
            debug_level: "TP".to_string(),
        }
    }
}

/// Light source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceParams {
    /// Source type (`pencil`, `disk`, ...).
    pub source_type: String,
    pub param1: [f64; 4],
    pub param2: [f64; 4],
    pub photons: u64,
    /// Length unit of the mesh in millimetres.
    pub unit_in_mm: f64,
}

impl Default for SourceParams {
    fn default() -> Self {
        Self {
            source_type: "pencil".to_string(),
            param1: [0.0; 4],
            param2: [0.0; 4],
            photons: 10000,
            unit_in_mm: 1.0,
        }
    }
}

/// Which external engine runs the meshing and simulation scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// GNU Octave.
    #[default]
    Octave,
    /// MATLAB.
    Matlab,
}

impl BackendKind {
    /// Default executable name for this backend.
    pub fn default_program(self) -> &'static str {
        match self {
            Self::Octave => "octave",
            Self::Matlab => "matlab",
        }
    }
}

/// Options for the external engine gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub backend: BackendKind,
    /// Overrides the backend executable (defaults to `octave` / `matlab` on `PATH`).
    pub program: Option<PathBuf>,
    /// Directory holding the postprocessing scripts, registered before the first call.
    pub scripts_dir: PathBuf,
    /// Additional directories (installed toolboxes) added to the engine search path.
    pub search_paths: Vec<PathBuf>,
    /// Wall-clock limit for a single engine call, in seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            backend: BackendKind::Octave,
            program: None,
            scripts_dir: PathBuf::from("script"),
            search_paths: Vec::new(),
            timeout_secs: None,
        }
    }
}

impl EngineOptions {
    /// The configured timeout as a [`Duration`].
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Top-level configuration for a photomesh session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Root of the working directory; defaults to a per-user temp folder.
    pub work_dir: Option<PathBuf>,
    /// Give each run its own subdirectory instead of sharing the root.
    pub unique_runs: bool,
    pub engine: EngineOptions,
    pub meshing: MeshingParams,
    pub volume: VolumeMeshingParams,
    pub simulation: SimulationParams,
    pub source: SourceParams,
}

impl Config {
    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PhotomeshError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text)
            .map_err(|e| PhotomeshError::format(path.display().to_string(), e.to_string()))
    }
}
