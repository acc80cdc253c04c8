//! Photon transport simulation on a meshed domain.
//!
//! Region optical properties and the source configuration are written to the
//! simulation input file, the engine runs the simulation, and the returned
//! per-node log-fluence is turned into vertex-weight groups.

use glam::DVec3;
use serde_json::{json, Value};

use photomesh_core::workdir::write_atomic;
use photomesh_core::{
    Artifact, OpticalProperties, PhotomeshError, Result, SimulationParams, SourceParams, WorkDir,
};
use photomesh_structures::document::{self, MeshDocument};
use photomesh_structures::region::Reconstruction;
use photomesh_structures::weights::{self, WeightGroup, DEFAULT_WEIGHT_BITS};

use crate::engine::EngineGateway;

/// Engine function that runs the simulation.
pub const SIMULATION_FUNCTION: &str = "blendermmc";

/// Field of the simulation output holding the per-node log-fluence.
pub const LOG_FLUX_FIELD: &str = "logflux";

/// Position and orientation of the light source.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub position: DVec3,
    /// Rotation quaternion `(w, x, y, z)`; the identity points along `-z`.
    pub direction: [f64; 4],
    pub params: SourceParams,
}

impl Source {
    /// A source centered above the reconstructed geometry, pointing down.
    pub fn above(reconstruction: &Reconstruction, params: SourceParams) -> Self {
        Self {
            position: reconstruction.source_position(),
            direction: [1.0, 0.0, 0.0, 0.0],
            params,
        }
    }
}

/// Everything the simulation engine needs besides the mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSetup {
    /// One row per region, in region order.
    pub optics: Vec<OpticalProperties>,
    pub source: Source,
    pub params: SimulationParams,
}

impl SimulationSetup {
    /// Takes each region's optical properties (defaults where unset) and places
    /// the source above the geometry.
    pub fn from_reconstruction(
        reconstruction: &Reconstruction,
        source: SourceParams,
        params: SimulationParams,
    ) -> Self {
        Self {
            optics: reconstruction
                .regions
                .iter()
                .map(|r| r.optics.unwrap_or_default())
                .collect(),
            source: Source::above(reconstruction, source),
            params,
        }
    }

    /// The simulation input document: `{prop: [[mua, mus, g, n], ...], cfg: {...}}`.
    pub fn to_json(&self) -> Value {
        let p = &self.params;
        let s = &self.source;
        let prop: Vec<[f64; 4]> = self.optics.iter().map(OpticalProperties::as_row).collect();
        json!({
            "prop": prop,
            "cfg": {
                "srctype": s.params.source_type,
                "srcpos": s.position.to_array(),
                "srcdir": s.direction,
                "srcparam1": s.params.param1,
                "srcparam2": s.params.param2,
                "nphoton": p.photons,
                "unitinmm": s.params.unit_in_mm,
                "tend": p.time_end,
                "tstep": p.time_step,
                "isreflect": p.reflect,
                "isnormalized": p.normalize,
                "method": p.method,
                "outputtype": p.output_type,
                "basisorder": p.basis_order,
                "debuglevel": p.debug_level,
                "gpuid": p.gpu_id,
            }
        })
    }
}

/// The simulated mesh and its weight groups.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub mesh: MeshDocument,
    pub weights: Vec<WeightGroup>,
}

/// Runs the simulation and loads its results.
pub fn run(
    gateway: &mut EngineGateway,
    workdir: &WorkDir,
    setup: &SimulationSetup,
    unique_runs: bool,
) -> Result<SimulationResult> {
    if setup.optics.is_empty() {
        return Err(PhotomeshError::validation("no region to simulate"));
    }
    let run = workdir.begin_run(unique_runs)?;
    gateway.enter_run(&run);
    let input = run.path(Artifact::MmcInfo);
    write_atomic(&input, &serde_json::to_vec_pretty(&setup.to_json())?)?;

    let args = [input, run.path(Artifact::MeshData)]
        .map(|p| Value::String(p.to_string_lossy().into_owned()));
    gateway.call(SIMULATION_FUNCTION, &args, 0)?;

    let mesh_path = run.path(Artifact::VolumeMesh);
    if !mesh_path.is_file() {
        return Err(PhotomeshError::NotFound(mesh_path));
    }
    let mesh = document::load(&mesh_path)?;
    let values = load_log_flux(&run.path(Artifact::MmcOutput))?;
    if values.len() != mesh.vertices.len() {
        return Err(PhotomeshError::validation(format!(
            "simulation returned {} values for {} mesh nodes",
            values.len(),
            mesh.vertices.len()
        )));
    }
    let weights = weights::quantize(&values, DEFAULT_WEIGHT_BITS)?;
    log::info!(
        "simulation finished: {} nodes in {} weight level(s)",
        values.len(),
        weights.len()
    );
    Ok(SimulationResult { mesh, weights })
}

/// Reads the per-node log-fluence; `null` entries (engine NaN) become NaN.
pub fn load_log_flux(path: &std::path::Path) -> Result<Vec<f64>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PhotomeshError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| PhotomeshError::format(path.display().to_string(), e.to_string()))?;
    let field = value
        .get(LOG_FLUX_FIELD)
        .ok_or_else(|| PhotomeshError::format(LOG_FLUX_FIELD, "missing"))?;
    let mut out = Vec::new();
    flatten(field, &mut out)?;
    Ok(out)
}

fn flatten(value: &Value, out: &mut Vec<f64>) -> Result<()> {
    match value {
        Value::Number(n) => out.push(n.as_f64().unwrap_or(f64::NAN)),
        Value::Null => out.push(f64::NAN),
        Value::Array(items) => {
            for item in items {
                flatten(item, out)?;
            }
        }
        Value::Object(map) if map.contains_key("_ArrayData_") => {
            flatten(&map["_ArrayData_"], out)?;
        }
        other => {
            return Err(PhotomeshError::format(
                LOG_FLUX_FIELD,
                format!("expected numbers, found {other}"),
            ))
        }
    }
    Ok(())
}
