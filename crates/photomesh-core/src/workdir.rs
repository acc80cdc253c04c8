//! Working directory shared with the external engine.
//!
//! The engine reads its inputs from and writes its outputs to a well-known
//! directory. Output artifacts from an earlier run are removed before each new run
//! so a failed engine call can never be mistaken for a fresh result.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Result;
use crate::options::Config;

static RUN_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Prefix of intermediate label-grid files written next to the volume outputs.
pub const LABEL_GRID_PREFIX: &str = "labelgrid";

/// Well-known files exchanged with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Scene exported by the pipeline.
    BlenderMesh,
    /// Per-region surfaces returned by the mesher.
    RegionMesh,
    /// Combined volume mesh returned by the mesher.
    VolumeMesh,
    /// Selected object surfaces exported for surface processing.
    BlenderSurf,
    /// Processed surfaces returned by the engine.
    SurfaceMesh,
    /// Image path and meshing parameters for volume-image meshing.
    NiiPath,
    /// Optical properties and source configuration for the simulation.
    MmcInfo,
    /// Simulation output (log-fluence per node).
    MmcOutput,
    /// Engine-side mesh cache written by the simulation script.
    MeshData,
    /// Values returned by an engine call.
    EngineResult,
}

impl Artifact {
    /// File name of the artifact inside the working directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::BlenderMesh => "blendermesh.jmsh",
            Self::RegionMesh => "regionmesh.jmsh",
            Self::VolumeMesh => "volumemesh.jmsh",
            Self::BlenderSurf => "blendersurf.jmsh",
            Self::SurfaceMesh => "surfacemesh.jmsh",
            Self::NiiPath => "niipath.json",
            Self::MmcInfo => "mmcinfo.json",
            Self::MmcOutput => "mmcoutput.json",
            Self::MeshData => "meshdata.mat",
            Self::EngineResult => "engine_result.json",
        }
    }

    /// Whether the artifact is produced by the engine (and so must be purged before a run).
    pub fn is_engine_output(self) -> bool {
        matches!(
            self,
            Self::RegionMesh
                | Self::VolumeMesh
                | Self::SurfaceMesh
                | Self::MmcOutput
                | Self::EngineResult
        )
    }

    const ALL: [Artifact; 10] = [
        Self::BlenderMesh,
        Self::RegionMesh,
        Self::VolumeMesh,
        Self::BlenderSurf,
        Self::SurfaceMesh,
        Self::NiiPath,
        Self::MmcInfo,
        Self::MmcOutput,
        Self::MeshData,
        Self::EngineResult,
    ];
}

/// A directory holding the documents exchanged with the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    /// Uses `root` as the working directory (created lazily by [`WorkDir::ensure`]).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The per-user default: `<tmp>/iso2mesh-<user>/photomesh`.
    pub fn default_root() -> PathBuf {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "user".to_string());
        std::env::temp_dir()
            .join(format!("iso2mesh-{user}"))
            .join("photomesh")
    }

    /// Working directory configured in `config`, or the per-user default.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.work_dir.clone().unwrap_or_else(Self::default_root))
    }

    /// The directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of an artifact inside this directory.
    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.root.join(artifact.file_name())
    }

    /// Creates the directory if it does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Removes engine outputs and label-grid files left by a previous run.
    ///
    /// Returns the number of files removed.
    pub fn purge_outputs(&self) -> Result<usize> {
        if !self.root.is_dir() {
            return Ok(0);
        }
        let mut removed = 0;
        for artifact in Artifact::ALL.iter().filter(|a| a.is_engine_output()) {
            let path = self.path(*artifact);
            if path.is_file() {
                fs::remove_file(&path)?;
                log::debug!("removed stale artifact {}", path.display());
                removed += 1;
            }
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(LABEL_GRID_PREFIX) && entry.path().is_file() {
                fs::remove_file(entry.path())?;
                log::debug!("removed stale label grid {}", entry.path().display());
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Prepares a directory for a new run.
    ///
    /// With `unique`, a fresh timestamped subdirectory is created so concurrent runs
    /// never share artifacts; otherwise the root itself is reused. Either way, stale
    /// engine outputs are purged first.
    pub fn begin_run(&self, unique: bool) -> Result<WorkDir> {
        self.ensure()?;
        let run = if unique {
            let seq = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
            let stamp = chrono::Local::now().format("%Y%m%dT%H%M%S%3f");
            let dir = self
                .root
                .join(format!("run-{stamp}-{}-{seq}", std::process::id()));
            fs::create_dir_all(&dir)?;
            WorkDir::new(dir)
        } else {
            self.clone()
        };
        let purged = run.purge_outputs()?;
        if purged > 0 {
            log::info!("purged {purged} stale artifact(s) from {}", run.root.display());
        }
        Ok(run)
    }
}

/// Writes `bytes` to `path` through a temporary sibling file and a rename, so readers
/// never observe a partially written document.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp-{}", std::process::id()));
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purge_removes_only_engine_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(dir.path());
        fs::write(wd.path(Artifact::RegionMesh), "{}").unwrap();
        fs::write(wd.path(Artifact::VolumeMesh), "{}").unwrap();
        fs::write(wd.path(Artifact::BlenderMesh), "{}").unwrap();
        fs::write(dir.path().join("labelgrid_01.json"), "{}").unwrap();

        let removed = wd.purge_outputs().unwrap();
        assert_eq!(removed, 3);
        assert!(!wd.path(Artifact::RegionMesh).exists());
        assert!(!wd.path(Artifact::VolumeMesh).exists());
        assert!(wd.path(Artifact::BlenderMesh).exists());
    }

    #[test]
    fn test_begin_run_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(dir.path().join("nested").join("work"));
        let run = wd.begin_run(false).unwrap();
        assert!(run.root().is_dir());
        assert_eq!(run, wd);
    }

    #[test]
    fn test_unique_runs_get_distinct_directories() {
        let dir = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(dir.path());
        let a = wd.begin_run(true).unwrap();
        let b = wd.begin_run(true).unwrap();
        assert_ne!(a.root(), b.root());
        assert!(a.root().starts_with(dir.path()));
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.jmsh");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
