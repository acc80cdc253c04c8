use std::path::{Path, PathBuf};

use serde_json::Value;

use photomesh_core::{EngineOptions, PhotomeshError, Result, WorkDir};
use photomesh_structures::document::{self, MeshDocument};

use super::{
    is_output_count_mismatch, BackendError, EngineBackend, OutputConvention, ProcessBackend,
};

/// Session-level access to an engine backend.
///
/// The script directories are registered with the backend once, before the first
/// call of the session. A path that failed to register is retried on the next
/// call; paths already registered are not added again.
///
/// Each call is made with [`OutputConvention::Nargout`] and repeated once with
/// [`OutputConvention::Nout`] when the backend rejects the output count; no other
/// failure is retried.
pub struct EngineGateway {
    backend: Box<dyn EngineBackend>,
    search_paths: Vec<PathBuf>,
    /// Leading entries of `search_paths` the backend has accepted.
    registered: usize,
}

impl EngineGateway {
    /// Wraps `backend`, registering `search_paths` before the first call.
    pub fn new(backend: Box<dyn EngineBackend>, search_paths: Vec<PathBuf>) -> Self {
        Self {
            backend,
            search_paths,
            registered: 0,
        }
    }

    /// The process backend selected in `options`, with its scripts directory and
    /// extra package directories.
    pub fn from_options(options: &EngineOptions, workdir: &WorkDir) -> Self {
        let mut search_paths = vec![options.scripts_dir.clone()];
        search_paths.extend(options.search_paths.iter().cloned());
        Self::new(
            Box::new(ProcessBackend::from_options(options, workdir)),
            search_paths,
        )
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Directs file exchanges of the following calls into `run`.
    pub fn enter_run(&mut self, run: &WorkDir) {
        log::debug!("{} exchanging results in {}", self.backend.name(), run.root().display());
        self.backend.set_run_dir(run.root());
    }

    fn ensure_registered(&mut self) -> Result<()> {
        if self.registered == self.search_paths.len() {
            return Ok(());
        }
        while let Some(path) = self.search_paths.get(self.registered) {
            self.backend
                .add_search_path(path)
                .map_err(|e| e.into_error("addpath"))?;
            self.registered += 1;
        }
        log::debug!(
            "registered {} search path(s) with {}",
            self.search_paths.len(),
            self.backend.name()
        );
        Ok(())
    }

    /// Calls `function` and returns what it returned (`None` when
    /// `expected_outputs` is 0).
    pub fn call(
        &mut self,
        function: &str,
        args: &[Value],
        expected_outputs: usize,
    ) -> Result<Option<Value>> {
        self.ensure_registered()?;
        log::info!("calling {function} on {}", self.backend.name());
        let first = self
            .backend
            .invoke(function, args, expected_outputs, OutputConvention::Nargout);
        let result = match first {
            Err(BackendError::Execution(message)) if is_output_count_mismatch(&message) => {
                log::warn!(
                    "{function}: backend rejected the {} convention ({message}), retrying with {}",
                    OutputConvention::Nargout.name(),
                    OutputConvention::Nout.name()
                );
                self.backend
                    .invoke(function, args, expected_outputs, OutputConvention::Nout)
            }
            other => other,
        };
        result.map_err(|e| e.into_error(function))
    }

    /// Runs `function` on the document at `input`.
    ///
    /// When `output` is given, the document the function writes there is loaded
    /// and returned.
    pub fn run(
        &mut self,
        function: &str,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<Option<MeshDocument>> {
        self.call(function, &[path_arg(input)], 0)?;
        match output {
            Some(path) => {
                if !path.is_file() {
                    return Err(PhotomeshError::NotFound(path.to_path_buf()));
                }
                document::load(path).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Runs `function` on `input` and decodes the structure it returns.
    pub fn fetch_document(&mut self, function: &str, input: &Path) -> Result<MeshDocument> {
        let value = self
            .call(function, &[path_arg(input)], 1)?
            .ok_or_else(|| PhotomeshError::format(function, "engine returned no value"))?;
        document::decode(value)
    }
}

fn path_arg(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}
