//! External engine access.
//!
//! The meshing and simulation scripts run inside an external numerical engine
//! (GNU Octave or MATLAB). [`EngineBackend`] is the small capability interface
//! every engine offers; [`EngineGateway`] adds session setup and the single
//! output-count retry on top of it.

mod gateway;
mod process;

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use photomesh_core::PhotomeshError;

pub use gateway::EngineGateway;
pub use process::{ProcessBackend, ProcessFlavor};

/// How the number of expected return values is passed to the engine.
///
/// Engine bindings of different generations disagree on this, see
/// [`is_output_count_mismatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputConvention {
    /// Return values are bound explicitly (`[r1, ..., rn] = f(...)`).
    Nargout,
    /// The function is called as a statement and its value collected afterwards.
    Nout,
}

impl OutputConvention {
    pub fn name(self) -> &'static str {
        match self {
            Self::Nargout => "nargout",
            Self::Nout => "nout",
        }
    }
}

/// Failure reported by a backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The engine (or a module it needs) is not installed.
    #[error("{0} is not available")]
    Unavailable(String),

    /// The engine ran and reported an error.
    #[error("{0}")]
    Execution(String),

    /// The engine did not finish in time and was stopped.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

impl BackendError {
    /// Converts to the crate error, naming the engine function that failed.
    pub fn into_error(self, function: &str) -> PhotomeshError {
        match self {
            Self::Unavailable(what) => PhotomeshError::Dependency(what),
            Self::Execution(message) => PhotomeshError::EngineExecution {
                function: function.to_string(),
                message,
            },
            Self::TimedOut(timeout) => PhotomeshError::TimedOut {
                function: function.to_string(),
                timeout,
            },
        }
    }
}

/// Message fragment engines report when more return values were requested than
/// the binding supports.
pub const OUTPUT_COUNT_MISMATCH: &str = "too many outputs";

/// Compatibility shim: whether an execution error means the call should be
/// repeated with [`OutputConvention::Nout`].
///
/// Older engine bindings reject the `nargout` convention with this message.
/// Remove once no supported backend reports it.
pub fn is_output_count_mismatch(message: &str) -> bool {
    message.to_ascii_lowercase().contains(OUTPUT_COUNT_MISMATCH)
}

/// An external engine able to run named functions.
pub trait EngineBackend {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Adds a directory to the engine's function search path.
    fn add_search_path(&mut self, path: &Path) -> Result<(), BackendError>;

    /// Points the backend at the directory of the current run. Backends that
    /// exchange results through files keep them there.
    fn set_run_dir(&mut self, _dir: &Path) {}

    /// Calls `function` with positional `args`.
    ///
    /// Returns the single return value, an array of them when
    /// `expected_outputs > 1`, or `None` when no output is expected.
    fn invoke(
        &mut self,
        function: &str,
        args: &[Value],
        expected_outputs: usize,
        convention: OutputConvention,
    ) -> Result<Option<Value>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_count_mismatch_predicate() {
        assert!(is_output_count_mismatch("error: feval: function called with too many outputs"));
        assert!(is_output_count_mismatch("Too Many Outputs requested"));
        assert!(!is_output_count_mismatch("too many inputs"));
        assert!(!is_output_count_mismatch(""));
    }

    #[test]
    fn test_backend_error_mapping() {
        assert!(matches!(
            BackendError::Unavailable("octave".into()).into_error("blender2mesh"),
            PhotomeshError::Dependency(what) if what == "octave"
        ));
        match BackendError::Execution("boom".into()).into_error("nii2mesh") {
            PhotomeshError::EngineExecution { function, message } => {
                assert_eq!(function, "nii2mesh");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            BackendError::TimedOut(Duration::from_secs(3)).into_error("blendermmc"),
            PhotomeshError::TimedOut { .. }
        ));
    }
}
