//! Engines driven as child processes.

use std::fmt::Write as _;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

use photomesh_core::{Artifact, BackendKind, EngineOptions, WorkDir};

use super::{BackendError, EngineBackend, OutputConvention};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Command-line flavor of the engine executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessFlavor {
    /// `octave --no-gui --quiet --eval <script>`
    Octave,
    /// `matlab -batch <script>`
    Matlab,
}

impl ProcessFlavor {
    fn args(self, script: String) -> Vec<String> {
        match self {
            Self::Octave => vec![
                "--no-gui".to_string(),
                "--quiet".to_string(),
                "--eval".to_string(),
                script,
            ],
            Self::Matlab => vec!["-batch".to_string(), script],
        }
    }
}

impl From<BackendKind> for ProcessFlavor {
    fn from(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Octave => Self::Octave,
            BackendKind::Matlab => Self::Matlab,
        }
    }
}

/// Runs each engine call as a fresh engine process.
///
/// The search path is replayed at the start of every script, and return values
/// come back as JSON through a result file in the working directory.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    flavor: ProcessFlavor,
    program: PathBuf,
    search_paths: Vec<PathBuf>,
    result_path: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessBackend {
    /// Creates a backend using the flavor's default executable on `PATH`.
    pub fn new(flavor: ProcessFlavor, result_path: impl Into<PathBuf>) -> Self {
        let program = match flavor {
            ProcessFlavor::Octave => BackendKind::Octave.default_program(),
            ProcessFlavor::Matlab => BackendKind::Matlab.default_program(),
        };
        Self {
            flavor,
            program: PathBuf::from(program),
            search_paths: Vec::new(),
            result_path: result_path.into(),
            timeout: None,
        }
    }

    /// Creates the backend selected in `options`, exchanging results through `workdir`.
    pub fn from_options(options: &EngineOptions, workdir: &WorkDir) -> Self {
        let mut backend = Self::new(options.backend.into(), workdir.path(Artifact::EngineResult));
        if let Some(program) = &options.program {
            backend.program = program.clone();
        }
        backend.timeout = options.timeout();
        backend
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Where the engine writes the return values of the next call.
    pub fn result_path(&self) -> &Path {
        &self.result_path
    }

    /// Renders the engine script for one call.
    pub fn render_script(
        &self,
        function: &str,
        args: &[Value],
        expected_outputs: usize,
        convention: OutputConvention,
    ) -> Result<String, BackendError> {
        let mut script = String::new();
        for dir in &self.search_paths {
            let _ = writeln!(script, "addpath({});", quote(&dir.to_string_lossy()));
        }

        let mut call = format!("feval({}", quote(function));
        for arg in args {
            call.push_str(", ");
            call.push_str(&literal(arg)?);
        }
        call.push(')');

        script.push_str("try\n");
        let results = if expected_outputs == 0 {
            let _ = writeln!(script, "  {call};");
            None
        } else {
            match convention {
                OutputConvention::Nargout => {
                    let names: Vec<String> =
                        (1..=expected_outputs).map(|i| format!("r{i}")).collect();
                    let _ = writeln!(script, "  [{}] = {call};", names.join(", "));
                    Some(format!("{{{}}}", names.join(", ")))
                }
                OutputConvention::Nout => {
                    let _ = writeln!(script, "  r = cell(1, {expected_outputs});");
                    let _ = writeln!(script, "  [r{{1:{expected_outputs}}}] = {call};");
                    Some("r".to_string())
                }
            }
        };
        if let Some(results) = results {
            let path = quote(&self.result_path.to_string_lossy());
            let _ = writeln!(script, "  fid = fopen({path}, 'w');");
            let _ = writeln!(script, "  fputs(fid, jsonencode({results}));");
            script.push_str("  fclose(fid);\n");
        }
        script.push_str("catch err\n");
        script.push_str("  fprintf(2, '%s\\n', err.message);\n");
        script.push_str("  exit(1);\n");
        script.push_str("end\n");
        Ok(script)
    }

    fn spawn(&self, script: String) -> Result<Child, BackendError> {
        Command::new(&self.program)
            .args(self.flavor.args(script))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                    BackendError::Unavailable(self.program.display().to_string())
                }
                _ => BackendError::Execution(format!(
                    "failed to start {}: {e}",
                    self.program.display()
                )),
            })
    }

    fn read_result(&self, expected_outputs: usize) -> Result<Value, BackendError> {
        let text = std::fs::read_to_string(&self.result_path).map_err(|e| {
            BackendError::Execution(format!(
                "engine produced no result file {}: {e}",
                self.result_path.display()
            ))
        })?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| BackendError::Execution(format!("malformed engine result: {e}")))?;
        Ok(match (expected_outputs, value) {
            (1, Value::Array(mut items)) if items.len() == 1 => items.remove(0),
            (_, value) => value,
        })
    }
}

impl EngineBackend for ProcessBackend {
    fn name(&self) -> &str {
        match self.flavor {
            ProcessFlavor::Octave => "octave",
            ProcessFlavor::Matlab => "matlab",
        }
    }

    fn add_search_path(&mut self, path: &Path) -> Result<(), BackendError> {
        if !self.search_paths.iter().any(|p| p == path) {
            self.search_paths.push(path.to_path_buf());
        }
        Ok(())
    }

    fn set_run_dir(&mut self, dir: &Path) {
        self.result_path = dir.join(Artifact::EngineResult.file_name());
    }

    fn invoke(
        &mut self,
        function: &str,
        args: &[Value],
        expected_outputs: usize,
        convention: OutputConvention,
    ) -> Result<Option<Value>, BackendError> {
        let script = self.render_script(function, args, expected_outputs, convention)?;
        if expected_outputs > 0 && self.result_path.exists() {
            std::fs::remove_file(&self.result_path)
                .map_err(|e| BackendError::Execution(e.to_string()))?;
        }

        log::debug!(
            "{} {function} ({} output(s), {})",
            self.program.display(),
            expected_outputs,
            convention.name()
        );
        let child = self.spawn(script)?;
        let output = wait_with_timeout(child, self.timeout)?;
        if !output.success {
            let message = output.stderr.trim();
            return Err(BackendError::Execution(if message.is_empty() {
                format!("{function} exited with {}", output.status)
            } else {
                message.to_string()
            }));
        }

        if expected_outputs == 0 {
            Ok(None)
        } else {
            self.read_result(expected_outputs).map(Some)
        }
    }
}

struct Finished {
    success: bool,
    status: String,
    stderr: String,
}

fn drain(pipe: Option<impl Read + Send + 'static>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut text);
        }
        text
    })
}

/// Waits for `child`, killing it once `timeout` has elapsed.
fn wait_with_timeout(mut child: Child, timeout: Option<Duration>) -> Result<Finished, BackendError> {
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let started = Instant::now();

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => return Err(BackendError::Execution(e.to_string())),
        }
        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BackendError::TimedOut(limit));
            }
        }
        thread::sleep(POLL_INTERVAL);
    };

    let out = stdout.join().unwrap_or_default();
    if !out.trim().is_empty() {
        log::debug!("engine output:\n{}", out.trim_end());
    }
    Ok(Finished {
        success: status.success(),
        status: status.to_string(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

/// Single-quoted engine string literal.
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Engine literal for a JSON argument.
fn literal(value: &Value) -> Result<String, BackendError> {
    Ok(match value {
        Value::Null => "[]".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if !s.contains(['\n', '\r']) => quote(s),
        Value::Array(items) if items.iter().all(Value::is_number) => {
            let items: Vec<String> = items.iter().map(ToString::to_string).collect();
            format!("[{}]", items.join(", "))
        }
        other => {
            let json = serde_json::to_string(other)
                .map_err(|e| BackendError::Execution(format!("cannot encode argument: {e}")))?;
            format!("jsondecode({})", quote(&json))
        }
    })
}
