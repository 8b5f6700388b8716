//! Environment provisioning: directories, files, project init, dependencies.
//!
//! Steps run in a fixed order and the first failure aborts provisioning. Nothing is
//! rolled back; the environment is disposable.

use crate::exec::{ExecRequest, ExecutionError, Executor};
use crate::model::{EnvironmentRef, Setup, DEFAULT_WORK_ROOT};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub type ProvisionResult<T> = Result<T, ProvisionError>;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ProvisionError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Exec(#[from] ExecutionError),

    #[error("setup step '{step}' exited with code {exit_code}: {stderr}")]
    #[diagnostic(code(pkgprobe::provision::step_failed))]
    StepFailed {
        step: String,
        exit_code: i32,
        stderr: String,
    },
}

/// Where and how the environment is prepared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvisionConfig {
    /// Root every scenario path is resolved against.
    pub work_root: String,
    /// Command that initializes a project manifest in the work root.
    pub init_command: Vec<String>,
    /// Install command; all dependencies are appended as one batch.
    pub install_command: Vec<String>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            work_root: DEFAULT_WORK_ROOT.to_string(),
            init_command: vec!["npm".into(), "init".into(), "-y".into()],
            install_command: vec!["npm".into(), "install".into()],
        }
    }
}

impl ProvisionConfig {
    #[must_use]
    pub fn with_work_root(mut self, work_root: impl Into<String>) -> Self {
        self.work_root = work_root.into();
        self
    }

    /// Absolute path of a scenario path inside the work root.
    #[must_use]
    pub fn resolve(&self, path: &str) -> String {
        resolve_path(&self.work_root, path)
    }
}

/// Join a scenario path onto the work root.
///
/// The path is normalized lexically: leading slashes and `.` segments are dropped and
/// `..` never climbs above the root, so every result stays inside it.
#[must_use]
pub fn resolve_path(work_root: &str, path: &str) -> String {
    let root = work_root.trim_end_matches('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    match (root.is_empty(), segments.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => root.to_string(),
        _ => format!("{root}/{}", segments.join("/")),
    }
}

fn parent_dir(path: &str) -> Option<&str> {
    path.rsplit_once('/')
        .map(|(parent, _)| parent)
        .filter(|parent| !parent.is_empty())
}

/// Script that writes `$1` verbatim to `$2`.
const WRITE_FILE_SCRIPT: &str = "printf '%s' \"$1\" > \"$2\"";

/// Applies a scenario's [`Setup`] to an environment through an [`Executor`].
pub struct Provisioner<'a, E: Executor + ?Sized> {
    executor: &'a E,
    config: &'a ProvisionConfig,
}

impl<'a, E: Executor + ?Sized> Provisioner<'a, E> {
    pub fn new(executor: &'a E, config: &'a ProvisionConfig) -> Self {
        Self { executor, config }
    }

    pub fn provision(&self, env: &EnvironmentRef, setup: &Setup) -> ProvisionResult<()> {
        for dir in &setup.directories {
            let target = self.config.resolve(dir);
            self.run(env, &format!("create directory {dir}"), mkdir(&target))?;
        }

        for file in &setup.files {
            let target = self.config.resolve(&file.path);
            if let Some(parent) = parent_dir(&target) {
                self.run(env, &format!("create parent of {}", file.path), mkdir(parent))?;
            }
            let write = ExecRequest::new([
                "sh",
                "-c",
                WRITE_FILE_SCRIPT,
                "pkgprobe-write",
                file.content.as_str(),
                target.as_str(),
            ]);
            self.run(env, &format!("write file {}", file.path), write)?;
        }

        if setup.init_project {
            let init = ExecRequest::new(self.config.init_command.iter().cloned())
                .in_dir(self.config.work_root.clone());
            self.run(env, "initialize project", init)?;
        }

        if !setup.dependencies.is_empty() {
            let install = ExecRequest::new(
                self.config
                    .install_command
                    .iter()
                    .chain(&setup.dependencies)
                    .cloned(),
            )
            .in_dir(self.config.work_root.clone());
            self.run(env, "install dependencies", install)?;
        }

        Ok(())
    }

    fn run(&self, env: &EnvironmentRef, step: &str, request: ExecRequest) -> ProvisionResult<()> {
        debug!(%env, step, argv = ?request.argv, "provisioning");
        let output = self.executor.execute(env, &request)?;
        if output.success() {
            Ok(())
        } else {
            Err(ProvisionError::StepFailed {
                step: step.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr,
            })
        }
    }
}

fn mkdir(path: &str) -> ExecRequest {
    ExecRequest::new(["mkdir", "-p", path])
}
