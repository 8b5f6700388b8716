//! Host-process executor.

use super::{ExecRequest, ExecResult, ExecutionError, Executor};
use crate::model::{EnvironmentRef, ExecOutput};
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

/// Runs commands directly on the host.
///
/// Only accepts [`EnvironmentRef::local`]; any other reference is reported as an
/// invalid environment so a container handle is never silently run on the host.
#[derive(Clone, Debug, Default)]
pub struct LocalExecutor {
    env: Vec<(String, String)>,
}

impl LocalExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable to every spawned command.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl Executor for LocalExecutor {
    fn execute(&self, env: &EnvironmentRef, request: &ExecRequest) -> ExecResult<ExecOutput> {
        if env != &EnvironmentRef::local() {
            return Err(ExecutionError::InvalidEnvironment {
                id: env.id().to_string(),
            });
        }
        let (program, args) = request.split_program()?;
        debug!(argv = ?request.argv, cwd = ?request.working_dir, "local exec");

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(self.env.iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::null());
        if let Some(dir) = &request.working_dir {
            command.current_dir(dir);
        }
        let output = command.output().map_err(|source| ExecutionError::Spawn {
            program: program.to_string(),
            source,
        })?;

        Ok(ExecOutput {
            exit_code: exit_code(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Exit code, with signal deaths reported shell-style as `128 + signal`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
