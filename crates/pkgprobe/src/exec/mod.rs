//! Isolated command execution.
//!
//! The [`Executor`] trait is the leaf capability everything else builds on: run an argv
//! inside an already-running environment and hand back the exit code plus both output
//! streams, trimmed. Two transports are provided:
//!
//! - [`DockerExecutor`] - Docker Engine API over its Unix socket; output arrives as a
//!   multiplexed frame stream and is split by [`demux`].
//! - [`LocalExecutor`] - runs directly on the host; used for local runs and tests.
//!
//! Executors never retry and never enforce a timeout. Deadlines belong to the caller.

pub mod demux;
pub mod docker;
pub mod local;
mod socket;

pub use docker::{DockerClient, DockerExecutor};
pub use local::LocalExecutor;

use crate::model::{EnvironmentRef, ExecOutput};
use miette::Diagnostic;
use std::io;
use std::sync::Arc;

pub type ExecResult<T> = Result<T, ExecutionError>;

/// Failure to run a command to completion inside an environment.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ExecutionError {
    #[error("cannot execute an empty command")]
    #[diagnostic(code(pkgprobe::exec::empty_command))]
    EmptyCommand,

    #[error("environment '{id}' is not available")]
    #[diagnostic(
        code(pkgprobe::exec::invalid_environment),
        help("the environment may have been removed or never started")
    )]
    InvalidEnvironment { id: String },

    #[error("failed to connect to {endpoint}: {source}")]
    #[diagnostic(
        code(pkgprobe::exec::connect),
        help("is the Docker daemon running and is the socket readable?")
    )]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}: {source}")]
    #[diagnostic(code(pkgprobe::exec::io))]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed response from isolation layer: {0}")]
    #[diagnostic(code(pkgprobe::exec::protocol))]
    Protocol(String),

    #[error("isolation layer returned HTTP {status}: {message}")]
    #[diagnostic(code(pkgprobe::exec::api))]
    Api { status: u16, message: String },

    #[error("failed to start '{program}': {source}")]
    #[diagnostic(code(pkgprobe::exec::spawn))]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ExecutionError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// One command to run inside an environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecRequest {
    /// `argv[0]` is the program name.
    pub argv: Vec<String>,
    /// Working directory inside the environment; the environment default when `None`.
    pub working_dir: Option<String>,
}

impl ExecRequest {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            working_dir: None,
        }
    }

    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Program name and remaining arguments.
    pub fn split_program(&self) -> ExecResult<(&str, &[String])> {
        match self.argv.split_first() {
            Some((program, args)) if !program.is_empty() => Ok((program.as_str(), args)),
            _ => Err(ExecutionError::EmptyCommand),
        }
    }
}

/// Runs commands inside isolated environments.
///
/// Implementations are shared across concurrently running scenarios, each of which
/// passes its own environment reference.
pub trait Executor: Send + Sync {
    fn execute(&self, env: &EnvironmentRef, request: &ExecRequest) -> ExecResult<ExecOutput>;
}

impl<T: Executor + ?Sized> Executor for &T {
    fn execute(&self, env: &EnvironmentRef, request: &ExecRequest) -> ExecResult<ExecOutput> {
        (**self).execute(env, request)
    }
}

impl<T: Executor + ?Sized> Executor for Arc<T> {
    fn execute(&self, env: &EnvironmentRef, request: &ExecRequest) -> ExecResult<ExecOutput> {
        (**self).execute(env, request)
    }
}

impl<T: Executor + ?Sized> Executor for Box<T> {
    fn execute(&self, env: &EnvironmentRef, request: &ExecRequest) -> ExecResult<ExecOutput> {
        (**self).execute(env, request)
    }
}
