//! Scenario execution engine.
//!
//! One run moves through three phases, each waiting for the previous one:
//!
//! 1. **Setup** (only when the scenario has a `setup` block) via [`Provisioner`]
//! 2. **Invocation** of `[command, ...args]` in the work root via the [`Executor`]
//! 3. **Validation** of the raw output via [`Validator`]
//!
//! The engine is the error boundary: setup and invocation failures become a failed
//! [`ExecutionResult`] with exit code 1 and the failure message in `stderr` and `error`.
//! [`Engine::run`] always returns a result.

pub mod progress;

pub use progress::{EventListener, NoopListener, Stage};

use crate::exec::{ExecRequest, ExecutionError, Executor};
use crate::model::{EnvironmentRef, ExecOutput, ExecutionResult, Scenario, Verdict};
use crate::provision::{ProvisionConfig, ProvisionError, Provisioner};
use crate::validate::Validator;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Failure that aborts a run before validation.
#[derive(Debug, thiserror::Error)]
enum Abort {
    #[error("Setup failed: {0}")]
    Setup(#[source] ProvisionError),
    #[error("Command failed to execute: {0}")]
    Invocation(#[source] ExecutionError),
}

/// Runs scenarios against environments supplied by the caller.
///
/// Holds no per-run state, so one engine may serve concurrent runs as long as every run
/// uses its own environment.
pub struct Engine<E: Executor> {
    executor: E,
    config: ProvisionConfig,
    listener: Arc<dyn EventListener>,
}

impl<E: Executor> Engine<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            config: ProvisionConfig::default(),
            listener: Arc::new(NoopListener),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ProvisionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Run one scenario to a verdict. Never fails; every failure is in the result.
    pub fn run(&self, env: &EnvironmentRef, scenario: &Scenario) -> ExecutionResult {
        let started = Instant::now();
        info!(scenario = %scenario.name, %env, "scenario started");

        let result = match self.run_phases(env, scenario) {
            Ok((output, verdict)) => {
                let result = ExecutionResult::validated(output, &verdict, elapsed_ms(&started));
                match &result.error {
                    None => self.emit(Stage::Passed, &scenario.name, "passed"),
                    Some(error) => {
                        self.emit(Stage::Violated, &scenario.name, &format!("failed: {error}"));
                    }
                }
                result
            }
            Err(abort) => {
                let message = abort.to_string();
                self.emit(Stage::Failed, &scenario.name, &message);
                ExecutionResult::aborted(message, elapsed_ms(&started))
            }
        };

        if result.passed {
            info!(scenario = %scenario.name, duration_ms = result.duration_ms, passed = true, "scenario finished");
        } else {
            warn!(
                scenario = %scenario.name,
                duration_ms = result.duration_ms,
                error = result.error.as_deref().unwrap_or_default(),
                "scenario failed"
            );
        }
        result
    }

    fn run_phases(
        &self,
        env: &EnvironmentRef,
        scenario: &Scenario,
    ) -> Result<(ExecOutput, Verdict), Abort> {
        if let Some(setup) = &scenario.setup {
            self.emit(
                Stage::Setup,
                &scenario.name,
                &format!(
                    "{} directories, {} files, {} dependencies",
                    setup.directories.len(),
                    setup.files.len(),
                    setup.dependencies.len()
                ),
            );
            Provisioner::new(&self.executor, &self.config)
                .provision(env, setup)
                .map_err(Abort::Setup)?;
        }

        let request = ExecRequest::new(scenario.argv()).in_dir(self.config.work_root.clone());
        self.emit(Stage::Execute, &scenario.name, &request.argv.join(" "));
        let output = self
            .executor
            .execute(env, &request)
            .map_err(Abort::Invocation)?;

        self.emit(
            Stage::Validate,
            &scenario.name,
            &format!("exit code {}", output.exit_code),
        );
        let verdict = Validator::new(&self.executor, &self.config).validate(
            env,
            scenario.validate.as_ref(),
            &output,
        );
        Ok((output, verdict))
    }

    fn emit(&self, stage: Stage, scenario: &str, detail: &str) {
        self.listener.on_event(stage, &format!("{scenario}: {detail}"));
    }
}

fn elapsed_ms(started: &Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
