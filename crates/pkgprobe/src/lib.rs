//! pkgprobe: black-box scenario testing for packaged command-line tools.
//!
//! A scenario declares files and dependencies to set up, one command to run, and
//! assertions about its exit code, output and resulting files. The [`engine::Engine`]
//! provisions an isolated environment, runs the command through an [`exec::Executor`],
//! and validates everything at once, reporting every violated assertion rather than the
//! first. The [`campaign`] module runs scenario sets across runtime versions in Docker.

#![forbid(unsafe_code)]
// Entry points and wire types are documented; plumbing is not.
#![allow(missing_docs)]

pub mod campaign;
pub mod engine;
pub mod exec;
pub mod model;
pub mod provision;
pub mod scenario;
pub mod validate;

pub use crate::model::*;

pub mod run {
    use super::engine::Engine;
    use super::exec::Executor;
    use super::{EnvironmentRef, ExecutionResult, Scenario};

    /// Run one scenario with default provisioning settings and no listener.
    pub fn run_scenario<E: Executor>(
        executor: E,
        env: &EnvironmentRef,
        scenario: &Scenario,
    ) -> ExecutionResult {
        Engine::new(executor).run(env, scenario)
    }
}
