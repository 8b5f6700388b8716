//! Progress listener for scenario execution.

use std::fmt;

/// Fixed set of stages a scenario run reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Provisioning the environment.
    Setup,
    /// Invoking the command under test.
    Execute,
    /// Evaluating assertions.
    Validate,
    /// Every assertion held.
    Passed,
    /// The run completed but at least one assertion was violated.
    Violated,
    /// Setup or invocation aborted the run.
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Execute => "execute",
            Self::Validate => "validate",
            Self::Passed => "passed",
            Self::Violated => "violated",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Receives stage events while scenarios run.
///
/// Implementors can use this to display progress, log events, or collect metrics.
pub trait EventListener: Send + Sync {
    /// Called once per stage transition.
    fn on_event(&self, stage: Stage, message: &str);
}

/// A listener that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopListener;

impl EventListener for NoopListener {
    fn on_event(&self, _stage: Stage, _message: &str) {}
}
