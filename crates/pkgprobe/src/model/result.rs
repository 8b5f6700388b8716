use serde::{Deserialize, Serialize};

/// Raw output of one command executed inside an environment.
///
/// Both streams are already trimmed of surrounding whitespace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Verdict produced by the validator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Verdict {
    /// One message per violated assertion, in evaluation order.
    pub violations: Vec<String>,
}

impl Verdict {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations joined with `"; "`, or `None` when nothing failed.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        if self.violations.is_empty() {
            None
        } else {
            Some(self.violations.join("; "))
        }
    }
}

/// Outcome of one scenario run, fully built before it is handed back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub passed: bool,
    pub duration_ms: u64,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Result for a run that validated (passing or not).
    #[must_use]
    pub fn validated(output: ExecOutput, verdict: &Verdict, duration_ms: u64) -> Self {
        Self {
            passed: verdict.passed(),
            duration_ms,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            error: verdict.error(),
        }
    }

    /// Result for a run aborted by a setup or invocation failure.
    #[must_use]
    pub fn aborted(message: impl Into<String>, duration_ms: u64) -> Self {
        let message = message.into();
        Self {
            passed: false,
            duration_ms,
            exit_code: 1,
            stdout: String::new(),
            stderr: message.clone(),
            error: Some(message),
        }
    }
}
