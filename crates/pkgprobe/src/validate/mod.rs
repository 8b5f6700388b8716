//! Scenario validation.
//!
//! Every assertion category is a [`Rule`]. The validator evaluates all of them
//! unconditionally and collects one message per violation, so a single run reports every
//! defect instead of the first one.

use crate::exec::{ExecRequest, ExecutionError, Executor};
use crate::model::{AssertionSet, EnvironmentRef, ExecOutput, FileContentCheck, Matcher, Verdict};
use crate::provision::ProvisionConfig;
use tracing::debug;

/// Collected violation messages, in evaluation order.
#[derive(Debug, Default)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    #[must_use]
    pub fn into_verdict(self) -> Verdict {
        Verdict { violations: self.0 }
    }
}

/// Read access to files in the environment's work root.
pub struct FileAccess<'a> {
    executor: &'a dyn Executor,
    env: &'a EnvironmentRef,
    config: &'a ProvisionConfig,
}

impl FileAccess<'_> {
    pub fn exists(&self, path: &str) -> Result<bool, ExecutionError> {
        let target = self.config.resolve(path);
        let output = self
            .executor
            .execute(self.env, &ExecRequest::new(["test", "-e", target.as_str()]))?;
        Ok(output.success())
    }

    /// File content as text. The error is a human-readable reason.
    pub fn read(&self, path: &str) -> Result<String, String> {
        let target = self.config.resolve(path);
        let output = self
            .executor
            .execute(self.env, &ExecRequest::new(["cat", target.as_str()]))
            .map_err(|err| err.to_string())?;
        if output.success() {
            Ok(output.stdout)
        } else if output.stderr.is_empty() {
            Err(format!("cat exited with code {}", output.exit_code))
        } else {
            Err(output.stderr)
        }
    }
}

/// Everything a rule may look at.
pub struct RuleContext<'a> {
    pub output: &'a ExecOutput,
    pub files: FileAccess<'a>,
}

/// One independent assertion category.
pub trait Rule {
    fn evaluate(&self, cx: &RuleContext<'_>, violations: &mut Violations);
}

/// Exit code must equal the expected value.
pub struct ExitCodeRule {
    pub expected: i32,
}

impl Rule for ExitCodeRule {
    fn evaluate(&self, cx: &RuleContext<'_>, violations: &mut Violations) {
        if cx.output.exit_code != self.expected {
            violations.push(format!(
                "Expected exit code {}, got {}",
                self.expected, cx.output.exit_code
            ));
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn name(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// Each matcher must match somewhere in the stream.
pub struct StreamRule<'s> {
    pub stream: Stream,
    pub matchers: &'s [Matcher],
}

impl Rule for StreamRule<'_> {
    fn evaluate(&self, cx: &RuleContext<'_>, violations: &mut Violations) {
        let text = match self.stream {
            Stream::Stdout => &cx.output.stdout,
            Stream::Stderr => &cx.output.stderr,
        };
        for matcher in self.matchers {
            if !matcher.is_match(text) {
                violations.push(format!("{} {}", self.stream.name(), missing(matcher)));
            }
        }
    }
}

/// Every listed path must exist.
pub struct FilesExistRule<'s>(pub &'s [String]);

impl Rule for FilesExistRule<'_> {
    fn evaluate(&self, cx: &RuleContext<'_>, violations: &mut Violations) {
        for path in self.0 {
            match cx.files.exists(path) {
                Ok(true) => {}
                Ok(false) => violations.push(format!("Expected file to exist: {path}")),
                Err(err) => violations.push(format!("Could not check file {path}: {err}")),
            }
        }
    }
}

/// No listed path may exist.
pub struct FilesAbsentRule<'s>(pub &'s [String]);

impl Rule for FilesAbsentRule<'_> {
    fn evaluate(&self, cx: &RuleContext<'_>, violations: &mut Violations) {
        for path in self.0 {
            match cx.files.exists(path) {
                Ok(false) => {}
                Ok(true) => violations.push(format!("Expected file not to exist: {path}")),
                Err(err) => violations.push(format!("Could not check file {path}: {err}")),
            }
        }
    }
}

/// Content checks; an unreadable file yields one message and skips its other checks.
pub struct FileContentsRule<'s>(pub &'s [FileContentCheck]);

impl Rule for FileContentsRule<'_> {
    fn evaluate(&self, cx: &RuleContext<'_>, violations: &mut Violations) {
        for check in self.0 {
            let content = match cx.files.read(&check.path) {
                Ok(content) => content,
                Err(reason) => {
                    violations.push(format!("Could not read file {}: {reason}", check.path));
                    continue;
                }
            };
            if let Some(expected) = &check.equals {
                if content.trim() != expected.trim() {
                    violations.push(format!(
                        "File {} content mismatch: expected \"{}\", got \"{}\"",
                        check.path,
                        expected.trim(),
                        content.trim()
                    ));
                }
            }
            for matcher in &check.contains {
                if !matcher.is_match(&content) {
                    violations.push(format!("File {} {}", check.path, missing(matcher)));
                }
            }
            for matcher in &check.not_contains {
                if matcher.is_match(&content) {
                    violations.push(format!("File {} {}", check.path, unexpected(matcher)));
                }
            }
        }
    }
}

fn missing(matcher: &Matcher) -> String {
    match matcher {
        Matcher::Literal(_) => format!("does not contain {matcher}"),
        Matcher::Pattern(_) => format!("does not match {matcher}"),
    }
}

fn unexpected(matcher: &Matcher) -> String {
    match matcher {
        Matcher::Literal(_) => format!("should not contain {matcher}"),
        Matcher::Pattern(_) => format!("should not match {matcher}"),
    }
}

/// Evaluates a scenario's assertion set against one invocation's output.
pub struct Validator<'a> {
    executor: &'a dyn Executor,
    config: &'a ProvisionConfig,
}

impl<'a> Validator<'a> {
    pub fn new(executor: &'a dyn Executor, config: &'a ProvisionConfig) -> Self {
        Self { executor, config }
    }

    /// Evaluate every category and collect all violations.
    ///
    /// A missing assertion set is itself a violation: the scenario is malformed.
    pub fn validate(
        &self,
        env: &EnvironmentRef,
        assertions: Option<&AssertionSet>,
        output: &ExecOutput,
    ) -> Verdict {
        let mut violations = Violations::default();
        let Some(assertions) = assertions else {
            violations.push("Scenario has no validate block");
            return violations.into_verdict();
        };

        let cx = RuleContext {
            output,
            files: FileAccess {
                executor: self.executor,
                env,
                config: self.config,
            },
        };
        let rules: [&dyn Rule; 6] = [
            &ExitCodeRule {
                expected: assertions.expected_exit_code(),
            },
            &StreamRule {
                stream: Stream::Stdout,
                matchers: &assertions.stdout,
            },
            &StreamRule {
                stream: Stream::Stderr,
                matchers: &assertions.stderr,
            },
            &FilesExistRule(&assertions.files_exist),
            &FilesAbsentRule(&assertions.files_not_exist),
            &FileContentsRule(&assertions.file_contents),
        ];
        for rule in rules {
            rule.evaluate(&cx, &mut violations);
        }

        let verdict = violations.into_verdict();
        debug!(%env, violations = verdict.violations.len(), "validated");
        verdict
    }
}
