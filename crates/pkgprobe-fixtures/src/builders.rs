//! Fluent builder for constructing [`Scenario`] objects in tests.

use pkgprobe::model::{AssertionSet, FileContentCheck, FileSpec, Matcher, Scenario, Setup};

/// Fluent builder for [`Scenario`] values.
///
/// Starts with an empty assertion set (expects exit code 0) and no setup block.
///
/// # Example
///
/// ```ignore
/// let scenario = ScenarioBuilder::new("writes-config", "mytool")
///     .args(["init"])
///     .dir("config")
///     .expect_exit(0)
///     .file_exists("config/settings.json")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl ScenarioBuilder {
    #[must_use]
    pub fn new(name: &str, command: &str) -> Self {
        Self {
            scenario: Scenario {
                name: name.to_string(),
                command: command.to_string(),
                validate: Some(AssertionSet::default()),
                ..Scenario::default()
            },
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scenario.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn setup(&mut self) -> &mut Setup {
        self.scenario.setup.get_or_insert_with(Setup::default)
    }

    fn assertions(&mut self) -> &mut AssertionSet {
        self.scenario
            .validate
            .get_or_insert_with(AssertionSet::default)
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    #[must_use]
    pub fn dir(mut self, path: &str) -> Self {
        self.setup().directories.push(path.to_string());
        self
    }

    #[must_use]
    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.setup().files.push(FileSpec {
            path: path.to_string(),
            content: content.to_string(),
        });
        self
    }

    #[must_use]
    pub fn dependency(mut self, name: &str) -> Self {
        self.setup().dependencies.push(name.to_string());
        self
    }

    #[must_use]
    pub fn init_project(mut self) -> Self {
        self.setup().init_project = true;
        self
    }

    // ------------------------------------------------------------------
    // Assertions
    // ------------------------------------------------------------------

    #[must_use]
    pub fn expect_exit(mut self, code: i32) -> Self {
        self.assertions().exit_code = Some(code);
        self
    }

    #[must_use]
    pub fn stdout(mut self, matcher: Matcher) -> Self {
        self.assertions().stdout.push(matcher);
        self
    }

    #[must_use]
    pub fn stdout_contains(self, text: &str) -> Self {
        self.stdout(Matcher::literal(text))
    }

    #[must_use]
    pub fn stderr(mut self, matcher: Matcher) -> Self {
        self.assertions().stderr.push(matcher);
        self
    }

    #[must_use]
    pub fn file_exists(mut self, path: &str) -> Self {
        self.assertions().files_exist.push(path.to_string());
        self
    }

    #[must_use]
    pub fn file_absent(mut self, path: &str) -> Self {
        self.assertions().files_not_exist.push(path.to_string());
        self
    }

    #[must_use]
    pub fn file_content(mut self, check: FileContentCheck) -> Self {
        self.assertions().file_contents.push(check);
        self
    }

    #[must_use]
    pub fn file_equals(self, path: &str, content: &str) -> Self {
        self.file_content(FileContentCheck {
            path: path.to_string(),
            equals: Some(content.to_string()),
            ..FileContentCheck::default()
        })
    }

    /// Drop the assertion set entirely, producing a malformed scenario.
    #[must_use]
    pub fn without_validate(mut self) -> Self {
        self.scenario.validate = None;
        self
    }

    #[must_use]
    pub fn build(self) -> Scenario {
        self.scenario
    }
}
