use crate::model::Matcher;
use serde::{Deserialize, Serialize};

/// A declarative unit of test intent: setup, one command invocation, and assertions.
///
/// `command` and `validate` default to empty/absent when missing from the source data.
/// Such scenarios are not rejected up front; they fail during invocation or validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<Setup>,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<AssertionSet>,
}

impl Scenario {
    /// Argument vector for the invocation: `[command, ...args]`.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.command.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Environment mutations applied before the command runs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub init_project: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub path: String,
    pub content: String,
}

/// The `validate` block of a scenario. A missing `exit_code` means 0 is expected.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stdout: Vec<Matcher>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stderr: Vec<Matcher>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_exist: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_not_exist: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_contents: Vec<FileContentCheck>,
}

impl AssertionSet {
    #[must_use]
    pub fn expected_exit_code(&self) -> i32 {
        self.exit_code.unwrap_or(0)
    }
}

/// Content expectations for one file in the work root.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContentCheck {
    pub path: String,
    /// Exact content after trimming surrounding whitespace on both sides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contains: Vec<Matcher>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_contains: Vec<Matcher>,
}
