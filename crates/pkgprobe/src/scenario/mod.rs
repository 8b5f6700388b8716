//! Scenario sources: scenario files and the fixed probe set.

use crate::model::{AssertionSet, Matcher, Scenario};
use miette::Diagnostic;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub type ScenarioResult<T> = Result<T, ScenarioError>;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ScenarioError {
    #[error("failed to read scenario file {path}: {source}")]
    #[diagnostic(code(pkgprobe::scenario::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} scenarios: {message}")]
    #[diagnostic(
        code(pkgprobe::scenario::parse),
        help("expected an array of scenarios or an object with a `scenarios` array")
    )]
    Parse {
        format: ScenarioFormat,
        message: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenarioFormat {
    Json,
    Yaml,
}

impl ScenarioFormat {
    /// Format implied by a file extension; JSON unless `.yaml`/`.yml`.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

impl std::fmt::Display for ScenarioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScenarioDocument {
    List(Vec<Scenario>),
    Wrapped { scenarios: Vec<Scenario> },
}

/// Parse scenarios from text. Accepts a bare list or `{ "scenarios": [...] }`.
pub fn parse_scenarios(text: &str, format: ScenarioFormat) -> ScenarioResult<Vec<Scenario>> {
    let document = match format {
        ScenarioFormat::Json => serde_json::from_str::<ScenarioDocument>(text)
            .map_err(|err| err.to_string()),
        ScenarioFormat::Yaml => {
            serde_yml::from_str::<ScenarioDocument>(text).map_err(|err| err.to_string())
        }
    }
    .map_err(|message| ScenarioError::Parse { format, message })?;
    Ok(match document {
        ScenarioDocument::List(scenarios) | ScenarioDocument::Wrapped { scenarios } => scenarios,
    })
}

pub fn load_scenario_file(path: &Path) -> ScenarioResult<Vec<Scenario>> {
    let text = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_scenarios(&text, ScenarioFormat::from_path(path))
}

/// The fixed probes run for every command: `--help` and `--version`.
#[must_use]
pub fn default_probes(command: &str) -> Vec<Scenario> {
    let non_empty = Matcher::pattern(r"\S").map(|matcher| vec![matcher]).unwrap_or_default();
    vec![
        Scenario {
            name: format!("{command} --help"),
            description: Some("prints usage and exits cleanly".to_string()),
            command: command.to_string(),
            args: vec!["--help".to_string()],
            validate: Some(AssertionSet {
                exit_code: Some(0),
                ..AssertionSet::default()
            }),
            ..Scenario::default()
        },
        Scenario {
            name: format!("{command} --version"),
            description: Some("prints a version and exits cleanly".to_string()),
            command: command.to_string(),
            args: vec!["--version".to_string()],
            validate: Some(AssertionSet {
                exit_code: Some(0),
                stdout: non_empty,
                ..AssertionSet::default()
            }),
            ..Scenario::default()
        },
    ]
}
