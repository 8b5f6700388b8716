//! Campaign configuration files.
//!
//! Every field is optional so the CLI can layer flags on top. Credentials are never part
//! of the file: `authTokenEnv` names the environment variable that holds the token.

use crate::scenario::ScenarioFormat;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    #[diagnostic(code(pkgprobe::config::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(code(pkgprobe::config::parse))]
    Parse { path: String, message: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CampaignConfig {
    /// Registry name or local path of the package under test.
    pub package: Option<String>,
    pub image: Option<String>,
    pub versions: Option<Vec<String>>,
    pub commands: Option<Vec<String>>,
    /// Scenario file, relative to the config file's directory.
    pub scenarios: Option<PathBuf>,
    pub default_probes: Option<bool>,
    pub parallel: Option<bool>,
    pub registry_url: Option<String>,
    pub auth_token_env: Option<String>,
    pub work_root: Option<String>,
    pub docker_socket: Option<PathBuf>,
}

/// Load a JSON or YAML campaign config; relative scenario paths are resolved against
/// the config file's directory.
pub fn load_campaign_config(path: &Path) -> Result<CampaignConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let parse_failed = |message: String| ConfigError::Parse {
        path: path.display().to_string(),
        message,
    };
    let mut config: CampaignConfig = match ScenarioFormat::from_path(path) {
        ScenarioFormat::Json => {
            serde_json::from_str(&text).map_err(|err| parse_failed(err.to_string()))?
        }
        ScenarioFormat::Yaml => {
            serde_yml::from_str(&text).map_err(|err| parse_failed(err.to_string()))?
        }
    };
    if let (Some(scenarios), Some(base)) = (config.scenarios.as_mut(), path.parent()) {
        if scenarios.is_relative() {
            *scenarios = base.join(&*scenarios);
        }
    }
    Ok(config)
}
