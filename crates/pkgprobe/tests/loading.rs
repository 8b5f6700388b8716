// Test module - relaxed lint rules
#![allow(clippy::indexing_slicing)]
#![allow(clippy::panic)]
#![allow(clippy::manual_assert)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

//! Scenario and campaign config loading.

use std::fs;

use pkgprobe::campaign::{load_campaign_config, ConfigError};
use pkgprobe::model::Matcher;
use pkgprobe::scenario::{
    default_probes, load_scenario_file, parse_scenarios, ScenarioError, ScenarioFormat,
};
use pkgprobe_fixtures::{write_scenarios, ScenarioBuilder};
use tempfile::TempDir;

const JSON_SCENARIOS: &str = r#"[
  {
    "name": "creates config",
    "description": "init writes a config file",
    "setup": {
      "directories": ["project"],
      "files": [{ "path": "project/input.txt", "content": "Hello" }],
      "dependencies": ["lodash"],
      "initProject": true
    },
    "command": "mytool",
    "args": ["init", "project"],
    "validate": {
      "exitCode": 0,
      "stdout": ["Created", { "pattern": "config\\.json$", "flags": "im" }],
      "filesExist": ["project/config.json"],
      "filesNotExist": ["project/tmp"],
      "fileContents": [
        { "path": "project/config.json", "contains": ["version"], "notContains": ["error"] }
      ]
    }
  }
]"#;

#[test]
fn parses_full_json_scenario() {
    let scenarios = parse_scenarios(JSON_SCENARIOS, ScenarioFormat::Json).unwrap();
    assert_eq!(scenarios.len(), 1);
    let scenario = &scenarios[0];
    assert_eq!(scenario.argv(), ["mytool", "init", "project"]);

    let setup = scenario.setup.as_ref().unwrap();
    assert!(setup.init_project);
    assert_eq!(setup.dependencies, ["lodash"]);
    assert_eq!(setup.files[0].content, "Hello");

    let validate = scenario.validate.as_ref().unwrap();
    assert_eq!(validate.stdout[0], Matcher::literal("Created"));
    assert!(matches!(validate.stdout[1], Matcher::Pattern(_)));
    assert!(validate.stdout[1].is_match("Wrote CONFIG.JSON"));
    assert_eq!(validate.file_contents[0].not_contains.len(), 1);
}

#[test]
fn parses_wrapped_yaml_with_defaults() {
    let yaml = r#"
scenarios:
  - name: help
    command: mytool
    args: ["--help"]
    validate:
      stdout:
        - Usage
  - name: bare
    command: mytool
"#;
    let scenarios = parse_scenarios(yaml, ScenarioFormat::Yaml).unwrap();
    assert_eq!(scenarios.len(), 2);
    assert_eq!(scenarios[0].validate.as_ref().unwrap().expected_exit_code(), 0);
    assert!(scenarios[1].setup.is_none());
    assert!(scenarios[1].validate.is_none());
    assert!(scenarios[1].args.is_empty());
}

#[test]
fn rejects_invalid_pattern() {
    let json = r#"[{ "name": "bad", "command": "x", "validate": { "stdout": [{ "pattern": "(" }] } }]"#;
    let err = parse_scenarios(json, ScenarioFormat::Json).unwrap_err();
    assert!(matches!(
        err,
        ScenarioError::Parse {
            format: ScenarioFormat::Json,
            ..
        }
    ));
}

#[test]
fn rejects_oversized_pattern() {
    let pattern = "a".repeat(2000);
    let json = format!(
        r#"[{{ "name": "big", "command": "x", "validate": {{ "stdout": [{{ "pattern": "{pattern}" }}] }} }}]"#
    );
    assert!(parse_scenarios(&json, ScenarioFormat::Json).is_err());
}

#[test]
fn loads_files_by_extension() {
    let dir = TempDir::new().unwrap();
    let json_path = dir.path().join("scenarios.json");
    write_scenarios(
        &json_path,
        &[ScenarioBuilder::new("round", "mytool")
            .args(["run"])
            .stdout(Matcher::pattern_with_flags("ok", "i").unwrap())
            .build()],
    );
    let loaded = load_scenario_file(&json_path).unwrap();
    assert_eq!(loaded[0].name, "round");
    assert!(loaded[0].validate.as_ref().unwrap().stdout[0].is_match("OK"));

    let yaml_path = dir.path().join("scenarios.yml");
    fs::write(&yaml_path, "- name: y\n  command: tool\n").unwrap();
    assert_eq!(load_scenario_file(&yaml_path).unwrap()[0].command, "tool");

    let missing = dir.path().join("nope.json");
    assert!(matches!(
        load_scenario_file(&missing).unwrap_err(),
        ScenarioError::Io { .. }
    ));
}

#[test]
fn default_probes_cover_help_and_version() {
    let probes = default_probes("mytool");
    assert_eq!(probes.len(), 2);
    assert_eq!(probes[0].argv(), ["mytool", "--help"]);
    assert_eq!(probes[1].argv(), ["mytool", "--version"]);
    for probe in &probes {
        assert_eq!(probe.validate.as_ref().unwrap().expected_exit_code(), 0);
    }
    let version_stdout = &probes[1].validate.as_ref().unwrap().stdout;
    assert!(!version_stdout[0].is_match("   "));
    assert!(version_stdout[0].is_match("1.0.0"));
}

#[test]
fn campaign_config_resolves_scenarios_relative_to_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pkgprobe.yaml");
    fs::write(
        &path,
        "package: my-cli\nimage: node\nversions: ['18', '20']\ncommands: [my-cli]\nscenarios: cases.json\nparallel: true\n",
    )
    .unwrap();

    let config = load_campaign_config(&path).unwrap();
    assert_eq!(config.package.as_deref(), Some("my-cli"));
    assert_eq!(config.versions.unwrap(), ["18", "20"]);
    assert_eq!(config.scenarios.unwrap(), dir.path().join("cases.json"));
    assert_eq!(config.parallel, Some(true));
    assert!(config.default_probes.is_none());
}

#[test]
fn campaign_config_rejects_unknown_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pkgprobe.json");
    fs::write(&path, r#"{ "package": "x", "authToken": "secret" }"#).unwrap();
    assert!(matches!(
        load_campaign_config(&path).unwrap_err(),
        ConfigError::Parse { .. }
    ));
}
