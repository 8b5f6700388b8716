// Test module - relaxed lint rules
#![allow(clippy::indexing_slicing)]
#![allow(clippy::panic)]
#![allow(clippy::manual_assert)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

//! Host execution tests: real processes, real files, temp work roots.

#![cfg(unix)]

use pkgprobe::engine::Engine;
use pkgprobe::exec::{ExecRequest, ExecutionError, Executor, LocalExecutor};
use pkgprobe::model::{EnvironmentRef, Matcher};
use pkgprobe::provision::ProvisionConfig;
use pkgprobe_fixtures::ScenarioBuilder;
use tempfile::TempDir;

fn engine_in(root: &TempDir) -> Engine<LocalExecutor> {
    let config = ProvisionConfig {
        work_root: root.path().display().to_string(),
        init_command: vec!["sh".into(), "-c".into(), "echo '{}' > package.json".into()],
        install_command: vec![
            "sh".into(),
            "-c".into(),
            "mkdir -p node_modules && for dep; do touch \"node_modules/$dep\"; done".into(),
            "install".into(),
        ],
    };
    Engine::new(LocalExecutor::new()).with_config(config)
}

#[test]
fn captures_trimmed_streams_and_exit_code() {
    let executor = LocalExecutor::new();
    let output = executor
        .execute(
            &EnvironmentRef::local(),
            &ExecRequest::new(["sh", "-c", "echo '  out  '; echo err >&2; exit 3"]),
        )
        .unwrap();
    assert_eq!(output.exit_code, 3);
    assert_eq!(output.stdout, "out");
    assert_eq!(output.stderr, "err");
}

#[test]
fn rejects_non_local_environment() {
    let err = LocalExecutor::new()
        .execute(&EnvironmentRef::new("abc123"), &ExecRequest::new(["true"]))
        .unwrap_err();
    assert!(matches!(err, ExecutionError::InvalidEnvironment { .. }));
}

#[test]
fn missing_program_is_a_spawn_error() {
    let err = LocalExecutor::new()
        .execute(
            &EnvironmentRef::local(),
            &ExecRequest::new(["pkgprobe-definitely-not-installed"]),
        )
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Spawn { .. }));
}

#[test]
fn passes_extra_environment_variables() {
    let output = LocalExecutor::new()
        .with_env("PKGPROBE_TEST_VALUE", "forty-two")
        .execute(
            &EnvironmentRef::local(),
            &ExecRequest::new(["sh", "-c", "printf %s \"$PKGPROBE_TEST_VALUE\""]),
        )
        .unwrap();
    assert_eq!(output.stdout, "forty-two");
}

#[test]
fn end_to_end_scenario_with_setup_and_file_checks() {
    let root = TempDir::new().unwrap();
    let scenario = ScenarioBuilder::new("copies-input", "sh")
        .args(["-c", "mkdir -p out && cp input.txt out/copy.txt && echo copied"])
        .file("input.txt", "Hello World\n")
        .init_project()
        .dependency("left-pad")
        .stdout_contains("copied")
        .file_exists("package.json")
        .file_exists("node_modules/left-pad")
        .file_equals("out/copy.txt", "Hello World")
        .file_absent("out/missing.txt")
        .build();

    let result = engine_in(&root).run(&EnvironmentRef::local(), &scenario);
    assert!(result.passed, "{:?}", result.error);
    assert_eq!(result.stdout, "copied");
    assert!(root.path().join("out/copy.txt").exists());
}

#[test]
fn file_content_with_special_characters_is_written_verbatim() {
    let root = TempDir::new().unwrap();
    let content = "it's \"quoted\" $HOME `cmd` %s\nsecond line";
    let scenario = ScenarioBuilder::new("verbatim", "true")
        .file("nested/deep/data.txt", content)
        .build();

    let result = engine_in(&root).run(&EnvironmentRef::local(), &scenario);
    assert!(result.passed, "{:?}", result.error);
    let written = std::fs::read_to_string(root.path().join("nested/deep/data.txt")).unwrap();
    assert_eq!(written, content);
}

#[test]
fn reports_every_violation_from_a_real_run() {
    let root = TempDir::new().unwrap();
    let scenario = ScenarioBuilder::new("wrong", "sh")
        .args(["-c", "echo 'an error occurred' > log.txt; echo nope; exit 4"])
        .stdout(Matcher::pattern("^yes$").unwrap())
        .file_exists("result.json")
        .file_content(pkgprobe::model::FileContentCheck {
            path: "log.txt".to_string(),
            not_contains: vec![Matcher::literal("error")],
            ..Default::default()
        })
        .build();

    let result = engine_in(&root).run(&EnvironmentRef::local(), &scenario);
    assert!(!result.passed);
    assert_eq!(result.exit_code, 4);
    let error = result.error.unwrap();
    assert_eq!(error.split("; ").count(), 4, "{error}");
    assert!(error.contains("Expected exit code 0, got 4"));
    assert!(error.contains("Expected file to exist: result.json"));
    assert!(error.contains("File log.txt should not contain \"error\""));
}

#[test]
fn failing_install_aborts_setup() {
    let root = TempDir::new().unwrap();
    let config = ProvisionConfig {
        work_root: root.path().display().to_string(),
        install_command: vec![
            "sh".into(),
            "-c".into(),
            "echo \"404 $1\" >&2; exit 1".into(),
            "install".into(),
        ],
        ..ProvisionConfig::default()
    };
    let marker = root.path().join("ran");
    let scenario = ScenarioBuilder::new("bad-dep", "touch")
        .args([marker.display().to_string()])
        .dependency("nonexistent-pkg")
        .build();

    let result = Engine::new(LocalExecutor::new())
        .with_config(config)
        .run(&EnvironmentRef::local(), &scenario);
    assert!(!result.passed);
    assert_eq!(result.exit_code, 1);
    assert!(result.error.unwrap().contains("404 nonexistent-pkg"));
    assert!(!marker.exists());
}
