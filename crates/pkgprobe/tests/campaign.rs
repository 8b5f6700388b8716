// Test module - relaxed lint rules
#![allow(clippy::indexing_slicing)]
#![allow(clippy::panic)]
#![allow(clippy::manual_assert)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

//! Campaign runner tests with an in-memory isolation layer.

use std::sync::Mutex;

use pkgprobe::campaign::{
    CampaignPlan, CampaignRunner, Isolation, IsolationError, IsolationResult,
};
use pkgprobe::engine::Engine;
use pkgprobe::exec::ExecutionError;
use pkgprobe::model::{
    EnvironmentConfig, EnvironmentRef, PackageSource, PackageSpec, LOCAL_PACKAGE_MOUNT,
};
use pkgprobe::provision::ProvisionConfig;
use pkgprobe_fixtures::{output, ScenarioBuilder, ScriptedExecutor};

/// Environments named after their version; versions listed in `broken` fail to start,
/// versions in `no_install` fail the package install.
#[derive(Default)]
struct FakeIsolation {
    broken: Vec<String>,
    no_install: Vec<String>,
    log: Mutex<Vec<String>>,
}

impl FakeIsolation {
    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

impl Isolation for FakeIsolation {
    fn create_environment(&self, config: &EnvironmentConfig) -> IsolationResult<EnvironmentRef> {
        self.record(format!("create {}", config.version));
        if self.broken.contains(&config.version) {
            return Err(IsolationError::Create {
                image: config.image_ref(),
                source: ExecutionError::Protocol("manifest unknown".to_string()),
            });
        }
        Ok(EnvironmentRef::new(format!("env-{}", config.version)))
    }

    fn install_package(&self, env: &EnvironmentRef, package: &PackageSpec) -> IsolationResult<()> {
        self.record(format!("install {} {}", env, package.install_target()));
        let version = env.id().trim_start_matches("env-");
        if self.no_install.iter().any(|v| v == version) {
            return Err(IsolationError::Install {
                package: package.display_name(),
                reason: "E404".to_string(),
            });
        }
        Ok(())
    }

    fn destroy_environment(&self, env: &EnvironmentRef) -> IsolationResult<()> {
        self.record(format!("destroy {env}"));
        Ok(())
    }
}

fn plan(versions: &[&str]) -> CampaignPlan {
    CampaignPlan {
        package: PackageSpec::parse("my-cli"),
        image: "node".to_string(),
        versions: versions.iter().map(|v| (*v).to_string()).collect(),
        commands: vec!["my-cli".to_string()],
        scenarios: vec![ScenarioBuilder::new("greets", "my-cli")
            .args(["hello"])
            .stdout_contains("hello")
            .build()],
        default_probes: true,
        parallel: false,
        provision: ProvisionConfig::default(),
    }
}

fn healthy_tool() -> ScriptedExecutor {
    ScriptedExecutor::new()
        .respond_argv(
            &["my-cli", "--version"],
            pkgprobe_fixtures::Response::output(output(0, "1.4.0", "")),
        )
        .respond("my-cli", output(0, "hello", ""))
}

#[test]
fn runs_probes_then_scenarios_in_every_environment() {
    let isolation = FakeIsolation::default();
    let executor = healthy_tool();
    let engine = Engine::new(&executor);

    let summary = CampaignRunner::new(&isolation, &engine).run(&plan(&["18", "20"]));

    assert!(summary.all_passed(), "{:#?}", summary);
    assert_eq!(summary.package, "my-cli");
    assert_eq!(summary.total, 6);
    assert_eq!(summary.passed, 6);
    assert_eq!(summary.failed, 0);
    let names: Vec<&str> = summary.environments[0]
        .scenarios
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(names, ["my-cli --help", "my-cli --version", "greets"]);
    assert_eq!(
        isolation.log(),
        [
            "create 18",
            "install env-18 my-cli",
            "destroy env-18",
            "create 20",
            "install env-20 my-cli",
            "destroy env-20",
        ]
    );
}

#[test]
fn failing_scenario_does_not_stop_siblings() {
    let isolation = FakeIsolation::default();
    let executor = healthy_tool();
    let engine = Engine::new(&executor);
    let mut plan = plan(&["20"]);
    plan.scenarios.insert(
        0,
        ScenarioBuilder::new("expects-failure", "my-cli")
            .expect_exit(2)
            .build(),
    );

    let summary = CampaignRunner::new(&isolation, &engine).run(&plan);

    assert!(!summary.all_passed());
    assert_eq!(summary.total, 4);
    assert_eq!(summary.failed, 1);
    let failed = &summary.environments[0].scenarios[2];
    assert_eq!(failed.name, "expects-failure");
    assert!(!failed.result.passed);
    assert!(summary.environments[0].scenarios[3].result.passed);
}

#[test]
fn environment_failures_are_reported_and_cleaned_up() {
    let isolation = FakeIsolation {
        broken: vec!["99".to_string()],
        no_install: vec!["16".to_string()],
        ..FakeIsolation::default()
    };
    let executor = healthy_tool();
    let engine = Engine::new(&executor);

    let summary = CampaignRunner::new(&isolation, &engine).run(&plan(&["99", "16", "20"]));

    assert!(!summary.all_passed());
    assert_eq!(summary.environment_errors().count(), 2);
    assert!(summary.environments[0]
        .error
        .as_deref()
        .unwrap()
        .contains("manifest unknown"));
    assert!(summary.environments[1].error.as_deref().unwrap().contains("E404"));
    assert!(summary.environments[1].scenarios.is_empty());
    assert_eq!(summary.total, 3);
    assert_eq!(summary.passed, 3);

    let log = isolation.log();
    assert!(!log.iter().any(|entry| entry == "destroy env-99"));
    assert!(log.iter().any(|entry| entry == "destroy env-16"));
    assert!(log.iter().any(|entry| entry == "destroy env-20"));
}

#[test]
fn parallel_run_keeps_version_order_in_report() {
    let isolation = FakeIsolation::default();
    let executor = healthy_tool();
    let engine = Engine::new(&executor);
    let mut plan = plan(&["18", "20", "22"]);
    plan.parallel = true;

    let summary = CampaignRunner::new(&isolation, &engine).run(&plan);

    let versions: Vec<&str> = summary
        .environments
        .iter()
        .map(|env| env.version.as_str())
        .collect();
    assert_eq!(versions, ["18", "20", "22"]);
    assert_eq!(summary.total, 9);
    assert!(summary.all_passed());
    assert_eq!(isolation.log().len(), 9);
}

#[test]
fn probes_can_be_disabled() {
    let mut plan = plan(&["20"]);
    plan.default_probes = false;
    let names: Vec<String> = plan.all_scenarios().into_iter().map(|s| s.name).collect();
    assert_eq!(names, ["greets"]);
}

#[test]
fn local_package_is_mounted_read_only() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut plan = plan(&["20.11"]);
    plan.package = PackageSpec::parse(&dir.path().display().to_string());
    assert!(matches!(plan.package.source, PackageSource::Local(_)));
    assert_eq!(plan.package.install_target(), LOCAL_PACKAGE_MOUNT);

    let config = plan.environment_config("20.11", pkgprobe::model::CampaignId::new());
    assert_eq!(config.image_ref(), "node:20.11");
    assert_eq!(config.mounts.len(), 1);
    assert!(config.mounts[0].read_only);
    assert_eq!(config.mounts[0].container, LOCAL_PACKAGE_MOUNT);
    assert!(config.name.unwrap().ends_with("-20-11"));
}

#[test]
fn summary_serializes_flattened_results() {
    let isolation = FakeIsolation::default();
    let executor = healthy_tool();
    let engine = Engine::new(&executor);
    let summary = CampaignRunner::new(&isolation, &engine).run(&plan(&["20"]));

    let value = serde_json::to_value(&summary).unwrap();
    let first = &value["environments"][0]["scenarios"][0];
    assert_eq!(first["name"], "my-cli --help");
    assert_eq!(first["passed"], true);
    assert!(first.get("exitCode").is_some());
    assert!(value.get("campaignId").is_some());
}
