//! Test campaigns: runtime versions x scenarios, summarized.
//!
//! The runner owns environment lifecycle. For each runtime version it creates an
//! environment, installs the package once, runs every scenario serially through the
//! [`Engine`], and always destroys the environment afterwards. A failing scenario or
//! environment never stops its siblings.

pub mod config;
pub mod isolation;

pub use config::{load_campaign_config, CampaignConfig, ConfigError};
pub use isolation::{
    DockerIsolation, Isolation, IsolationError, IsolationResult, DEFAULT_REGISTRY,
};

use crate::engine::Engine;
use crate::exec::Executor;
use crate::model::{
    CampaignId, EnvironmentConfig, EnvironmentRef, ExecutionResult, Mount, PackageSource,
    PackageSpec, Scenario, LOCAL_PACKAGE_MOUNT,
};
use crate::provision::ProvisionConfig;
use crate::scenario::default_probes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Everything a campaign needs to know.
#[derive(Clone, Debug)]
pub struct CampaignPlan {
    pub package: PackageSpec,
    /// Base image, e.g. `node`.
    pub image: String,
    /// Runtime versions; one environment each.
    pub versions: Vec<String>,
    /// Command entry points the package provides.
    pub commands: Vec<String>,
    /// Scenarios run after the default probes.
    pub scenarios: Vec<Scenario>,
    /// Run `--help`/`--version` probes for every command.
    pub default_probes: bool,
    /// Run environments concurrently.
    pub parallel: bool,
    pub provision: ProvisionConfig,
}

impl CampaignPlan {
    /// Scenarios in run order: default probes per command, then supplied scenarios.
    #[must_use]
    pub fn all_scenarios(&self) -> Vec<Scenario> {
        let probes = self
            .commands
            .iter()
            .filter(|_| self.default_probes)
            .flat_map(|command| default_probes(command));
        probes.chain(self.scenarios.iter().cloned()).collect()
    }

    #[must_use]
    pub fn environment_config(&self, version: &str, campaign: CampaignId) -> EnvironmentConfig {
        let mounts = match &self.package.source {
            PackageSource::Local(path) => vec![Mount {
                host: path.clone(),
                container: LOCAL_PACKAGE_MOUNT.to_string(),
                read_only: true,
            }],
            PackageSource::Registry(_) => Vec::new(),
        };
        let tag: String = version
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '-' })
            .collect();
        EnvironmentConfig {
            image: self.image.clone(),
            version: version.to_string(),
            work_root: self.provision.work_root.clone(),
            mounts,
            name: Some(format!("pkgprobe-{}-{tag}", campaign.short())),
        }
    }
}

/// One scenario's outcome, labelled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub name: String,
    #[serde(flatten)]
    pub result: ExecutionResult,
}

/// Outcome of one environment (runtime version).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentReport {
    pub image: String,
    pub version: String,
    /// Set when the environment could not be created or the package not installed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub scenarios: Vec<ScenarioReport>,
}

impl EnvironmentReport {
    fn errored(config: &EnvironmentConfig, error: impl ToString) -> Self {
        Self {
            image: config.image.clone(),
            version: config.version.clone(),
            error: Some(error.to_string()),
            scenarios: Vec::new(),
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.scenarios.iter().all(|s| s.result.passed)
    }
}

/// Aggregated campaign results.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSummary {
    pub campaign_id: CampaignId,
    pub package: String,
    pub environments: Vec<EnvironmentReport>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl CampaignSummary {
    #[must_use]
    pub fn new(campaign_id: CampaignId, package: String, environments: Vec<EnvironmentReport>) -> Self {
        let results = environments.iter().flat_map(|env| &env.scenarios);
        let total = results.clone().count();
        let passed = results.filter(|s| s.result.passed).count();
        Self {
            campaign_id,
            package,
            environments,
            total,
            passed,
            failed: total - passed,
        }
    }

    /// True when every environment came up and every scenario passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.environments.iter().all(EnvironmentReport::passed)
    }

    /// Environments that failed before any scenario could run.
    pub fn environment_errors(&self) -> impl Iterator<Item = &EnvironmentReport> {
        self.environments.iter().filter(|env| env.error.is_some())
    }
}

/// Drives a [`CampaignPlan`] through an [`Isolation`] layer and an [`Engine`].
pub struct CampaignRunner<'a, I: Isolation, E: Executor> {
    isolation: &'a I,
    engine: &'a Engine<E>,
}

impl<'a, I: Isolation, E: Executor> CampaignRunner<'a, I, E> {
    pub fn new(isolation: &'a I, engine: &'a Engine<E>) -> Self {
        Self { isolation, engine }
    }

    pub fn run(&self, plan: &CampaignPlan) -> CampaignSummary {
        let campaign = CampaignId::new();
        let scenarios = plan.all_scenarios();
        let configs: Vec<EnvironmentConfig> = plan
            .versions
            .iter()
            .map(|version| plan.environment_config(version, campaign))
            .collect();
        info!(
            %campaign,
            package = %plan.package.display_name(),
            environments = configs.len(),
            scenarios = scenarios.len(),
            "campaign started"
        );

        let reports = if plan.parallel && configs.len() > 1 {
            std::thread::scope(|scope| {
                let handles: Vec<_> = configs
                    .iter()
                    .map(|config| {
                        let scenarios = &scenarios;
                        scope.spawn(move || self.run_environment(config, &plan.package, scenarios))
                    })
                    .collect();
                handles
                    .into_iter()
                    .zip(&configs)
                    .map(|(handle, config)| {
                        handle.join().unwrap_or_else(|_| {
                            EnvironmentReport::errored(config, "environment worker panicked")
                        })
                    })
                    .collect()
            })
        } else {
            configs
                .iter()
                .map(|config| self.run_environment(config, &plan.package, &scenarios))
                .collect()
        };

        let summary = CampaignSummary::new(campaign, plan.package.display_name(), reports);
        info!(
            %campaign,
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            "campaign finished"
        );
        summary
    }

    fn run_environment(
        &self,
        config: &EnvironmentConfig,
        package: &PackageSpec,
        scenarios: &[Scenario],
    ) -> EnvironmentReport {
        let env = match self.isolation.create_environment(config) {
            Ok(env) => env,
            Err(err) => {
                warn!(image = %config.image_ref(), error = %err, "environment unavailable");
                return EnvironmentReport::errored(config, err);
            }
        };

        let report = match self.isolation.install_package(&env, package) {
            Ok(()) => EnvironmentReport {
                image: config.image.clone(),
                version: config.version.clone(),
                error: None,
                scenarios: self.run_scenarios(&env, scenarios),
            },
            Err(err) => {
                warn!(%env, error = %err, "package install failed");
                EnvironmentReport::errored(config, err)
            }
        };

        if let Err(err) = self.isolation.destroy_environment(&env) {
            warn!(%env, error = %err, "failed to destroy environment");
        }
        report
    }

    fn run_scenarios(&self, env: &EnvironmentRef, scenarios: &[Scenario]) -> Vec<ScenarioReport> {
        scenarios
            .iter()
            .map(|scenario| ScenarioReport {
                name: scenario.name.clone(),
                result: self.engine.run(env, scenario),
            })
            .collect()
    }
}
