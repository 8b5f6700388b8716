//! pkgprobe CLI: black-box scenario testing for packaged command-line tools.
//!
//! Runs scenario campaigns against Docker environments, or scenario files on the host.

// CLI-specific lint allowances (CLI binary, not library)
#![allow(missing_docs)]
#![allow(clippy::print_stdout)] // CLI must print to stdout
#![allow(clippy::print_stderr)] // CLI must print to stderr
#![allow(clippy::exit)] // CLI uses exit codes

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use miette::{miette, IntoDiagnostic, Report, Result};
use pkgprobe::campaign::{
    load_campaign_config, CampaignConfig, CampaignPlan, CampaignRunner, CampaignSummary,
    DockerIsolation, ScenarioReport,
};
use pkgprobe::engine::{Engine, EventListener, NoopListener};
use pkgprobe::exec::{DockerClient, DockerExecutor, LocalExecutor};
use pkgprobe::model::{EnvironmentRef, PackageSpec, Scenario, DEFAULT_WORK_ROOT};
use pkgprobe::provision::ProvisionConfig;
use pkgprobe::scenario::{default_probes, load_scenario_file};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod progress;

/// Some scenarios failed.
const EXIT_FAILED: i32 = 1;
/// Bad flags, config or scenario files.
const EXIT_USAGE: i32 = 2;
/// At least one environment could not be created or prepared.
const EXIT_ISOLATION: i32 = 3;

const DEFAULT_IMAGE: &str = "node";
const DEFAULT_VERSION: &str = "20";

/// Color output mode
#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and `NO_COLOR` env
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Debug, Parser)]
#[command(
    name = "pkgprobe",
    version,
    about = "Black-box scenario testing for packaged CLI tools"
)]
struct Cli {
    /// Control color output
    #[arg(long, value_enum, default_value = "auto", global = true)]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Install a package in Docker environments and run scenarios against it
    Run(RunArgs),
    /// Run a scenario file directly on the host in a scratch work root
    Local(LocalArgs),
    /// Print the default --help/--version probes for a command as JSON
    Probes {
        #[arg(long, help = "Command to probe")]
        command: String,
    },
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        #[arg(value_enum, help = "Shell to generate completions for")]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long)]
    json: bool,
    #[arg(long, short = 'v', help = "Show per-scenario progress to stderr")]
    verbose: bool,
    #[arg(long, help = "Campaign config file (JSON or YAML); flags override it")]
    config: Option<PathBuf>,
    #[arg(long, help = "Registry package name or local package directory")]
    package: Option<String>,
    #[arg(long, help = "Base image (default: node)")]
    image: Option<String>,
    #[arg(
        long,
        value_delimiter = ',',
        help = "Runtime versions, one environment each (default: 20)"
    )]
    versions: Vec<String>,
    #[arg(long = "command", help = "Command the package provides (repeatable)")]
    commands: Vec<String>,
    #[arg(long, help = "Scenario file (JSON or YAML)")]
    scenarios: Option<PathBuf>,
    #[arg(long, help = "Skip the --help/--version probes")]
    no_default_probes: bool,
    #[arg(long, help = "Run environments concurrently")]
    parallel: bool,
    #[arg(long, help = "Registry URL for installing the package")]
    registry: Option<String>,
    #[arg(long, help = "Name of the environment variable holding a registry token")]
    auth_token_env: Option<String>,
    #[arg(long, help = "Docker Engine socket path")]
    docker_socket: Option<PathBuf>,
    #[arg(long, help = "Work root inside each environment (default: /test)")]
    work_root: Option<String>,
}

#[derive(Debug, Args)]
struct LocalArgs {
    #[arg(long)]
    json: bool,
    #[arg(long, short = 'v', help = "Show per-scenario progress to stderr")]
    verbose: bool,
    #[arg(long, help = "Scenario file (JSON or YAML)")]
    scenarios: PathBuf,
    #[arg(long, help = "Use this directory as work root instead of a temporary one")]
    root: Option<PathBuf>,
}

/// Configure color output based on CLI flag and environment
fn configure_colors(mode: ColorMode) -> bool {
    let use_color = match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            // Respect NO_COLOR environment variable
            if std::env::var("NO_COLOR").is_ok() {
                false
            } else {
                supports_color::on(supports_color::Stream::Stdout).is_some()
            }
        }
    };

    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .color(use_color)
                .unicode(use_color)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set
    use_color
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("PKGPROBE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init()
        .ok();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let color = configure_colors(cli.color);
    match cli.command {
        Commands::Run(args) => cmd_run(args, color),
        Commands::Local(args) => cmd_local(args, color),
        Commands::Probes { command } => cmd_probes(&command),
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

// =============================================================================
// Command Handlers
// =============================================================================

fn cmd_run(args: RunArgs, color: bool) -> Result<()> {
    init_logging(args.verbose);
    let (plan, socket) =
        build_plan(&args).unwrap_or_else(|report| exit_with(EXIT_USAGE, &report));

    let client = DockerClient::new(socket);
    let isolation = DockerIsolation::new(client.clone());
    let engine = Engine::new(DockerExecutor::new(client))
        .with_config(plan.provision.clone())
        .with_listener(listener(args.verbose));
    let summary = CampaignRunner::new(&isolation, &engine).run(&plan);

    if args.json {
        let payload = serde_json::to_string_pretty(&summary).into_diagnostic()?;
        println!("{payload}");
    } else {
        print_campaign(&summary, color);
    }

    if summary.environment_errors().next().is_some() {
        std::process::exit(EXIT_ISOLATION);
    }
    if !summary.all_passed() {
        std::process::exit(EXIT_FAILED);
    }
    Ok(())
}

fn cmd_local(args: LocalArgs, color: bool) -> Result<()> {
    init_logging(args.verbose);
    let scenarios = load_scenario_file(&args.scenarios)
        .unwrap_or_else(|err| exit_with(EXIT_USAGE, &Report::new(err)));

    // Dropping the scratch directory removes it, so it is held until the run is over.
    let scratch = match &args.root {
        Some(_) => None,
        None => Some(
            tempfile::Builder::new()
                .prefix("pkgprobe-")
                .tempdir()
                .into_diagnostic()?,
        ),
    };
    let root = match (&args.root, &scratch) {
        (Some(root), _) => {
            std::fs::create_dir_all(root).into_diagnostic()?;
            root.canonicalize().into_diagnostic()?
        }
        (None, Some(dir)) => dir.path().to_path_buf(),
        (None, None) => return Err(miette!("no work root available")),
    };

    let engine = Engine::new(LocalExecutor::new())
        .with_config(ProvisionConfig::default().with_work_root(root.display().to_string()))
        .with_listener(listener(args.verbose));
    let env = EnvironmentRef::local();
    let reports: Vec<ScenarioReport> = scenarios
        .iter()
        .map(|scenario| ScenarioReport {
            name: scenario.name.clone(),
            result: engine.run(&env, scenario),
        })
        .collect();
    let summary = LocalSummary::new(&root, reports);

    if args.json {
        let payload = serde_json::to_string_pretty(&summary).into_diagnostic()?;
        println!("{payload}");
    } else {
        for report in &summary.scenarios {
            print_scenario(report, color);
        }
        print_totals(summary.total, summary.passed, summary.failed);
    }

    drop(scratch);
    if summary.failed > 0 {
        std::process::exit(EXIT_FAILED);
    }
    Ok(())
}

fn cmd_probes(command: &str) -> Result<()> {
    let probes: Vec<Scenario> = default_probes(command);
    let payload = serde_json::to_string_pretty(&probes).into_diagnostic()?;
    println!("{payload}");
    Ok(())
}

fn cmd_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}

// =============================================================================
// Campaign assembly
// =============================================================================

/// Merge the config file (if any) with flags; flags win.
fn build_plan(args: &RunArgs) -> Result<(CampaignPlan, PathBuf)> {
    let file = match &args.config {
        Some(path) => load_campaign_config(path)?,
        None => CampaignConfig::default(),
    };

    let identifier = args
        .package
        .clone()
        .or(file.package)
        .ok_or_else(|| {
            miette!(
                code = "pkgprobe::cli::missing_package",
                help = "pass --package or set `package` in the --config file",
                "no package to test"
            )
        })?;
    let mut package = PackageSpec::parse(&identifier);
    package.registry_url = args.registry.clone().or(file.registry_url);
    if let Some(var) = args.auth_token_env.clone().or(file.auth_token_env) {
        let token = std::env::var(&var).map_err(|_| {
            miette!(
                code = "pkgprobe::cli::missing_token",
                "auth token variable {var} is not set"
            )
        })?;
        package.auth_token = Some(token);
    }

    let versions = first_non_empty(&args.versions, file.versions)
        .unwrap_or_else(|| vec![DEFAULT_VERSION.to_string()]);
    let commands = first_non_empty(&args.commands, file.commands).unwrap_or_default();
    let scenarios = match args.scenarios.clone().or(file.scenarios) {
        Some(path) => load_scenario_file(&path)?,
        None => Vec::new(),
    };
    let default_probes = !args.no_default_probes && file.default_probes.unwrap_or(true);
    if scenarios.is_empty() && (commands.is_empty() || !default_probes) {
        return Err(miette!(
            code = "pkgprobe::cli::nothing_to_run",
            help = "pass --scenarios, or --command to run the default probes",
            "no scenarios to run"
        ));
    }

    let work_root = args
        .work_root
        .clone()
        .or(file.work_root)
        .unwrap_or_else(|| DEFAULT_WORK_ROOT.to_string());
    let socket = args
        .docker_socket
        .clone()
        .or(file.docker_socket)
        .unwrap_or_else(|| DockerClient::from_env().socket().to_path_buf());

    let plan = CampaignPlan {
        package,
        image: args
            .image
            .clone()
            .or(file.image)
            .unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
        versions,
        commands,
        scenarios,
        default_probes,
        parallel: args.parallel || file.parallel.unwrap_or(false),
        provision: ProvisionConfig::default().with_work_root(work_root),
    };
    Ok((plan, socket))
}

fn first_non_empty(flags: &[String], file: Option<Vec<String>>) -> Option<Vec<String>> {
    if flags.is_empty() {
        file.filter(|values| !values.is_empty())
    } else {
        Some(flags.to_vec())
    }
}

fn listener(verbose: bool) -> Arc<dyn EventListener> {
    if verbose {
        Arc::new(progress::VerboseProgress::new())
    } else {
        Arc::new(NoopListener)
    }
}

fn exit_with(code: i32, report: &Report) -> ! {
    eprintln!("{report:?}");
    std::process::exit(code)
}

// =============================================================================
// Output
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LocalSummary {
    work_root: String,
    scenarios: Vec<ScenarioReport>,
    total: usize,
    passed: usize,
    failed: usize,
}

impl LocalSummary {
    fn new(root: &Path, scenarios: Vec<ScenarioReport>) -> Self {
        let total = scenarios.len();
        let passed = scenarios.iter().filter(|s| s.result.passed).count();
        Self {
            work_root: root.display().to_string(),
            scenarios,
            total,
            passed,
            failed: total - passed,
        }
    }
}

fn print_campaign(summary: &CampaignSummary, color: bool) {
    println!(
        "{} (campaign {})",
        summary.package,
        summary.campaign_id.short()
    );
    for env in &summary.environments {
        match &env.error {
            Some(error) => println!(
                "{} {}:{}: {error}",
                mark(false, color),
                env.image,
                env.version
            ),
            None => {
                println!("{}:{}", env.image, env.version);
                for report in &env.scenarios {
                    print_scenario(report, color);
                }
            }
        }
    }
    print_totals(summary.total, summary.passed, summary.failed);
}

fn print_scenario(report: &ScenarioReport, color: bool) {
    let result = &report.result;
    match &result.error {
        None => println!(
            "  {} {} ({}ms)",
            mark(true, color),
            report.name,
            result.duration_ms
        ),
        Some(error) => println!(
            "  {} {} ({}ms): {error}",
            mark(result.passed, color),
            report.name,
            result.duration_ms
        ),
    }
}

fn print_totals(total: usize, passed: usize, failed: usize) {
    println!("{total} scenarios: {passed} passed, {failed} failed");
}

fn mark(passed: bool, color: bool) -> &'static str {
    match (passed, color) {
        (true, true) => "\x1b[32mPASS\x1b[0m",
        (false, true) => "\x1b[31mFAIL\x1b[0m",
        (true, false) => "PASS",
        (false, false) => "FAIL",
    }
}
