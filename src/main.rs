//! fabric-vrf CLI entrypoint.
//!
//! This is the main entrypoint for the fabric-vrf command-line tool.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use fabric_vrf::cli::{Cli, Commands, OutputFormatter};
use fabric_vrf::config::{
    ConfigHasher, ConfigParser, ConfigValidator, Credentials, Target, TaskConfig, ValidatedConfig,
    VerbConfig, find_config_file,
};
use fabric_vrf::controller::RestClient;
use fabric_vrf::error::Result;
use fabric_vrf::model::Verb;
use fabric_vrf::reconciler::{Reconciler, RunOptions};

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    init_logging(cli.verbose, cli.log_json);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` wins over the verbosity flag when set.
fn init_logging(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point. Returns whether the command succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let formatter = OutputFormatter::new(cli.output);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Validate => cmd_validate(config, &formatter),
        Commands::Plan => cmd_plan(config, &formatter).await,
        Commands::Apply { state } => cmd_apply(config, state, &formatter).await,
        Commands::Query { fabric, vrf, wait } => cmd_query(config, fabric, vrf, wait, &formatter).await,
        Commands::Wait {
            fabric,
            vrf,
            retries,
            delay,
        } => cmd_wait(config, &fabric, &vrf, retries, delay, &formatter).await,
    }
}

/// Validate the task file.
fn cmd_validate(config_path: Option<&Path>, formatter: &OutputFormatter) -> Result<bool> {
    let task = load_task(config_path)?;
    let validated = ConfigValidator::new().validate(&task)?;

    println!("{}", formatter.format_validation(&validated));
    Ok(validated.is_valid())
}

/// Show the plan for the task.
async fn cmd_plan(config_path: Option<&Path>, formatter: &OutputFormatter) -> Result<bool> {
    let task = load_task(config_path)?;
    let validated = ConfigValidator::new().validate(&task)?;
    if !validated.is_valid() {
        println!("{}", formatter.format_validation(&validated));
    }

    let client = connect(&task)?;
    let reconciler = Reconciler::connect(&client, &task.controller).await?;

    let config_hash = ConfigHasher::new().hash_task(&task);
    let (diff, plan) = reconciler.plan(&validated, &config_hash).await?;

    println!("{}", formatter.format_plan(&plan, &diff));
    Ok(diff.conflicts.is_empty() && validated.is_valid())
}

/// Run the task.
async fn cmd_apply(config_path: Option<&Path>, state: Option<Verb>, formatter: &OutputFormatter) -> Result<bool> {
    let mut task = load_task(config_path)?;
    if let Some(state) = state {
        info!("Overriding state with {state}");
        task.state = state;
    }

    let client = connect(&task)?;
    let reconciler = Reconciler::connect(&client, &task.controller).await?;
    let result = reconciler.run_task(&task).await;

    println!("{}", formatter.format_result(&result));
    Ok(!result.failed)
}

/// Query current state.
async fn cmd_query(
    config_path: Option<&Path>,
    fabric: Option<String>,
    vrf: Option<String>,
    wait: bool,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let mut task = load_task(config_path)?;
    task.state = Verb::Query;
    let mut options = RunOptions::from_task(&task);
    options.wait.enabled |= wait;

    let validated = match fabric {
        Some(fabric) => ValidatedConfig {
            desired: VerbConfig::Query(vec![Target {
                fabric,
                vrf_name: vrf,
                switches: Vec::new(),
            }]),
            errors: Vec::new(),
            rejected: Vec::new(),
        },
        None => ConfigValidator::new().validate(&task)?,
    };

    let client = connect(&task)?;
    let reconciler = Reconciler::connect(&client, &task.controller).await?;
    let config_hash = ConfigHasher::new().hash_task(&task);
    let result = reconciler.run(&validated, &config_hash, &options).await;

    println!("{}", formatter.format_result(&result));
    Ok(!result.failed)
}

/// Wait for one VRF to deploy.
async fn cmd_wait(
    config_path: Option<&Path>,
    fabric: &str,
    vrf: &str,
    retries: Option<u32>,
    delay: Option<u64>,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let task = load_task(config_path)?;
    let mut wait = task.wait.clone();
    if let Some(retries) = retries {
        wait.retries = retries;
    }
    if let Some(delay) = delay {
        wait.delay_secs = delay;
    }

    let client = connect(&task)?;
    let reconciler = Reconciler::connect(&client, &task.controller).await?;
    let report = reconciler.wait_for(fabric, vrf, &wait).await?;

    println!("{}", formatter.format_wait(&report));
    Ok(report.outcome.is_converged())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the task file path.
fn resolve_config_path(config_path: Option<&Path>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.to_path_buf()))
}

/// Loads the task file, its `.env` and environment overrides.
fn load_task(config_path: Option<&Path>) -> Result<TaskConfig> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading task from: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(config_file.parent().unwrap_or_else(|| Path::new(".")));
    parser.load_dotenv()?;
    parser.load_with_env(&config_file)
}

/// Creates the REST client for the task's controller.
fn connect(task: &TaskConfig) -> Result<RestClient> {
    let credentials: Credentials = ConfigParser::credentials(task)?;
    RestClient::new(&task.controller, credentials)
}
