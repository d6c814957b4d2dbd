use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use patching_monitoring::alertmanager::{Action, SilenceManager, SilenceOutcome, SilenceRequest};
use patching_monitoring::config::{AlertmanagerConfig, FileConfig, PartialAlertmanagerConfig};
use patching_monitoring::logging::init_logging;
use patching_monitoring::version::VERSION;
use patching_monitoring::{GlueError, Result};

/// Silences alerts for a set of targets during maintenance, or lifts those silences again.
#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "PATCHING_MONITORING_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for daily-rotated JSON logs
    #[arg(long, env = "LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// `disable` creates silences, `enable` removes them
    #[arg(long, env = "SILENCE_ACTION")]
    action: String,

    /// Target alias; repeat the flag or pass a comma-separated list
    #[arg(long = "target", env = "SILENCE_TARGETS", value_delimiter = ',')]
    targets: Vec<String>,

    /// With `enable`, only remove silences for the given targets
    #[arg(long)]
    only_listed_targets: bool,

    #[command(flatten)]
    alertmanager: PartialAlertmanagerConfig,
}

async fn run(args: Args, file: PartialAlertmanagerConfig) -> Result<()> {
    let action: Action = args.action.parse()?;
    let config = AlertmanagerConfig::resolve(args.alertmanager, file)?;
    let targets: Vec<String> = args
        .targets
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    info!(
        server = %config.server,
        action = ?action,
        targets = targets.len(),
        "Resolved Alertmanager configuration."
    );

    let manager = SilenceManager::new(&config)?;
    let request = SilenceRequest {
        action,
        targets,
        duration: config.silence_duration,
        units: config.silence_units.clone(),
        only_listed_targets: args.only_listed_targets,
    };

    let report = match manager.execute(&request).await? {
        SilenceOutcome::Created(ids) => json!({ "created": ids }),
        SilenceOutcome::Removed(ids) => json!({ "removed": ids }),
    };
    println!("{report:#}");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Before parsing, so `.env` values reach the `env = ...` flags.
    dotenv::dotenv().ok();
    let args = Args::parse();

    let file_config = match FileConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging("alert-silence", args.log_dir.as_deref().or(file_config.log_dir.as_deref()));
    info!(version = VERSION, "Starting alert silence manager...");

    match run(args, file_config.alertmanager).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let GlueError::SilenceBatch { succeeded, .. } = &e {
                warn!(succeeded = ?succeeded, "Batch partially applied; these silences were not rolled back.");
            }
            error!(error = %e, "Silence operation failed.");
            ExitCode::FAILURE
        }
    }
}
