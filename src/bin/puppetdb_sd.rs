use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use patching_monitoring::Result;
use patching_monitoring::config::{FileConfig, PartialPuppetDbConfig, PuppetDbConfig};
use patching_monitoring::logging::init_logging;
use patching_monitoring::puppetdb::{PuppetDbClient, query};
use patching_monitoring::scrape_config::{self, ResourceRecord};
use patching_monitoring::version::VERSION;

/// Emits Prometheus file_sd target groups for the scrape jobs exported to PuppetDB.
#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "PATCHING_MONITORING_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for daily-rotated JSON logs
    #[arg(long, env = "LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(flatten)]
    puppetdb: PartialPuppetDbConfig,
}

async fn run(flags: PartialPuppetDbConfig, file: PartialPuppetDbConfig) -> Result<()> {
    let config = PuppetDbConfig::resolve(flags, file)?;
    info!(
        server = %config.server,
        port = config.port,
        certname = %config.certname,
        monitoring_fact = %config.monitoring_fact,
        "Resolved PuppetDB configuration."
    );

    let client = PuppetDbClient::new(&config)?;
    let pql = query::exported_scrape_jobs(&config.resource_type, &config.monitoring_fact);
    let records: Vec<ResourceRecord> = client.query(&pql).await?;

    let groups = scrape_config::aggregate(records)?;
    let document = scrape_config::render(&groups)?;

    match &config.output {
        Some(path) => scrape_config::write_atomically(path, &document)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(document.as_bytes())?;
            stdout.flush()?;
        }
    }
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

    init_logging("puppetdb-sd", args.log_dir.as_deref().or(file_config.log_dir.as_deref()));
    info!(version = VERSION, "Starting PuppetDB service discovery...");

    match run(args.puppetdb, file_config.puppetdb).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Service discovery failed.");
            ExitCode::FAILURE
        }
    }
}
