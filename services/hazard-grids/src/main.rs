//! Hazard grids batch tool.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hazard_grids::cli::{Cli, Command};
use hazard_grids::config::HazardConfig;
use hazard_grids::pipeline::{
    failure_kind, forecast_products, rain_products, wind_products, write_products,
};
use hazard_grids::workflow::{impact_workflow, write_diagram, DiagramFormat, DEFAULT_DIAGRAM_FILE};

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.common.log_level, cli.common.log_json)?;
    netcdf_parser::silence_hdf5_errors();

    if let Err(err) = run(&cli) {
        error!(kind = failure_kind(&err), error = %format!("{:#}", err), "Run failed");
        return Err(err);
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = HazardConfig::load(cli.common.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    info!(
        domain = %config.domain,
        start = %config.start_date,
        end = %config.end_date,
        output_dir = %config.output_dir.display(),
        "Starting hazard-grids"
    );
    let started = Instant::now();

    match &cli.command {
        Command::Wind { .. } => write_products(&wind_products(&config)?)?,
        Command::Rain { .. } => write_products(&rain_products(&config)?)?,
        Command::Forecast { .. } => write_products(&forecast_products(&config)?)?,
        Command::Workflow {
            output,
            format,
            variable,
        } => {
            let graph = impact_workflow(config.domain, variable);
            match (output, format) {
                (None, DiagramFormat::Dot) => print!("{}", graph),
                _ => {
                    let path = output
                        .clone()
                        .unwrap_or_else(|| DEFAULT_DIAGRAM_FILE.into());
                    for written in write_diagram(&graph, &path, *format)? {
                        info!(path = %written.display(), "Workflow diagram written");
                    }
                }
            }
        }
    }

    info!(elapsed_secs = started.elapsed().as_secs_f64(), "Done");
    Ok(())
}

/// Log to stderr, leaving stdout for command output.
fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}
