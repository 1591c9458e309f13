//! dockside: consolidate warehouse extracts, enrich them with sectors and SLA
//! verdicts, and report the reprocessing watermark.

use clap::{Parser, Subcommand};
use snafu::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

use dockside::config::Config;
use dockside::consolidate::{ConsolidationReport, consolidate};
use dockside::error::{
    AddressParseSnafu, ConfigSnafu, DocksideError, EnrichSnafu, MetricsSnafu, MissingSectionSnafu,
    UnitsFailedSnafu, WatermarkUnavailableSnafu,
};
use dockside::tracing::init_tracing;
use dockside::watermark::{DEFAULT_BATCH_SIZE, DEFAULT_COLUMN, DEFAULT_FORMAT, format_date};
use dockside::{enrich_file, metrics, run_job, second_distinct_max};

/// Shipment extract consolidation and classification tool.
#[derive(Parser, Debug)]
#[command(name = "dockside")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge every dataset's source files into its consolidated output.
    Consolidate,
    /// Print the second most recent distinct date of a file.
    Watermark {
        /// File to scan (default: watermark.file from the configuration).
        #[arg(long)]
        file: Option<PathBuf>,
        /// Date column (default: watermark.column, or data_criterio).
        #[arg(long)]
        column: Option<String>,
    },
    /// Append sector and SLA columns to the configured input file.
    Enrich,
    /// Consolidate, then enrich and print the watermark when configured.
    Run,
    /// Validate the configuration and exit.
    Check,
}

#[snafu::report]
fn main() -> Result<(), DocksideError> {
    let args = Args::parse();

    let config = Config::from_file(&args.config).context(ConfigSnafu)?;
    init_tracing(&args.log_level, config.logging.format);

    if config.metrics.enabled {
        let addr = config.metrics.address.parse().context(AddressParseSnafu)?;
        metrics::init(addr).context(MetricsSnafu)?;
        debug!(
            "Metrics endpoint listening on http://{}/metrics",
            config.metrics.address
        );
    }

    match args.command {
        Command::Check => {
            info!(
                datasets = config.datasets.len(),
                enrich = config.enrich.is_some(),
                watermark = config.watermark.is_some(),
                "Configuration is valid"
            );
            Ok(())
        }
        Command::Consolidate => run_consolidate(&config).map(|_| ()),
        Command::Watermark { file, column } => run_watermark(&config, file, column),
        Command::Enrich => run_enrich(&config),
        Command::Run => {
            run_consolidate(&config)?;
            if config.enrich.is_some() {
                run_enrich(&config)?;
            }
            if config.watermark.is_some() {
                run_watermark(&config, None, None)?;
            }
            Ok(())
        }
    }
}

fn run_consolidate(config: &Config) -> Result<ConsolidationReport, DocksideError> {
    run_job("consolidate", || {
        let report = consolidate(&config.merge_units(), &config.consolidation.options());
        info!(
            units = report.units.len(),
            rows = report.rows_written(),
            "Consolidation finished"
        );
        ensure!(
            report.is_success(),
            UnitsFailedSnafu {
                datasets: report.failed()
            }
        );
        Ok(report)
    })
}

fn run_enrich(config: &Config) -> Result<(), DocksideError> {
    let enrich = config
        .enrich
        .as_ref()
        .context(MissingSectionSnafu { section: "enrich" })
        .context(ConfigSnafu)?;
    let options = config.enrich_options(enrich).context(ConfigSnafu)?;

    run_job("enrich", || {
        enrich_file(
            &enrich.input,
            &enrich.output,
            &options,
            enrich.batch_size,
            enrich.compression,
        )
        .context(EnrichSnafu)
        .map(|_| ())
    })
}

fn run_watermark(
    config: &Config,
    file: Option<PathBuf>,
    column: Option<String>,
) -> Result<(), DocksideError> {
    let section = config.watermark.as_ref();
    let file = match file.or_else(|| section.map(|w| w.file.clone())) {
        Some(file) => file,
        None => {
            return MissingSectionSnafu {
                section: "watermark",
            }
            .fail()
            .context(ConfigSnafu);
        }
    };
    let column = column
        .or_else(|| section.map(|w| w.column.clone()))
        .unwrap_or_else(|| DEFAULT_COLUMN.to_string());
    let format = section.map_or(DEFAULT_FORMAT, |w| w.format.as_str());
    let batch_size = section.map_or(DEFAULT_BATCH_SIZE, |w| w.batch_size);

    let rendered = run_job("penultimate_date", || {
        second_distinct_max(&file, &column, batch_size)
            .and_then(|value| format_date(value, format))
            .context(WatermarkUnavailableSnafu { file: &file })
    })?;

    println!("{rendered}");
    Ok(())
}
