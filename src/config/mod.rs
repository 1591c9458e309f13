//! Configuration parsing and validation.
//!
//! Loads the YAML configuration (with environment variable interpolation)
//! that maps logical datasets to their source and destination directories
//! and tunes the consolidation, enrichment, and watermark steps.

mod vars;

pub use vars::interpolate;

use chrono::NaiveTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::classify::{ColumnNames, EnrichOptions, SHIPPED_STATUS};
use crate::consolidate::{ConsolidateOptions, MergeUnit};
use crate::error::{
    ConfigError, DuplicateDestinationSnafu, EmptyDatasetNameSnafu, EmptyDestinationSnafu,
    EmptyRulesSnafu, InvalidBatchSizeSnafu, InvalidBoxRangeSnafu, InvalidDateFormatSnafu,
    InvalidTimeOfDaySnafu, NoSourcesSnafu, ReadFileSnafu, YamlParseSnafu,
};
use crate::rules::{
    BoxRange, ClassificationRule, DEFAULT_SECTOR, DeadlineRule, ShiftedDeadline, sector_rules,
    sla_rules, validate_sector_rules,
};
use crate::watermark::is_valid_format;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Logical dataset name -> source directories and destination.
    /// Order is preserved; datasets are consolidated in declaration order.
    #[serde(default)]
    pub datasets: IndexMap<String, DatasetConfig>,
    #[serde(default)]
    pub consolidation: ConsolidationConfig,
    #[serde(default)]
    pub watermark: Option<WatermarkConfig>,
    #[serde(default)]
    pub enrich: Option<EnrichConfig>,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Source directories and destination of one logical dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    pub sources: Vec<PathBuf>,
    pub destination: PathBuf,
}

/// Settings for the streaming consolidator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsolidationConfig {
    /// Rows read per chunk (default: 50000).
    #[serde(default = "default_consolidation_batch_size")]
    pub batch_size: usize,
    /// Output compression codec (default: snappy).
    #[serde(default)]
    pub compression: ParquetCompression,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_consolidation_batch_size(),
            compression: ParquetCompression::default(),
        }
    }
}

impl ConsolidationConfig {
    pub fn options(&self) -> ConsolidateOptions {
        ConsolidateOptions {
            batch_size: self.batch_size,
            compression: self.compression,
        }
    }
}

fn default_consolidation_batch_size() -> usize {
    50_000
}

/// Settings for the second-most-recent date lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatermarkConfig {
    /// Consolidated file to scan.
    pub file: PathBuf,
    /// Date column (default: data_criterio).
    #[serde(default = "default_watermark_column")]
    pub column: String,
    /// strftime format for the rendered date (default: %d/%m/%Y).
    #[serde(default = "default_watermark_format")]
    pub format: String,
    /// Rows read per chunk (default: 65536).
    #[serde(default = "default_watermark_batch_size")]
    pub batch_size: usize,
}

fn default_watermark_column() -> String {
    "data_criterio".to_string()
}

fn default_watermark_format() -> String {
    "%d/%m/%Y".to_string()
}

fn default_watermark_batch_size() -> usize {
    64 * 1024
}

/// Settings for sector/SLA enrichment of a consolidated file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrichConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(default = "default_sector")]
    pub default_sector: String,
    #[serde(default = "default_sector_column")]
    pub sector_column: String,
    #[serde(default = "default_sla_column")]
    pub sla_column: String,
    /// Status value marking a shipment as dispatched.
    #[serde(default = "default_shipped_status")]
    pub shipped_status: String,
    #[serde(default)]
    pub columns: ColumnNames,
    #[serde(default = "default_consolidation_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub compression: ParquetCompression,
}

fn default_sector() -> String {
    DEFAULT_SECTOR.to_string()
}

fn default_sector_column() -> String {
    "setor".to_string()
}

fn default_sla_column() -> String {
    "sla".to_string()
}

fn default_shipped_status() -> String {
    SHIPPED_STATUS.to_string()
}

/// Optional overrides of the reference rule tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    /// Sector rules in evaluation order (first match wins).
    #[serde(default)]
    pub sectors: Option<Vec<ClassificationRule>>,
    /// Deadline rules in evaluation order (last match wins).
    #[serde(default)]
    pub deadlines: Option<Vec<DeadlineRuleConfig>>,
}

impl RulesConfig {
    /// Configured sector rules, or the reference table.
    pub fn sector_rules(&self) -> Vec<ClassificationRule> {
        self.sectors.clone().unwrap_or_else(sector_rules)
    }

    /// Configured deadline rules, or the reference table.
    pub fn deadline_rules(&self) -> Result<Vec<DeadlineRule>, ConfigError> {
        match &self.deadlines {
            Some(rules) => rules.iter().map(DeadlineRuleConfig::to_rule).collect(),
            None => Ok(sla_rules()),
        }
    }
}

/// A deadline rule declared in YAML: shift by `days`, due at `at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeadlineRuleConfig {
    pub box_range: BoxRange,
    #[serde(default)]
    pub days: u32,
    /// Time of day, `HH:MM` or `HH:MM:SS`.
    pub at: String,
}

impl DeadlineRuleConfig {
    pub fn to_rule(&self) -> Result<DeadlineRule, ConfigError> {
        ensure!(
            self.box_range.is_valid(),
            InvalidBoxRangeSnafu {
                start: self.box_range.start,
                end: self.box_range.end,
            }
        );
        let time_of_day = parse_time_of_day(&self.at)?;
        Ok(DeadlineRule::new(
            self.box_range,
            ShiftedDeadline::new(self.days, time_of_day),
        ))
    }
}

fn parse_time_of_day(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
        .context(InvalidTimeOfDaySnafu { value })
}

/// Metrics configuration for the Prometheus endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Whether to expose metrics (default: false).
    #[serde(default)]
    pub enabled: bool,
    /// Address to bind the metrics HTTP listener (default: "0.0.0.0:9090").
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_metrics_address(),
        }
    }
}

fn default_metrics_address() -> String {
    "0.0.0.0:9090".to_string()
}

/// Log output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Log line format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Parquet compression codec.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    Uncompressed,
    #[default]
    Snappy,
    Gzip,
    Zstd,
    Lz4,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration text, interpolating `${VAR}` references first.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let content = interpolate(content)?;
        let config: Config = serde_yaml::from_str(&content).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let mut destinations: HashMap<&Path, Vec<String>> = HashMap::new();
        for (name, dataset) in &self.datasets {
            ensure!(!name.trim().is_empty(), EmptyDatasetNameSnafu);
            ensure!(
                !dataset.sources.is_empty(),
                NoSourcesSnafu { dataset: name }
            );
            ensure!(
                !dataset.destination.as_os_str().is_empty(),
                EmptyDestinationSnafu { dataset: name }
            );
            destinations
                .entry(dataset.destination.as_path())
                .or_default()
                .push(name.clone());
        }

        if let Some((destination, datasets)) =
            destinations.into_iter().find(|(_, names)| names.len() > 1)
        {
            return DuplicateDestinationSnafu {
                destination,
                datasets,
            }
            .fail();
        }

        ensure!(
            self.consolidation.batch_size > 0,
            InvalidBatchSizeSnafu {
                section: "consolidation"
            }
        );
        if let Some(watermark) = &self.watermark {
            ensure!(
                watermark.batch_size > 0,
                InvalidBatchSizeSnafu {
                    section: "watermark"
                }
            );
            ensure!(
                is_valid_format(&watermark.format),
                InvalidDateFormatSnafu {
                    format: &watermark.format
                }
            );
        }
        if let Some(enrich) = &self.enrich {
            ensure!(
                enrich.batch_size > 0,
                InvalidBatchSizeSnafu { section: "enrich" }
            );
        }

        if let Some(sectors) = &self.rules.sectors {
            ensure!(!sectors.is_empty(), EmptyRulesSnafu { table: "sectors" });
            validate_sector_rules(sectors);
        }
        if let Some(deadlines) = &self.rules.deadlines {
            ensure!(!deadlines.is_empty(), EmptyRulesSnafu { table: "deadlines" });
        }
        for rule in self.rules.sectors.iter().flatten() {
            if let Some(range) = rule.box_range {
                ensure!(
                    range.is_valid(),
                    InvalidBoxRangeSnafu {
                        start: range.start,
                        end: range.end,
                    }
                );
            }
        }
        self.rules.deadline_rules()?;

        Ok(())
    }

    /// Merge units for every configured dataset, in declaration order.
    pub fn merge_units(&self) -> Vec<MergeUnit> {
        self.datasets
            .iter()
            .map(|(name, dataset)| {
                MergeUnit::new(name, dataset.sources.clone(), &dataset.destination)
            })
            .collect()
    }

    /// Enrichment options built from the `enrich` and `rules` sections.
    pub fn enrich_options(&self, enrich: &EnrichConfig) -> Result<EnrichOptions, ConfigError> {
        Ok(EnrichOptions {
            sector_rules: self.rules.sector_rules(),
            deadline_rules: self.rules.deadline_rules()?,
            default_sector: enrich.default_sector.clone(),
            shipped_status: enrich.shipped_status.clone(),
            columns: enrich.columns.clone(),
            sector_column: enrich.sector_column.clone(),
            sla_column: enrich.sla_column.clone(),
        })
    }
}
