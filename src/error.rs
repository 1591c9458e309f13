//! Error types for dockside using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;
use std::path::PathBuf;

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Dataset name is empty.
    #[snafu(display("Dataset names cannot be empty"))]
    EmptyDatasetName,

    /// Dataset declares no source directory.
    #[snafu(display("Dataset '{dataset}' has no source directories"))]
    NoSources { dataset: String },

    /// Dataset destination is empty.
    #[snafu(display("Dataset '{dataset}' has an empty destination"))]
    EmptyDestination { dataset: String },

    /// Two datasets write into the same destination directory.
    #[snafu(display(
        "Datasets {} share destination {}",
        datasets.join(", "),
        destination.display()
    ))]
    DuplicateDestination {
        destination: PathBuf,
        datasets: Vec<String>,
    },

    /// Batch size must be positive.
    #[snafu(display("{section}.batch_size must be greater than zero"))]
    InvalidBatchSize { section: String },

    /// Time of day is not `HH:MM` or `HH:MM:SS`.
    #[snafu(display("Invalid time of day '{value}' (expected HH:MM or HH:MM:SS)"))]
    InvalidTimeOfDay { value: String },

    /// Watermark format is not a valid strftime pattern.
    #[snafu(display("Invalid watermark date format '{format}'"))]
    InvalidDateFormat { format: String },

    /// Box range with start after end.
    #[snafu(display("Invalid box range [{start}, {end}]: start is greater than end"))]
    InvalidBoxRange { start: i64, end: i64 },

    /// A configured rule table has no rules.
    #[snafu(display("rules.{table} must contain at least one rule"))]
    EmptyRules { table: String },

    /// A command needs a config section that is absent.
    #[snafu(display("Configuration section '{section}' is required for this command"))]
    MissingSection { section: String },
}

// ============ Reader Errors ============

/// Errors that can occur while reading Parquet input in chunks.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReaderError {
    /// Input file could not be opened.
    #[snafu(display("Failed to open {}", path.display()))]
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File is not valid Parquet or the reader could not be configured.
    #[snafu(display("Failed to build Parquet reader for {}", path.display()))]
    ReaderBuild {
        path: PathBuf,
        source: parquet::errors::ParquetError,
    },

    /// Requested column is absent from the file schema.
    #[snafu(display("Column '{column}' not found in {}", path.display()))]
    MissingColumn { path: PathBuf, column: String },

    /// Failed to decode a record batch.
    #[snafu(display("Failed to read batch from {}", path.display()))]
    ReadBatch {
        path: PathBuf,
        source: arrow::error::ArrowError,
    },
}

// ============ Parquet Errors ============

/// Errors that can occur during Parquet file writing.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ParquetError {
    /// Output file could not be created.
    #[snafu(display("Failed to create output file {}", path.display()))]
    CreateFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to create Parquet writer.
    #[snafu(display("Failed to create Parquet writer for {}", path.display()))]
    WriterCreate {
        path: PathBuf,
        source: parquet::errors::ParquetError,
    },

    /// Parquet write error.
    #[snafu(display("Parquet write error"))]
    Write {
        source: parquet::errors::ParquetError,
    },

    /// A chunk does not match the schema fixed by the first chunk.
    #[snafu(display(
        "Schema mismatch writing {}: expected {expected}, found {found}",
        path.display()
    ))]
    SchemaMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// Writer was used after being closed.
    #[snafu(display("Parquet writer is already closed"))]
    WriterClosed,
}

// ============ Consolidation Errors ============

/// Errors that abort consolidation of a single merge unit.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConsolidateError {
    /// Destination directory could not be created.
    #[snafu(display("Failed to create destination {}", path.display()))]
    CreateDestination {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A directory could not be listed.
    #[snafu(display("Failed to list {}", path.display()))]
    ListDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A candidate file could not be read.
    #[snafu(display("Failed to read candidate file"))]
    SourceRead { source: ReaderError },

    /// The consolidated output could not be written.
    #[snafu(display("Failed to write consolidated output"))]
    OutputWrite { source: ParquetError },

    /// Staging file could not be promoted to the final output.
    #[snafu(display("Failed to commit {} to {}", from.display(), to.display()))]
    Commit {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    /// Output was committed but some consumed files could not be removed.
    #[snafu(display(
        "Output committed but {} consumed file(s) could not be removed",
        paths.len()
    ))]
    Cleanup { paths: Vec<PathBuf> },
}

// ============ Enrichment Errors ============

/// Errors that can occur while enriching a file with sector and SLA columns.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EnrichError {
    /// Input could not be read.
    #[snafu(display("Failed to read enrichment input"))]
    EnrichRead { source: ReaderError },

    /// Output could not be written.
    #[snafu(display("Failed to write enrichment output"))]
    EnrichWrite { source: ParquetError },

    /// Input already carries a column with the derived column's name.
    #[snafu(display("Input already has a column named '{column}'"))]
    ColumnExists { column: String },

    /// Enriched batch could not be assembled.
    #[snafu(display("Failed to build enriched batch"))]
    BatchBuild { source: arrow::error::ArrowError },

    /// Staging file could not be promoted to the enrichment output.
    #[snafu(display("Failed to move {} to {}", from.display(), to.display()))]
    EnrichCommit {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },
}

// ============ Top-level Error ============

/// Top-level errors surfaced by the command-line entry point.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DocksideError {
    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },

    /// Address parsing error.
    #[snafu(display("Failed to parse metrics address"))]
    AddressParse { source: std::net::AddrParseError },

    /// Metrics error.
    #[snafu(display("Metrics error"))]
    Metrics { source: MetricsError },

    /// Enrichment error.
    #[snafu(display("Enrichment error"))]
    Enrich { source: EnrichError },

    /// One or more merge units failed.
    #[snafu(display("Consolidation failed for: {}", datasets.join(", ")))]
    UnitsFailed { datasets: Vec<String> },

    /// The watermark could not be determined.
    #[snafu(display("Could not determine the second most recent date in {}", file.display()))]
    WatermarkUnavailable { file: PathBuf },
}
