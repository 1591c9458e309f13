//! dockside: shipment classification and streaming Parquet consolidation.
//!
//! The library provides:
//!
//! - ordered rule tables assigning each shipment a sector (first match wins)
//!   and an SLA verdict (last match wins)
//! - a streaming consolidator merging many small Parquet extracts per
//!   dataset into one file, deleting sources only after a clean commit
//! - a constant-memory lookup of the second most recent date in a file
//!
//! # Example
//!
//! ```ignore
//! use dockside::{Config, consolidate::{ConsolidateOptions, consolidate}};
//!
//! let config = Config::from_file("dockside.yaml")?;
//! let report = consolidate(&config.merge_units(), &config.consolidation.options());
//! for name in report.failed() {
//!     eprintln!("{name} failed");
//! }
//! ```

pub mod classify;
pub mod coerce;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod job;
pub mod metrics;
pub mod rules;
pub mod sink;
pub mod source;
pub mod tracing;
pub mod watermark;

// Re-export main types
pub use classify::{EnrichOptions, SlaVerdict, classify, enrich_batch, enrich_file, evaluate_sla};
pub use config::Config;
pub use consolidate::{ConsolidationReport, MergeOutcome, MergeUnit, consolidate};
pub use job::run_job;
pub use watermark::{penultimate_date, second_distinct_max};
