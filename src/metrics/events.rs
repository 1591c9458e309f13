//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in a job. Events
//! implement the `InternalEvent` trait which records the corresponding
//! Prometheus metric.

use metrics::{counter, gauge, histogram};
use std::time::Duration;
use tracing::trace;

use crate::classify::SlaVerdict;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Outcome of a merge unit or job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Skipped,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Skipped => "skipped",
            RunStatus::Failed => "failed",
        }
    }
}

// ============================================================================
// Read / write events
// ============================================================================

/// Event emitted when record batches are decoded from a Parquet file.
pub struct BatchesRead {
    pub count: u64,
}

impl InternalEvent for BatchesRead {
    fn emit(self) {
        trace!(count = self.count, "Batches read");
        counter!("dockside_batches_read_total").increment(self.count);
    }
}

/// Event emitted when a Parquet writer is closed.
pub struct ParquetWriteCompleted {
    pub duration: Duration,
}

impl InternalEvent for ParquetWriteCompleted {
    fn emit(self) {
        trace!(
            duration_ms = self.duration.as_millis(),
            "Parquet write completed"
        );
        histogram!("dockside_parquet_close_duration_seconds").record(self.duration.as_secs_f64());
    }
}

// ============================================================================
// Consolidation events
// ============================================================================

/// Event emitted when rows are appended to a consolidated output.
pub struct RowsConsolidated<'a> {
    pub dataset: &'a str,
    pub count: u64,
}

impl InternalEvent for RowsConsolidated<'_> {
    fn emit(self) {
        trace!(dataset = self.dataset, count = self.count, "Rows consolidated");
        counter!("dockside_rows_consolidated_total", "dataset" => self.dataset.to_string())
            .increment(self.count);
    }
}

/// Event emitted when candidate files are consumed by a committed merge.
pub struct FilesConsolidated<'a> {
    pub dataset: &'a str,
    pub count: u64,
}

impl InternalEvent for FilesConsolidated<'_> {
    fn emit(self) {
        trace!(dataset = self.dataset, count = self.count, "Files consolidated");
        counter!("dockside_files_consolidated_total", "dataset" => self.dataset.to_string())
            .increment(self.count);
    }
}

/// Event emitted when a merge unit finishes, whatever the outcome.
pub struct MergeUnitCompleted<'a> {
    pub dataset: &'a str,
    pub status: RunStatus,
    pub duration: Duration,
}

impl InternalEvent for MergeUnitCompleted<'_> {
    fn emit(self) {
        trace!(
            dataset = self.dataset,
            status = self.status.as_str(),
            duration_ms = self.duration.as_millis(),
            "Merge unit completed"
        );
        counter!(
            "dockside_merge_units_total",
            "dataset" => self.dataset.to_string(),
            "status" => self.status.as_str()
        )
        .increment(1);
        histogram!("dockside_merge_unit_duration_seconds", "dataset" => self.dataset.to_string())
            .record(self.duration.as_secs_f64());
    }
}

/// Event emitted with the row count of a freshly committed output.
pub struct ConsolidatedOutputRows<'a> {
    pub dataset: &'a str,
    pub rows: u64,
}

impl InternalEvent for ConsolidatedOutputRows<'_> {
    fn emit(self) {
        trace!(dataset = self.dataset, rows = self.rows, "Consolidated output rows");
        gauge!("dockside_consolidated_output_rows", "dataset" => self.dataset.to_string())
            .set(self.rows as f64);
    }
}

// ============================================================================
// Enrichment events
// ============================================================================

/// Event emitted when rows receive a sector label.
pub struct RowsClassified {
    pub count: u64,
}

impl InternalEvent for RowsClassified {
    fn emit(self) {
        trace!(count = self.count, "Rows classified");
        counter!("dockside_rows_classified_total").increment(self.count);
    }
}

/// Event emitted per verdict with the number of rows that received it.
pub struct SlaVerdictsAssigned {
    pub verdict: SlaVerdict,
    pub count: u64,
}

impl InternalEvent for SlaVerdictsAssigned {
    fn emit(self) {
        trace!(verdict = self.verdict.label(), count = self.count, "SLA verdicts assigned");
        counter!("dockside_sla_verdicts_total", "verdict" => self.verdict.label())
            .increment(self.count);
    }
}

// ============================================================================
// Watermark and job events
// ============================================================================

/// Event emitted when a watermark lookup finishes.
pub struct WatermarkResolved {
    pub found: bool,
}

impl InternalEvent for WatermarkResolved {
    fn emit(self) {
        let found = if self.found { "true" } else { "false" };
        trace!(found, "Watermark resolved");
        counter!("dockside_watermark_lookups_total", "found" => found).increment(1);
    }
}

/// Event emitted when a wrapped job finishes.
pub struct JobCompleted<'a> {
    pub job: &'a str,
    pub status: RunStatus,
    pub duration: Duration,
}

impl InternalEvent for JobCompleted<'_> {
    fn emit(self) {
        trace!(
            job = self.job,
            status = self.status.as_str(),
            duration_ms = self.duration.as_millis(),
            "Job completed"
        );
        counter!(
            "dockside_jobs_total",
            "job" => self.job.to_string(),
            "status" => self.status.as_str()
        )
        .increment(1);
        histogram!("dockside_job_duration_seconds", "job" => self.job.to_string())
            .record(self.duration.as_secs_f64());
    }
}
