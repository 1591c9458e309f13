//! Streaming consolidation of many small Parquet files into one per dataset.
//!
//! Each merge unit is processed independently:
//!
//! 1. discover candidates in the destination and every source directory
//! 2. stream the existing output, then every candidate, chunk by chunk into
//!    a staging file next to the output
//! 3. close the writer and rename the staging file over the output
//! 4. delete the consumed candidates
//!
//! Any failure before step 3 removes the staging file and leaves the
//! previous output and every candidate untouched, so the unit can simply be
//! retried. Peak memory is bounded by the chunk size, not by the corpus.

mod unit;

pub use unit::{MergeUnit, OUTPUT_SUFFIX};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use snafu::{Report, prelude::*};
use tracing::{error, info, info_span, warn};

use crate::config::ParquetCompression;
use crate::emit;
use crate::error::{
    CleanupSnafu, CommitSnafu, ConsolidateError, CreateDestinationSnafu, OutputWriteSnafu,
    SourceReadSnafu,
};
use crate::metrics::events::{
    ConsolidatedOutputRows, FilesConsolidated, MergeUnitCompleted, RowsConsolidated, RunStatus,
};
use crate::sink::{LazyParquetWriter, ParquetWriterConfig};
use crate::source::{ChunkReader, ChunkReaderConfig};

/// Tuning shared by every unit of a consolidation run.
#[derive(Debug, Clone, Copy)]
pub struct ConsolidateOptions {
    /// Rows per chunk read, and per row group written.
    pub batch_size: usize,
    pub compression: ParquetCompression,
}

impl Default for ConsolidateOptions {
    fn default() -> Self {
        Self {
            batch_size: 50_000,
            compression: ParquetCompression::default(),
        }
    }
}

/// Counts for a committed merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeStats {
    /// Candidate files consumed.
    pub files: usize,
    /// Rows in the new output, carried rows included.
    pub rows: usize,
    /// Rows copied over from the previous output.
    pub carried_rows: usize,
    pub output: PathBuf,
}

/// What happened to a unit that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No candidate files; nothing was touched.
    Skipped,
    Merged(MergeStats),
}

/// Per-unit results of [`consolidate`], in input order.
#[derive(Debug, Default)]
pub struct ConsolidationReport {
    pub units: Vec<(String, Result<MergeOutcome, ConsolidateError>)>,
}

impl ConsolidationReport {
    /// Names of the units that failed.
    pub fn failed(&self) -> Vec<String> {
        self.units
            .iter()
            .filter(|(_, result)| result.is_err())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.units.iter().all(|(_, result)| result.is_ok())
    }

    /// Rows in every output committed by this run.
    pub fn rows_written(&self) -> usize {
        self.units
            .iter()
            .filter_map(|(_, result)| match result {
                Ok(MergeOutcome::Merged(stats)) => Some(stats.rows),
                _ => None,
            })
            .sum()
    }

    /// The outcome recorded for `name`, if that unit ran.
    pub fn get(&self, name: &str) -> Option<&Result<MergeOutcome, ConsolidateError>> {
        self.units
            .iter()
            .find(|(unit, _)| unit == name)
            .map(|(_, result)| result)
    }
}

/// Consolidate every unit in order.
///
/// A failing unit is logged and recorded in the report; the remaining units
/// still run.
pub fn consolidate(units: &[MergeUnit], options: &ConsolidateOptions) -> ConsolidationReport {
    let mut report = ConsolidationReport::default();

    for unit in units {
        let span = info_span!("merge_unit", dataset = %unit.name);
        let _guard = span.enter();
        let start = Instant::now();

        let result = consolidate_unit(unit, options);
        let status = match &result {
            Ok(MergeOutcome::Skipped) => RunStatus::Skipped,
            Ok(MergeOutcome::Merged(stats)) => {
                info!(
                    files = stats.files,
                    rows = stats.rows,
                    carried_rows = stats.carried_rows,
                    output = %stats.output.display(),
                    "Consolidated dataset"
                );
                RunStatus::Success
            }
            Err(e) => {
                error!(error = %Report::from_error(e), "Consolidation failed");
                RunStatus::Failed
            }
        };
        emit!(MergeUnitCompleted {
            dataset: &unit.name,
            status,
            duration: start.elapsed(),
        });

        report.units.push((unit.name.clone(), result));
    }

    report
}

/// Consolidate a single unit.
pub fn consolidate_unit(
    unit: &MergeUnit,
    options: &ConsolidateOptions,
) -> Result<MergeOutcome, ConsolidateError> {
    fs::create_dir_all(&unit.destination).context(CreateDestinationSnafu {
        path: &unit.destination,
    })?;

    let candidates = unit.discover_candidates()?;
    if candidates.is_empty() {
        info!("No candidate files; skipping");
        return Ok(MergeOutcome::Skipped);
    }

    let output = unit.output_file();
    let staging = unit.staging_file();
    let writer_config = ParquetWriterConfig::default()
        .with_compression(options.compression)
        .with_row_group_rows(options.batch_size);
    let mut writer = LazyParquetWriter::new(&staging, writer_config);

    let streamed = stream_candidates(unit, &output, &candidates, options, &mut writer);
    let closed = writer.close().context(OutputWriteSnafu);
    let (rows, carried_rows) = match (streamed, closed) {
        (Ok(counts), Ok(_)) => counts,
        (Err(e), _) | (Ok(_), Err(e)) => {
            discard(&staging);
            return Err(e);
        }
    };

    if staging.exists() {
        if let Err(source) = fs::rename(&staging, &output) {
            discard(&staging);
            return Err(source).context(CommitSnafu {
                from: &staging,
                to: &output,
            });
        }
        emit!(ConsolidatedOutputRows {
            dataset: &unit.name,
            rows: rows as u64,
        });
    } else {
        warn!(
            candidates = candidates.len(),
            "Every candidate file was empty; output left as it was"
        );
    }

    let undeleted: Vec<PathBuf> = candidates
        .iter()
        .filter(|path| match fs::remove_file(path) {
            Ok(()) => false,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to delete consumed file");
                true
            }
        })
        .cloned()
        .collect();

    emit!(FilesConsolidated {
        dataset: &unit.name,
        count: (candidates.len() - undeleted.len()) as u64,
    });
    ensure!(undeleted.is_empty(), CleanupSnafu { paths: undeleted });

    Ok(MergeOutcome::Merged(MergeStats {
        files: candidates.len(),
        rows,
        carried_rows,
        output,
    }))
}

/// Returns `(total_rows, carried_rows)`.
fn stream_candidates(
    unit: &MergeUnit,
    output: &Path,
    candidates: &[PathBuf],
    options: &ConsolidateOptions,
    writer: &mut LazyParquetWriter,
) -> Result<(usize, usize), ConsolidateError> {
    let reader_config = ChunkReaderConfig::new(options.batch_size);

    let carried_rows = if output.exists() {
        stream_file(&unit.name, output, &reader_config, writer)?
    } else {
        0
    };

    let mut rows = carried_rows;
    for candidate in candidates {
        rows += stream_file(&unit.name, candidate, &reader_config, writer)?;
    }
    Ok((rows, carried_rows))
}

fn stream_file(
    dataset: &str,
    path: &Path,
    config: &ChunkReaderConfig,
    writer: &mut LazyParquetWriter,
) -> Result<usize, ConsolidateError> {
    let reader = ChunkReader::open(path, config).context(SourceReadSnafu)?;

    let mut rows = 0;
    for batch in reader {
        let batch = batch.context(SourceReadSnafu)?;
        writer.write_batch(&batch).context(OutputWriteSnafu)?;
        rows += batch.num_rows();
        emit!(RowsConsolidated {
            dataset,
            count: batch.num_rows() as u64,
        });
    }
    Ok(rows)
}

fn discard(staging: &Path) {
    if staging.exists() {
        if let Err(e) = fs::remove_file(staging) {
            warn!(file = %staging.display(), error = %e, "Failed to remove staging file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, RecordBatch, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use parquet::arrow::ArrowWriter;
    use std::fs::File;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write_rows(path: &Path, start: i64, rows: usize) {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("order_type", DataType::Utf8, true),
        ]));
        let ids: Vec<i64> = (start..start + rows as i64).collect();
        let types: Vec<Option<&str>> = ids.iter().map(|_| Some("S01")).collect();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(ids)),
                Arc::new(StringArray::from(types)),
            ],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    fn options() -> ConsolidateOptions {
        ConsolidateOptions {
            batch_size: 7,
            compression: ParquetCompression::Snappy,
        }
    }

    fn setup(temp_dir: &TempDir) -> MergeUnit {
        let source = temp_dir.path().join("silver");
        fs::create_dir_all(&source).unwrap();
        MergeUnit::new("pedidos", vec![source], temp_dir.path().join("gold"))
    }

    #[test]
    fn test_merge_sums_rows_and_removes_sources() {
        let temp_dir = TempDir::new().unwrap();
        let unit = setup(&temp_dir);
        write_rows(&unit.sources[0].join("a.parquet"), 0, 10);
        write_rows(&unit.sources[0].join("b.parquet"), 10, 15);

        let outcome = consolidate_unit(&unit, &options()).unwrap();
        let MergeOutcome::Merged(stats) = outcome else {
            panic!("expected a merge");
        };
        assert_eq!(stats.files, 2);
        assert_eq!(stats.rows, 25);
        assert_eq!(stats.carried_rows, 0);
        assert!(unit.output_file().exists());
        assert!(!unit.staging_file().exists());
        assert!(list_parquet(&unit.sources[0]).is_empty());
    }

    #[test]
    fn test_rerun_without_new_files_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let unit = setup(&temp_dir);
        write_rows(&unit.sources[0].join("a.parquet"), 0, 5);
        consolidate_unit(&unit, &options()).unwrap();
        let before = fs::read(unit.output_file()).unwrap();

        assert_eq!(
            consolidate_unit(&unit, &options()).unwrap(),
            MergeOutcome::Skipped
        );
        assert_eq!(fs::read(unit.output_file()).unwrap(), before);
    }

    #[test]
    fn test_new_files_append_to_existing_output() {
        let temp_dir = TempDir::new().unwrap();
        let unit = setup(&temp_dir);
        write_rows(&unit.sources[0].join("a.parquet"), 0, 5);
        consolidate_unit(&unit, &options()).unwrap();

        write_rows(&unit.sources[0].join("b.parquet"), 5, 4);
        let MergeOutcome::Merged(stats) = consolidate_unit(&unit, &options()).unwrap() else {
            panic!("expected a merge");
        };
        assert_eq!(stats.carried_rows, 5);
        assert_eq!(stats.rows, 9);
    }

    #[test]
    fn test_corrupt_file_leaves_everything_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let unit = setup(&temp_dir);
        let source = &unit.sources[0];
        write_rows(&source.join("1.parquet"), 0, 10);
        write_rows(&source.join("2.parquet"), 10, 10);
        fs::write(source.join("3.parquet"), b"corrupt").unwrap();
        write_rows(&source.join("4.parquet"), 20, 10);

        let result = consolidate_unit(&unit, &options());
        assert!(matches!(result, Err(ConsolidateError::SourceRead { .. })));
        assert!(!unit.output_file().exists());
        assert!(!unit.staging_file().exists());
        assert_eq!(list_parquet(source).len(), 4);
    }

    #[test]
    fn test_failed_unit_does_not_stop_siblings() {
        let temp_dir = TempDir::new().unwrap();
        let broken = MergeUnit::new(
            "broken",
            vec![temp_dir.path().join("broken_src")],
            temp_dir.path().join("broken_gold"),
        );
        fs::create_dir_all(&broken.sources[0]).unwrap();
        write_rows(&broken.sources[0].join("a.parquet"), 0, 3);
        // Different schema in the second file
        let other = Arc::new(Schema::new(vec![Field::new("x", DataType::Utf8, true)]));
        let batch = RecordBatch::try_new(
            other.clone(),
            vec![Arc::new(StringArray::from(vec![Some("a")]))],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(
            File::create(broken.sources[0].join("b.parquet")).unwrap(),
            other,
            None,
        )
        .unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let healthy = setup(&temp_dir);
        write_rows(&healthy.sources[0].join("a.parquet"), 0, 4);

        let report = consolidate(&[broken, healthy], &options());
        assert_eq!(report.failed(), vec!["broken".to_string()]);
        assert!(matches!(
            report.get("broken"),
            Some(Err(ConsolidateError::OutputWrite { .. }))
        ));
        assert_eq!(report.rows_written(), 4);
        assert!(!report.is_success());
    }

    #[test]
    fn test_empty_sources_skip() {
        let temp_dir = TempDir::new().unwrap();
        let unit = setup(&temp_dir);
        let report = consolidate(std::slice::from_ref(&unit), &options());
        assert!(matches!(report.get("pedidos"), Some(Ok(MergeOutcome::Skipped))));
        assert!(unit.destination.is_dir());
    }

    fn list_parquet(dir: &Path) -> Vec<PathBuf> {
        crate::source::list_parquet_files(dir).unwrap()
    }
}
