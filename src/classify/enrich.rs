//! Appending sector and SLA columns to shipment data.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use snafu::prelude::*;
use tracing::{info, warn};

use super::columns::{ColumnNames, ShipmentColumns};
use super::sector::classify;
use super::sla::{SHIPPED_STATUS, SlaVerdict, evaluate_sla};
use crate::config::ParquetCompression;
use crate::emit;
use crate::error::{
    BatchBuildSnafu, ColumnExistsSnafu, EnrichCommitSnafu, EnrichError, EnrichReadSnafu,
    EnrichWriteSnafu,
};
use crate::metrics::events::{RowsClassified, SlaVerdictsAssigned};
use crate::rules::{ClassificationRule, DEFAULT_SECTOR, DeadlineRule, sector_rules, sla_rules};
use crate::sink::{LazyParquetWriter, ParquetWriterConfig, staging_path};
use crate::source::{ChunkReader, ChunkReaderConfig};

/// Everything `enrich_batch` needs besides the batch itself.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub sector_rules: Vec<ClassificationRule>,
    pub deadline_rules: Vec<DeadlineRule>,
    pub default_sector: String,
    pub shipped_status: String,
    pub columns: ColumnNames,
    pub sector_column: String,
    pub sla_column: String,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            sector_rules: sector_rules(),
            deadline_rules: sla_rules(),
            default_sector: DEFAULT_SECTOR.to_string(),
            shipped_status: SHIPPED_STATUS.to_string(),
            columns: ColumnNames::default(),
            sector_column: "setor".to_string(),
            sla_column: "sla".to_string(),
        }
    }
}

/// Row and verdict totals from one enrichment run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub rows: usize,
    pub batches: usize,
    pub on_time: usize,
    pub late: usize,
    pub unset: usize,
}

impl EnrichStats {
    fn record(&mut self, verdicts: &[SlaVerdict]) {
        self.rows += verdicts.len();
        self.batches += 1;
        for verdict in verdicts {
            match verdict {
                SlaVerdict::OnTime => self.on_time += 1,
                SlaVerdict::Late => self.late += 1,
                SlaVerdict::Unset => self.unset += 1,
            }
        }
    }
}

/// Return `batch` with the sector and SLA columns appended.
pub fn enrich_batch(batch: &RecordBatch, options: &EnrichOptions) -> Result<RecordBatch, EnrichError> {
    enrich_with_verdicts(batch, options).map(|(batch, _)| batch)
}

fn enrich_with_verdicts(
    batch: &RecordBatch,
    options: &EnrichOptions,
) -> Result<(RecordBatch, Vec<SlaVerdict>), EnrichError> {
    let schema = batch.schema();
    for column in [&options.sector_column, &options.sla_column] {
        ensure!(
            schema.column_with_name(column).is_none(),
            ColumnExistsSnafu { column }
        );
    }

    let rows = ShipmentColumns::from_batch(batch, &options.columns);
    let labels = classify(&rows, &options.sector_rules, &options.default_sector);
    let verdicts = evaluate_sla(&rows, &options.deadline_rules, &options.shipped_status);

    emit!(RowsClassified {
        count: labels.len() as u64
    });
    for verdict in [SlaVerdict::OnTime, SlaVerdict::Late, SlaVerdict::Unset] {
        let count = verdicts.iter().filter(|v| **v == verdict).count();
        if count > 0 {
            emit!(SlaVerdictsAssigned {
                verdict,
                count: count as u64
            });
        }
    }

    let mut fields: Vec<Arc<Field>> = schema.fields().iter().cloned().collect();
    fields.push(Arc::new(Field::new(&options.sector_column, DataType::Utf8, false)));
    fields.push(Arc::new(Field::new(&options.sla_column, DataType::Utf8, true)));
    let enriched_schema = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));

    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    columns.push(Arc::new(StringArray::from(labels)));
    columns.push(Arc::new(
        verdicts.iter().map(SlaVerdict::as_str).collect::<StringArray>(),
    ));

    let enriched = RecordBatch::try_new(enriched_schema, columns).context(BatchBuildSnafu)?;
    Ok((enriched, verdicts))
}

/// Stream `input` through [`enrich_batch`] into a new Parquet file at `output`.
///
/// The output is staged next to its final path and renamed into place only
/// after the writer closes cleanly; on failure the staging file is removed
/// and any previous `output` is left as it was. An input with no rows
/// produces no output.
pub fn enrich_file(
    input: &Path,
    output: &Path,
    options: &EnrichOptions,
    batch_size: usize,
    compression: ParquetCompression,
) -> Result<EnrichStats, EnrichError> {
    let staging = staging_path(output);
    let config = ParquetWriterConfig::default()
        .with_compression(compression)
        .with_row_group_rows(batch_size);
    let mut writer = LazyParquetWriter::new(&staging, config);

    let streamed = stream_enriched(input, options, batch_size, &mut writer);
    let closed = writer.close().context(EnrichWriteSnafu);

    let stats = match (streamed, closed) {
        (Ok(stats), Ok(_)) => stats,
        (Err(e), _) | (Ok(_), Err(e)) => {
            discard_staging(&staging);
            return Err(e);
        }
    };

    if !staging.exists() {
        warn!(input = %input.display(), "Input has no rows; no enriched output written");
        return Ok(stats);
    }

    fs::rename(&staging, output).context(EnrichCommitSnafu {
        from: &staging,
        to: output,
    })?;

    info!(
        input = %input.display(),
        output = %output.display(),
        rows = stats.rows,
        on_time = stats.on_time,
        late = stats.late,
        unset = stats.unset,
        "Enriched file"
    );
    Ok(stats)
}

fn stream_enriched(
    input: &Path,
    options: &EnrichOptions,
    batch_size: usize,
    writer: &mut LazyParquetWriter,
) -> Result<EnrichStats, EnrichError> {
    let reader = ChunkReader::open(input, &ChunkReaderConfig::new(batch_size))
        .context(EnrichReadSnafu)?;

    let mut stats = EnrichStats::default();
    for batch in reader {
        let batch = batch.context(EnrichReadSnafu)?;
        let (enriched, verdicts) = enrich_with_verdicts(&batch, options)?;
        writer.write_batch(&enriched).context(EnrichWriteSnafu)?;
        stats.record(&verdicts);
    }
    Ok(stats)
}

fn discard_staging(staging: &Path) {
    if staging.exists() {
        if let Err(e) = fs::remove_file(staging) {
            warn!(file = %staging.display(), error = %e, "Failed to remove staging file");
        }
    }
}
