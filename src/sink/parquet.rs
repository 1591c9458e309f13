//! Lazily opened Parquet file writer.
//!
//! The output schema is not known up front: it is fixed by the first batch
//! written, and every later batch must carry the same fields. The writer
//! moves through `Unopened -> Open(schema) -> Closed`; no file is created
//! until the first batch arrives.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use snafu::prelude::*;
use tracing::debug;

use crate::config::ParquetCompression;
use crate::emit;
use crate::error::{
    CreateFileSnafu, ParquetError, SchemaMismatchSnafu, WriteSnafu, WriterClosedSnafu,
    WriterCreateSnafu,
};
use crate::metrics::events::ParquetWriteCompleted;

/// Default rows per row group; also bounds the writer's in-memory buffer.
pub const DEFAULT_ROW_GROUP_ROWS: usize = 64 * 1024;

/// Suffix of the staging file a writer fills before it is renamed into place.
pub const STAGING_SUFFIX: &str = "inprogress";

/// Hidden sibling of `path` used while the file is being written.
///
/// `out/data.parquet` stages as `out/.data.parquet.inprogress`, which no
/// `*.parquet` listing picks up.
pub fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{STAGING_SUFFIX}"))
}

/// Statistics for tracking writer state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Total records written.
    pub records_written: usize,
    /// Total batches written.
    pub batches_written: usize,
}

/// Configuration for the Parquet writer.
#[derive(Debug, Clone, Copy)]
pub struct ParquetWriterConfig {
    /// Compression codec.
    pub compression: ParquetCompression,
    /// Maximum rows buffered before a row group is flushed to disk.
    pub row_group_rows: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: ParquetCompression::Snappy,
            row_group_rows: DEFAULT_ROW_GROUP_ROWS,
        }
    }
}

impl ParquetWriterConfig {
    /// Set the compression codec.
    pub fn with_compression(mut self, compression: ParquetCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Set the row group size in rows.
    pub fn with_row_group_rows(mut self, rows: usize) -> Self {
        self.row_group_rows = rows.max(1);
        self
    }

    fn writer_properties(&self) -> WriterProperties {
        let compression = match self.compression {
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ParquetCompression::Lz4 => Compression::LZ4,
        };

        WriterProperties::builder()
            .set_compression(compression)
            .set_max_row_group_size(self.row_group_rows)
            .build()
    }
}

enum WriterState {
    Unopened,
    Open {
        writer: ArrowWriter<File>,
        schema: SchemaRef,
    },
    Closed,
}

/// Parquet writer whose schema comes from the first batch it receives.
pub struct LazyParquetWriter {
    path: PathBuf,
    config: ParquetWriterConfig,
    state: WriterState,
    stats: WriterStats,
}

impl LazyParquetWriter {
    /// Create a writer targeting `path`. Nothing touches the filesystem yet.
    pub fn new(path: impl Into<PathBuf>, config: ParquetWriterConfig) -> Self {
        Self {
            path: path.into(),
            config,
            state: WriterState::Unopened,
            stats: WriterStats::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The schema fixed by the first batch, once the writer is open.
    pub fn schema(&self) -> Option<&SchemaRef> {
        match &self.state {
            WriterState::Open { schema, .. } => Some(schema),
            _ => None,
        }
    }

    /// True once a batch has opened the output file.
    pub fn is_open(&self) -> bool {
        matches!(self.state, WriterState::Open { .. })
    }

    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    /// Append a batch, opening the file on the first call.
    pub fn write_batch(&mut self, batch: &RecordBatch) -> Result<(), ParquetError> {
        if matches!(self.state, WriterState::Unopened) {
            self.open(batch.schema())?;
        }

        let WriterState::Open { writer, schema } = &mut self.state else {
            return WriterClosedSnafu.fail();
        };

        ensure!(
            batch.schema().fields() == schema.fields(),
            SchemaMismatchSnafu {
                path: &self.path,
                expected: describe_fields(schema),
                found: describe_fields(&batch.schema()),
            }
        );

        writer.write(batch).context(WriteSnafu)?;
        self.stats.records_written += batch.num_rows();
        self.stats.batches_written += 1;
        Ok(())
    }

    fn open(&mut self, schema: SchemaRef) -> Result<(), ParquetError> {
        let file = File::create(&self.path).context(CreateFileSnafu { path: &self.path })?;
        let writer = ArrowWriter::try_new(
            file,
            schema.clone(),
            Some(self.config.writer_properties()),
        )
        .context(WriterCreateSnafu { path: &self.path })?;

        debug!(
            file = %self.path.display(),
            fields = schema.fields().len(),
            compression = ?self.config.compression,
            "Opened parquet writer"
        );

        self.state = WriterState::Open { writer, schema };
        Ok(())
    }

    /// Flush the footer and release the file.
    ///
    /// Safe to call in any state: closing an unopened writer creates no file,
    /// and closing twice is a no-op.
    pub fn close(&mut self) -> Result<WriterStats, ParquetError> {
        match std::mem::replace(&mut self.state, WriterState::Closed) {
            WriterState::Open { writer, .. } => {
                let start = Instant::now();
                writer.close().context(WriteSnafu)?;
                emit!(ParquetWriteCompleted {
                    duration: start.elapsed()
                });
                debug!(
                    file = %self.path.display(),
                    records = self.stats.records_written,
                    batches = self.stats.batches_written,
                    "Closed parquet writer"
                );
            }
            WriterState::Unopened | WriterState::Closed => {}
        }
        Ok(self.stats)
    }
}

fn describe_fields(schema: &SchemaRef) -> String {
    let fields: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| format!("{}: {}", f.name(), f.data_type()))
        .collect();
    format!("[{}]", fields.join(", "))
}
