//! Chunked Parquet reader.
//!
//! Opens a Parquet file and yields Arrow RecordBatches of a bounded row
//! count, optionally pruned to a subset of columns. Only one batch is
//! decoded at a time; each is released before the next is read.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatchReader;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use snafu::prelude::*;
use tracing::debug;

use crate::emit;
use crate::error::{MissingColumnSnafu, OpenFileSnafu, ReadBatchSnafu, ReaderBuildSnafu, ReaderError};
use crate::metrics::events::BatchesRead;

/// Configuration for the chunked reader.
#[derive(Debug, Clone)]
pub struct ChunkReaderConfig {
    /// Number of rows per batch.
    pub batch_size: usize,
    /// Columns to read. `None` reads every column.
    pub columns: Option<Vec<String>>,
}

impl ChunkReaderConfig {
    /// Read every column in chunks of `batch_size` rows.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            columns: None,
        }
    }

    /// Restrict reading to the named columns.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

/// Iterator over the record batches of one Parquet file.
pub struct ChunkReader {
    path: PathBuf,
    schema: SchemaRef,
    total_rows: i64,
    inner: ParquetRecordBatchReader,
}

impl ChunkReader {
    /// Open `path` for chunked reading.
    pub fn open(path: &Path, config: &ChunkReaderConfig) -> Result<Self, ReaderError> {
        let file = File::open(path).context(OpenFileSnafu { path })?;
        let builder =
            ParquetRecordBatchReaderBuilder::try_new(file).context(ReaderBuildSnafu { path })?;
        let total_rows = builder.metadata().file_metadata().num_rows();

        let builder = match &config.columns {
            Some(columns) => {
                let file_schema = builder.schema().clone();
                let mut indices = Vec::with_capacity(columns.len());
                for column in columns {
                    let index = file_schema
                        .index_of(column)
                        .ok()
                        .context(MissingColumnSnafu { path, column })?;
                    indices.push(index);
                }
                let mask = ProjectionMask::roots(builder.parquet_schema(), indices);
                builder.with_projection(mask)
            }
            None => builder,
        };

        let inner = builder
            .with_batch_size(config.batch_size.max(1))
            .build()
            .context(ReaderBuildSnafu { path })?;
        let schema = inner.schema();

        debug!(
            file = %path.display(),
            rows = total_rows,
            batch_size = config.batch_size,
            "Opened parquet file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            schema,
            total_rows,
            inner,
        })
    }

    /// Schema of the batches this reader yields (after projection).
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Row count declared in the file footer.
    pub fn total_rows(&self) -> i64 {
        self.total_rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for ChunkReader {
    type Item = Result<RecordBatch, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch = self.inner.next()?;
        if batch.is_ok() {
            emit!(BatchesRead { count: 1 });
        }
        Some(batch.context(ReadBatchSnafu { path: &self.path }))
    }
}
