//! Sink components for writing Parquet files.

pub mod parquet;

pub use parquet::{
    DEFAULT_ROW_GROUP_ROWS, LazyParquetWriter, ParquetWriterConfig, STAGING_SUFFIX, WriterStats,
    staging_path,
};
