//! Source side of the pipeline: discovering and reading Parquet extracts.
//!
//! Files are read in bounded row-count chunks so memory stays proportional
//! to the batch size rather than to the file size.

pub mod listing;
pub mod reader;

pub use listing::{PARQUET_EXTENSION, list_parquet_files};
pub use reader::{ChunkReader, ChunkReaderConfig};
