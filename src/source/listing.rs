//! Parquet file discovery in local directories.

use std::io;
use std::path::{Path, PathBuf};

/// File extension for Parquet extracts.
pub const PARQUET_EXTENSION: &str = "parquet";

/// List the Parquet files directly inside `dir`.
///
/// Subdirectories are not descended into. Paths are sorted so discovery
/// order is deterministic across runs.
pub fn list_parquet_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && is_parquet_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_parquet_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == PARQUET_EXTENSION)
}
