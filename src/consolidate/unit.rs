//! Merge units and candidate discovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use snafu::prelude::*;
use tracing::{debug, warn};

use crate::error::{ConsolidateError, ListDirectorySnafu};
use crate::sink::staging_path;
use crate::source::list_parquet_files;

/// Suffix appended to the dataset name to form the output file name.
pub const OUTPUT_SUFFIX: &str = "_consolidated.parquet";

/// One logical dataset: its source directories and its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeUnit {
    pub name: String,
    pub sources: Vec<PathBuf>,
    pub destination: PathBuf,
}

impl MergeUnit {
    pub fn new(
        name: impl Into<String>,
        sources: Vec<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            sources,
            destination: destination.into(),
        }
    }

    /// The consolidated file for this dataset.
    pub fn output_file(&self) -> PathBuf {
        self.destination
            .join(format!("{}{OUTPUT_SUFFIX}", self.name))
    }

    /// Where the next output is written before it replaces [`Self::output_file`].
    pub fn staging_file(&self) -> PathBuf {
        staging_path(&self.output_file())
    }

    /// Files a merge of this unit would consume, in read order.
    ///
    /// The destination is listed first, then each source directory in
    /// declaration order; each listing is sorted. The output file is never a
    /// candidate. A source directory that does not exist is skipped with a
    /// warning; a destination that cannot be listed is an error.
    pub fn discover_candidates(&self) -> Result<Vec<PathBuf>, ConsolidateError> {
        let output = self.output_file();
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut candidates = Vec::new();

        let mut take = |files: Vec<PathBuf>| {
            for file in files {
                if file != output && seen.insert(file.clone()) {
                    candidates.push(file);
                }
            }
        };

        take(list_dir(&self.destination)?);

        for source in &self.sources {
            if !source.is_dir() {
                warn!(
                    dataset = %self.name,
                    source = %source.display(),
                    "Source directory does not exist; skipping"
                );
                continue;
            }
            take(list_dir(source)?);
        }

        debug!(
            dataset = %self.name,
            candidates = candidates.len(),
            "Discovered candidate files"
        );
        Ok(candidates)
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, ConsolidateError> {
    list_parquet_files(dir).context(ListDirectorySnafu { path: dir })
}
