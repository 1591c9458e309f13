//! Second-most-recent date lookup over a large Parquet file.
//!
//! Upstream jobs use the second distinct date of a consolidated file as
//! their reprocessing watermark: the most recent date may still be partial.
//! Only the requested column is read, one chunk at a time.

mod tracker;

pub use tracker::SecondMaxTracker;

use std::fmt::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};
use tracing::{debug, error, warn};

use crate::coerce::naive_timestamps;
use crate::emit;
use crate::error::ReaderError;
use crate::metrics::events::WatermarkResolved;
use crate::source::{ChunkReader, ChunkReaderConfig};

/// Column scanned when none is given.
pub const DEFAULT_COLUMN: &str = "data_criterio";

/// strftime format of the rendered watermark.
pub const DEFAULT_FORMAT: &str = "%d/%m/%Y";

/// Rows read per chunk when none is given.
pub const DEFAULT_BATCH_SIZE: usize = 64 * 1024;

/// Second-largest distinct timestamp of `column` in `file`.
///
/// Returns `None` when the file is missing, unreadable, lacks the column, or
/// holds fewer than two distinct non-null values. Each case is logged with
/// its own message; nothing is raised.
pub fn second_distinct_max(file: &Path, column: &str, batch_size: usize) -> Option<NaiveDateTime> {
    if !file.exists() {
        warn!(
            file = %file.display(),
            column,
            "Watermark file not found"
        );
        emit!(WatermarkResolved { found: false });
        return None;
    }

    let tracker = match scan(file, column, batch_size) {
        Ok(tracker) => tracker,
        Err(e) => {
            error!(
                file = %file.display(),
                column,
                error = %e,
                "Failed to read watermark column"
            );
            emit!(WatermarkResolved { found: false });
            return None;
        }
    };

    let second = tracker.second_max();
    match second {
        Some(value) => debug!(
            file = %file.display(),
            column,
            max = ?tracker.max(),
            second_max = %value,
            "Resolved watermark"
        ),
        None => warn!(
            file = %file.display(),
            column,
            "Fewer than two distinct dates; watermark undetermined"
        ),
    }
    emit!(WatermarkResolved {
        found: second.is_some()
    });
    second
}

fn scan(
    file: &Path,
    column: &str,
    batch_size: usize,
) -> Result<SecondMaxTracker<NaiveDateTime>, ReaderError> {
    let config = ChunkReaderConfig::new(batch_size).with_columns([column]);
    let reader = ChunkReader::open(file, &config)?;

    let mut tracker = SecondMaxTracker::new();
    for batch in reader {
        let batch = batch?;
        if batch.num_columns() == 0 {
            continue;
        }
        tracker.extend(naive_timestamps(batch.column(0)).into_iter().flatten());
    }
    Ok(tracker)
}

/// [`second_distinct_max`] rendered with a strftime `format`.
///
/// An unusable `format` is logged and yields `None`, like an absent date.
pub fn penultimate_date(file: &Path, column: &str, format: &str) -> Option<String> {
    second_distinct_max(file, column, DEFAULT_BATCH_SIZE)
        .and_then(|value| format_date(value, format))
}

/// Whether `format` is a strftime pattern chrono can parse.
pub fn is_valid_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Render `value` with `format`, or `None` when the pattern cannot be applied.
pub fn format_date(value: NaiveDateTime, format: &str) -> Option<String> {
    let mut rendered = String::new();
    match write!(rendered, "{}", value.format(format)) {
        Ok(()) => Some(rendered),
        Err(_) => {
            error!(format, "Watermark date format cannot be applied");
            None
        }
    }
}
