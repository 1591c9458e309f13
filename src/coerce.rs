//! Coercion of raw extract columns into the values the engines compare.
//!
//! Extracts are loosely typed: box numbers arrive as integers, floats or
//! text, and timestamps as any Arrow temporal type or ISO-8601 strings.
//! Nothing here fails; values that cannot be coerced become `None`.

use std::sync::Arc;

use arrow::array::timezone::Tz;
use arrow::array::{Array, ArrayRef, AsArray, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type, TimeUnit, TimestampMicrosecondType};
use chrono::NaiveDateTime;
use tracing::warn;

/// Parse one textual box value.
///
/// Integers parse directly; decimal and exponent forms truncate toward zero.
/// Anything else is an unknown box (`None`), which no ranged rule matches.
pub fn parse_box(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }
    text.parse::<f64>().ok().and_then(truncate_float)
}

fn truncate_float(value: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
    if value.is_finite() && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        Some(value.trunc() as i64)
    } else {
        None
    }
}

/// Normalize a box column of any type into one optional integer per row.
pub fn box_numbers(array: &ArrayRef) -> Vec<Option<i64>> {
    let data_type = array.data_type();

    if data_type.is_integer() {
        if let Ok(ints) = cast(array, &DataType::Int64) {
            return ints
                .as_primitive::<Int64Type>()
                .iter()
                .collect();
        }
    } else if data_type.is_floating() {
        if let Ok(floats) = cast(array, &DataType::Float64) {
            return floats
                .as_primitive::<Float64Type>()
                .iter()
                .map(|v| v.and_then(truncate_float))
                .collect();
        }
    } else if let Ok(text) = cast(array, &DataType::Utf8) {
        return text
            .as_string::<i32>()
            .iter()
            .map(|v| v.and_then(parse_box))
            .collect();
    }

    warn!(
        data_type = %data_type,
        "Box column type cannot be coerced; treating every box as unknown"
    );
    vec![None; array.len()]
}

/// Normalize a temporal or textual column into naive microsecond timestamps.
///
/// Zoned timestamp columns yield the wall-clock time of their own zone, so
/// day truncation happens at that zone's midnight. Values that cannot be
/// parsed become `None`. A column whose type cannot be cast at all yields
/// all `None`.
pub fn naive_timestamps(array: &ArrayRef) -> Vec<Option<NaiveDateTime>> {
    if let DataType::Timestamp(_, Some(zone)) = array.data_type() {
        match zone.parse::<Tz>() {
            Ok(tz) => return zoned_wall_clock(array, zone, tz),
            Err(e) => warn!(
                timezone = %zone,
                error = %e,
                "Unknown timestamp zone; reading values as UTC"
            ),
        }
    }

    let target = DataType::Timestamp(TimeUnit::Microsecond, None);
    match cast(array, &target) {
        Ok(micros) => {
            let micros = micros.as_primitive::<TimestampMicrosecondType>();
            (0..micros.len())
                .map(|i| {
                    if micros.is_null(i) {
                        None
                    } else {
                        micros.value_as_datetime(i)
                    }
                })
                .collect()
        }
        Err(e) => {
            warn!(
                data_type = %array.data_type(),
                error = %e,
                "Timestamp column type cannot be coerced; treating every value as null"
            );
            vec![None; array.len()]
        }
    }
}

fn zoned_wall_clock(array: &ArrayRef, zone: &Arc<str>, tz: Tz) -> Vec<Option<NaiveDateTime>> {
    let target = DataType::Timestamp(TimeUnit::Microsecond, Some(zone.clone()));
    match cast(array, &target) {
        Ok(micros) => {
            let micros = micros.as_primitive::<TimestampMicrosecondType>();
            (0..micros.len())
                .map(|i| {
                    if micros.is_null(i) {
                        None
                    } else {
                        micros
                            .value_as_datetime_with_tz(i, tz)
                            .map(|local| local.naive_local())
                    }
                })
                .collect()
        }
        Err(e) => {
            warn!(
                data_type = %array.data_type(),
                error = %e,
                "Timestamp column type cannot be coerced; treating every value as null"
            );
            vec![None; array.len()]
        }
    }
}

/// Cast any column to UTF-8 text, or `None` when the type has no text form.
pub fn text_values(array: &ArrayRef) -> Option<StringArray> {
    match cast(array, &DataType::Utf8) {
        Ok(text) => Some(text.as_string::<i32>().clone()),
        Err(e) => {
            warn!(
                data_type = %array.data_type(),
                error = %e,
                "Text column type cannot be coerced; treating every value as null"
            );
            None
        }
    }
}
