//! Column extraction from shipment batches.

use arrow::array::{Array, ArrayRef, RecordBatch, StringArray};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::coerce::{box_numbers, naive_timestamps, parse_box, text_values};

/// Names of the input columns the engines read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ColumnNames {
    #[serde(rename = "box")]
    pub box_number: String,
    pub order_type: String,
    pub shipment_status: String,
    pub order_placed_at: String,
    pub last_update_at: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            box_number: "box".to_string(),
            order_type: "order_type".to_string(),
            shipment_status: "shipment_status".to_string(),
            order_placed_at: "order_placed_at".to_string(),
            last_update_at: "last_update_at".to_string(),
        }
    }
}

/// One shipment row in owned form.
///
/// `box_number` holds the raw box text; it is normalized the same way as a
/// text column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shipment {
    pub box_number: Option<String>,
    pub order_type: Option<String>,
    pub shipment_status: Option<String>,
    pub order_placed_at: Option<NaiveDateTime>,
    pub last_update_at: Option<NaiveDateTime>,
}

/// The engine-facing view of a chunk of shipments.
///
/// Boxes are already normalized; unknown boxes are `None`. Columns absent from the input read as null
/// for every row.
#[derive(Debug, Clone)]
pub struct ShipmentColumns {
    len: usize,
    boxes: Vec<Option<i64>>,
    order_types: Option<StringArray>,
    statuses: Option<StringArray>,
    placed_at: Vec<Option<NaiveDateTime>>,
    updated_at: Vec<Option<NaiveDateTime>>,
}

impl ShipmentColumns {
    /// Extract the named columns from a batch.
    pub fn from_batch(batch: &RecordBatch, names: &ColumnNames) -> Self {
        let len = batch.num_rows();
        let column = |name: &str| lookup(batch, name);

        Self {
            len,
            boxes: column(&names.box_number)
                .map(box_numbers)
                .unwrap_or_else(|| vec![None; len]),
            order_types: column(&names.order_type).and_then(text_values),
            statuses: column(&names.shipment_status).and_then(text_values),
            placed_at: column(&names.order_placed_at)
                .map(naive_timestamps)
                .unwrap_or_else(|| vec![None; len]),
            updated_at: column(&names.last_update_at)
                .map(naive_timestamps)
                .unwrap_or_else(|| vec![None; len]),
        }
    }

    /// Build the view from owned rows.
    pub fn from_shipments(rows: &[Shipment]) -> Self {
        let texts = |f: fn(&Shipment) -> Option<&str>| -> StringArray {
            rows.iter().map(f).collect()
        };
        Self {
            len: rows.len(),
            boxes: rows
                .iter()
                .map(|r| r.box_number.as_deref().and_then(parse_box))
                .collect(),
            order_types: Some(texts(|r| r.order_type.as_deref())),
            statuses: Some(texts(|r| r.shipment_status.as_deref())),
            placed_at: rows.iter().map(|r| r.order_placed_at).collect(),
            updated_at: rows.iter().map(|r| r.last_update_at).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Normalized box, `None` when missing or not numeric.
    pub fn box_number(&self, row: usize) -> Option<i64> {
        self.boxes[row]
    }

    pub fn order_type(&self, row: usize) -> Option<&str> {
        text_at(self.order_types.as_ref(), row)
    }

    pub fn shipment_status(&self, row: usize) -> Option<&str> {
        text_at(self.statuses.as_ref(), row)
    }

    pub fn order_placed_at(&self, row: usize) -> Option<NaiveDateTime> {
        self.placed_at[row]
    }

    pub fn last_update_at(&self, row: usize) -> Option<NaiveDateTime> {
        self.updated_at[row]
    }
}

fn lookup<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a ArrayRef> {
    let found = batch.column_by_name(name);
    if found.is_none() {
        warn!(column = name, "Column missing from batch; reading it as null");
    }
    found
}

fn text_at(array: Option<&StringArray>, row: usize) -> Option<&str> {
    array.filter(|a| a.is_valid(row)).map(|a| a.value(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    #[test]
    fn test_missing_columns_read_as_null() {
        let schema = Arc::new(Schema::new(vec![Field::new("box", DataType::Int64, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Int64Array::from(vec![Some(5), None]))],
        )
        .unwrap();

        let columns = ShipmentColumns::from_batch(&batch, &ColumnNames::default());
        assert_eq!(columns.len(), 2);
        assert_eq!(columns.box_number(0), Some(5));
        assert_eq!(columns.box_number(1), None);
        assert_eq!(columns.order_type(0), None);
        assert_eq!(columns.shipment_status(1), None);
        assert_eq!(columns.order_placed_at(0), None);
    }

    #[test]
    fn test_from_shipments() {
        let rows = vec![
            Shipment {
                box_number: Some("560".into()),
                order_type: Some("S01 - ENTREGA A CLIENTES".into()),
                ..Default::default()
            },
            Shipment::default(),
        ];
        let columns = ShipmentColumns::from_shipments(&rows);
        assert_eq!(columns.box_number(0), Some(560));
        assert_eq!(columns.order_type(0), Some("S01 - ENTREGA A CLIENTES"));
        assert_eq!(columns.box_number(1), None);
        assert_eq!(columns.order_type(1), None);
    }

    #[test]
    fn test_column_names_yaml_uses_box_key() {
        let names: ColumnNames = serde_yaml::from_str("box: doca\n").unwrap();
        assert_eq!(names.box_number, "doca");
        assert_eq!(names.order_type, "order_type");
    }
}
