//! SLA verdicts: the last matching deadline rule wins.

use std::fmt;

use chrono::NaiveDateTime;

use super::columns::ShipmentColumns;
use crate::rules::DeadlineRule;

/// Shipment status marking a dispatched shipment.
pub const SHIPPED_STATUS: &str = "Expedido";

/// SLA compliance outcome for one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SlaVerdict {
    /// Not shipped, no placement time, or no rule covers the box.
    #[default]
    Unset,
    OnTime,
    Late,
}

impl SlaVerdict {
    /// Column value for the verdict; `Unset` is written as null.
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            SlaVerdict::Unset => None,
            SlaVerdict::OnTime => Some("on_time"),
            SlaVerdict::Late => Some("late"),
        }
    }

    /// Metric label for the verdict.
    pub fn label(&self) -> &'static str {
        self.as_str().unwrap_or("unset")
    }
}

impl fmt::Display for SlaVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Assign an SLA verdict to every row.
///
/// Only rows whose status equals `shipped_status` and that carry a placement
/// time are evaluated. Each matching rule overwrites the verdict of an
/// earlier one, so where ranges overlap the later rule decides. A missing
/// `last_update_at` counts as late.
pub fn evaluate_sla(
    rows: &ShipmentColumns,
    rules: &[DeadlineRule],
    shipped_status: &str,
) -> Vec<SlaVerdict> {
    let mut verdicts = vec![SlaVerdict::Unset; rows.len()];

    let placed: Vec<Option<NaiveDateTime>> = (0..rows.len())
        .map(|row| {
            if rows.shipment_status(row) == Some(shipped_status) {
                rows.order_placed_at(row)
            } else {
                None
            }
        })
        .collect();

    for rule in rules {
        for (row, verdict) in verdicts.iter_mut().enumerate() {
            let Some(placed_at) = placed[row] else {
                continue;
            };
            if !rows.box_number(row).is_some_and(|b| rule.box_range.contains(b)) {
                continue;
            }
            let deadline = rule.deadline_for(placed_at);
            *verdict = match rows.last_update_at(row) {
                Some(updated) if updated <= deadline => SlaVerdict::OnTime,
                _ => SlaVerdict::Late,
            };
        }
    }

    verdicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::columns::Shipment;
    use crate::rules::{BoxRange, ShiftedDeadline, sla_rules};
    use chrono::{Duration, NaiveDate, NaiveTime};

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn shipped(box_number: &str, placed: NaiveDateTime, updated: Option<NaiveDateTime>) -> Shipment {
        Shipment {
            box_number: Some(box_number.to_string()),
            order_type: None,
            shipment_status: Some(SHIPPED_STATUS.to_string()),
            order_placed_at: Some(placed),
            last_update_at: updated,
        }
    }

    fn verdicts(rows: &[Shipment], rules: &[DeadlineRule]) -> Vec<SlaVerdict> {
        evaluate_sla(&ShipmentColumns::from_shipments(rows), rules, SHIPPED_STATUS)
    }

    #[test]
    fn test_next_day_deadline() {
        let rows = vec![
            shipped("450", at(4, 14, 0), Some(at(5, 5, 30))),
            shipped("450", at(4, 14, 0), Some(at(5, 5, 31))),
        ];
        assert_eq!(
            verdicts(&rows, &sla_rules()),
            vec![SlaVerdict::OnTime, SlaVerdict::Late]
        );
    }

    #[test]
    fn test_later_overlapping_rule_overrides() {
        // 582 sits in both the 557-584 same-day rule and the 580-584 next-day rule
        let rows = vec![
            shipped("582", at(4, 10, 0), Some(at(5, 7, 0))),
            shipped("560", at(4, 10, 0), Some(at(5, 7, 0))),
        ];
        assert_eq!(
            verdicts(&rows, &sla_rules()),
            vec![SlaVerdict::OnTime, SlaVerdict::Late]
        );
    }

    #[test]
    fn test_precondition_failures_stay_unset() {
        let mut not_shipped = shipped("450", at(4, 14, 0), Some(at(4, 15, 0)));
        not_shipped.shipment_status = Some("Em separacao".to_string());
        let mut no_placement = shipped("450", at(4, 14, 0), Some(at(4, 15, 0)));
        no_placement.order_placed_at = None;
        let uncovered = shipped("10", at(4, 14, 0), Some(at(4, 15, 0)));
        let unknown_box = shipped("doca", at(4, 14, 0), Some(at(4, 15, 0)));

        assert_eq!(
            verdicts(&[not_shipped, no_placement, uncovered, unknown_box], &sla_rules()),
            vec![SlaVerdict::Unset; 4]
        );
    }

    #[test]
    fn test_missing_update_is_late() {
        let rows = vec![shipped("450", at(4, 14, 0), None)];
        assert_eq!(verdicts(&rows, &sla_rules()), vec![SlaVerdict::Late]);
    }

    #[test]
    fn test_custom_deadline_function() {
        let rules = vec![DeadlineRule::new(BoxRange::new(1, 5), |placed: NaiveDateTime| {
            placed + Duration::hours(2)
        })];
        let rows = vec![
            shipped("3", at(4, 10, 0), Some(at(4, 12, 0))),
            shipped("3", at(4, 10, 0), Some(at(4, 12, 1))),
        ];
        assert_eq!(
            verdicts(&rows, &rules),
            vec![SlaVerdict::OnTime, SlaVerdict::Late]
        );
    }

    #[test]
    fn test_same_day_deadline() {
        let rules = vec![DeadlineRule::new(
            BoxRange::new(1, 5),
            ShiftedDeadline::same_day(NaiveTime::from_hms_opt(22, 0, 0).unwrap()),
        )];
        let rows = vec![
            shipped("1", at(4, 23, 0), Some(at(4, 23, 30))),
            shipped("1", at(4, 8, 0), Some(at(4, 21, 59))),
        ];
        assert_eq!(
            verdicts(&rows, &rules),
            vec![SlaVerdict::Late, SlaVerdict::OnTime]
        );
    }

    #[test]
    fn test_verdict_column_values() {
        assert_eq!(SlaVerdict::OnTime.as_str(), Some("on_time"));
        assert_eq!(SlaVerdict::Late.as_str(), Some("late"));
        assert_eq!(SlaVerdict::Unset.as_str(), None);
        assert_eq!(SlaVerdict::Unset.to_string(), "unset");
    }
}
