//! Rule tables for sector classification and SLA deadlines.
//!
//! Rules are plain data. Evaluation order is part of the contract:
//! classification is first-match-wins, deadlines are last-match-wins
//! (see [`crate::classify`]).

mod tables;

pub use tables::{
    DEFAULT_SECTOR, EAD_STORE_SUPPLY, LIGHT_GOODS, STORE_SUPPLY, sector_rules, sla_rules,
};

use chrono::{Days, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Inclusive range of box (dock slot) numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i64, i64)", into = "(i64, i64)")]
pub struct BoxRange {
    pub start: i64,
    pub end: i64,
}

impl BoxRange {
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Both ends are inclusive.
    pub fn contains(&self, value: i64) -> bool {
        self.start <= value && value <= self.end
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}

impl From<(i64, i64)> for BoxRange {
    fn from((start, end): (i64, i64)) -> Self {
        Self { start, end }
    }
}

impl From<BoxRange> for (i64, i64) {
    fn from(range: BoxRange) -> Self {
        (range.start, range.end)
    }
}

impl fmt::Display for BoxRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// A sector classification rule.
///
/// An empty `order_types` set matches every order type. A rule with an empty
/// set and no box range claims every row that is still unclassified, so it
/// must come after all specific rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassificationRule {
    pub name: String,
    #[serde(default)]
    pub order_types: BTreeSet<String>,
    #[serde(default)]
    pub box_range: Option<BoxRange>,
}

impl ClassificationRule {
    pub fn new<I, S>(name: impl Into<String>, order_types: I, box_range: Option<BoxRange>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            order_types: order_types.into_iter().map(Into::into).collect(),
            box_range,
        }
    }

    /// True when this rule matches every row regardless of type or box.
    pub fn is_catch_all(&self) -> bool {
        self.order_types.is_empty() && self.box_range.is_none()
    }

    /// Whether a row with this order type and normalized box matches the rule.
    ///
    /// An unknown box (`None`) never satisfies a box range.
    pub fn matches(&self, order_type: Option<&str>, box_number: Option<i64>) -> bool {
        let type_matches = self.order_types.is_empty()
            || order_type.is_some_and(|t| self.order_types.contains(t));
        let box_matches = self
            .box_range
            .is_none_or(|range| box_number.is_some_and(|b| range.contains(b)));
        type_matches && box_matches
    }

    /// True when every row this rule could match is also matched by `earlier`.
    fn is_shadowed_by(&self, earlier: &ClassificationRule) -> bool {
        let types_covered = earlier.order_types.is_empty()
            || (!self.order_types.is_empty() && self.order_types.is_subset(&earlier.order_types));
        let range_covered = match (earlier.box_range, self.box_range) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(outer), Some(inner)) => outer.start <= inner.start && inner.end <= outer.end,
        };
        types_covered && range_covered
    }
}

/// Computes an SLA deadline from the time an order was placed.
///
/// Implemented for [`ShiftedDeadline`] and for plain closures, so custom rules
/// can apply arbitrary timestamp transforms.
pub trait Deadline: Send + Sync {
    fn deadline(&self, placed_at: NaiveDateTime) -> NaiveDateTime;
}

impl<F> Deadline for F
where
    F: Fn(NaiveDateTime) -> NaiveDateTime + Send + Sync,
{
    fn deadline(&self, placed_at: NaiveDateTime) -> NaiveDateTime {
        self(placed_at)
    }
}

/// Shift forward by whole days, truncate to midnight, then add a time of day.
///
/// `days == 0` keeps the order's calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftedDeadline {
    pub days: u32,
    pub time_of_day: NaiveTime,
}

impl ShiftedDeadline {
    pub const fn new(days: u32, time_of_day: NaiveTime) -> Self {
        Self { days, time_of_day }
    }

    pub const fn same_day(time_of_day: NaiveTime) -> Self {
        Self::new(0, time_of_day)
    }
}

impl Deadline for ShiftedDeadline {
    fn deadline(&self, placed_at: NaiveDateTime) -> NaiveDateTime {
        let day = placed_at
            .date()
            .checked_add_days(Days::new(u64::from(self.days)))
            .unwrap_or(placed_at.date());
        day.and_time(self.time_of_day)
    }
}

/// An SLA deadline rule for a range of boxes.
#[derive(Clone)]
pub struct DeadlineRule {
    pub box_range: BoxRange,
    pub deadline: Arc<dyn Deadline>,
}

impl DeadlineRule {
    pub fn new(box_range: BoxRange, deadline: impl Deadline + 'static) -> Self {
        Self {
            box_range,
            deadline: Arc::new(deadline),
        }
    }

    pub fn deadline_for(&self, placed_at: NaiveDateTime) -> NaiveDateTime {
        self.deadline.deadline(placed_at)
    }
}

impl fmt::Debug for DeadlineRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadlineRule")
            .field("box_range", &self.box_range)
            .finish_non_exhaustive()
    }
}

/// Log every rule that can never fire because an earlier rule covers it.
///
/// Returns the indices of the shadowed rules. Shadowing is not an error:
/// the table still evaluates, but a catch-all placed too early silently
/// forecloses everything after it.
pub fn validate_sector_rules(rules: &[ClassificationRule]) -> Vec<usize> {
    let mut shadowed = Vec::new();
    for (index, rule) in rules.iter().enumerate() {
        if let Some(earlier) = rules[..index].iter().position(|e| rule.is_shadowed_by(e)) {
            warn!(
                rule = %rule.name,
                position = index,
                shadowed_by = %rules[earlier].name,
                shadowed_by_position = earlier,
                "Sector rule can never match: an earlier rule covers it"
            );
            shadowed.push(index);
        }
    }
    shadowed
}
