//! Sector classification and SLA evaluation of shipment rows.
//!
//! Both engines work on a [`ShipmentColumns`] view extracted from a record
//! batch and produce one value per row, in row order:
//!
//! - [`classify`]: sector label, first matching rule wins
//! - [`evaluate_sla`]: SLA verdict, last matching rule wins
//!
//! [`enrich_batch`] and [`enrich_file`] append both results as new columns.

mod columns;
mod enrich;
mod sector;
mod sla;

pub use columns::{ColumnNames, Shipment, ShipmentColumns};
pub use enrich::{EnrichOptions, EnrichStats, enrich_batch, enrich_file};
pub use sector::classify;
pub use sla::{SHIPPED_STATUS, SlaVerdict, evaluate_sla};
