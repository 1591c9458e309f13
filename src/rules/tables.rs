//! Reference rule tables for the outbound dock.
//!
//! Order matters: box-ranged rules come first, generic (range-free) rules
//! afterwards, so a generic rule only claims rows no ranged rule matched.

use chrono::NaiveTime;

use super::{BoxRange, ClassificationRule, DeadlineRule, ShiftedDeadline};

/// Label for rows no sector rule matches.
pub const DEFAULT_SECTOR: &str = "Outras Saidas";

/// Store replenishment order types.
pub const STORE_SUPPLY: [&str; 5] = [
    "S13 - ABASTECIMENTO DE LOJA BOA",
    "S14 - ABASTECIMENTO DE LOJA QEB",
    "S46 - ABASTECIMENTO RETIRA LOJA",
    "S48 - ABASTECIMENTO CEL RJ",
    "S11 - TRANSF. LOJA VIA DEPOSITO BOA",
];

/// Distribution-centre transfer order types.
pub const EAD_STORE_SUPPLY: [&str; 2] = ["S05 - TRANSF EAD PROGRAMADA", "S04 - TRANSF EAD AUTOMATICA"];

/// Light goods order types.
pub const LIGHT_GOODS: [&str; 6] = [
    "S39 - EXPEDICAO LEVES",
    "S39M - EXPEDICAO LEVES",
    "S39R - Single line",
    "S39R - SINGLE LINE",
    "S39P - EXPEDICAO LEVES",
    "S39I - EXPEDICAO LEVES",
];

const CUSTOMER_DELIVERY: &str = "S01 - ENTREGA A CLIENTES";
const CUSTOMER_PICKUP: &str = "S02 - RETIRA CLIENTE DEPOSITO";
const CD_TRANSFER: &str = "S53 - TRANSFERENCIA ENTRE CDS";

/// The reference sector table, evaluated first-match-wins.
pub fn sector_rules() -> Vec<ClassificationRule> {
    vec![
        // Ranged rules
        ClassificationRule::new(
            "Fracionado Pesados",
            [CUSTOMER_DELIVERY],
            Some(BoxRange::new(557, 584)),
        ),
        ClassificationRule::new(
            "EAD - Abastecimento de Lojas",
            STORE_SUPPLY,
            Some(BoxRange::new(595, 638)),
        ),
        ClassificationRule::new(
            "Polo - Abastecimento de Lojas",
            STORE_SUPPLY,
            Some(BoxRange::new(277, 326)),
        ),
        // Order type spelled exactly as the extract carries it.
        ClassificationRule::new(
            "Ribeirao Preto + Uberlandia",
            ["S01 - ENTGA A CLIENTES"],
            Some(BoxRange::new(331, 412)),
        ),
        ClassificationRule::new(
            "Entrega Cliente + Polo-SP",
            [CUSTOMER_DELIVERY, CUSTOMER_PICKUP],
            Some(BoxRange::new(413, 556)),
        ),
        ClassificationRule::new("EAD - Balanço", [CD_TRANSFER], Some(BoxRange::new(595, 638))),
        // Generic rules
        ClassificationRule::new("Abastecimento de Lojas", STORE_SUPPLY, None),
        ClassificationRule::new(
            "Ribeirao Preto + Uberlandia",
            [CUSTOMER_DELIVERY, CUSTOMER_PICKUP],
            None,
        ),
        ClassificationRule::new("Balanco", [CD_TRANSFER], None),
        ClassificationRule::new("EAD", EAD_STORE_SUPPLY, None),
        ClassificationRule::new("Leves", LIGHT_GOODS, None),
    ]
}

/// The reference SLA table, evaluated last-match-wins.
///
/// Customer delivery boxes ship by 05:30 the next morning. Heavy goods boxes
/// ship the same day by 22:00, except the tail of the range (580-584), which
/// the later rule moves to 08:00 the next morning.
pub fn sla_rules() -> Vec<DeadlineRule> {
    vec![
        DeadlineRule::new(BoxRange::new(413, 526), CUSTOMER_DELIVERY_DEADLINE),
        DeadlineRule::new(BoxRange::new(557, 584), HEAVY_SAME_DAY),
        DeadlineRule::new(BoxRange::new(580, 584), HEAVY_TAIL),
    ]
}

const CUSTOMER_DELIVERY_DEADLINE: ShiftedDeadline = ShiftedDeadline::new(1, time_of_day(5, 30));
const HEAVY_SAME_DAY: ShiftedDeadline = ShiftedDeadline::same_day(time_of_day(22, 0));
const HEAVY_TAIL: ShiftedDeadline = ShiftedDeadline::new(1, time_of_day(8, 0));

/// Evaluated at compile time; an out-of-range time fails the build.
const fn time_of_day(hour: u32, minute: u32) -> NaiveTime {
    match NaiveTime::from_hms_opt(hour, minute, 0) {
        Some(time) => time,
        None => panic!("reference deadline time of day is out of range"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::validate_sector_rules;

    #[test]
    fn test_reference_table_has_no_shadowed_rules() {
        assert!(validate_sector_rules(&sector_rules()).is_empty());
    }

    #[test]
    fn test_reference_table_has_no_catch_all() {
        assert!(sector_rules().iter().all(|r| !r.is_catch_all()));
    }

    #[test]
    fn test_ranged_rules_precede_generic_rules() {
        let rules = sector_rules();
        let first_generic = rules.iter().position(|r| r.box_range.is_none()).unwrap();
        assert!(rules[first_generic..].iter().all(|r| r.box_range.is_none()));
    }

    #[test]
    fn test_reference_deadlines_keep_declared_times() {
        use crate::rules::Deadline;
        use chrono::NaiveDate;

        let placed = NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap();
        let next_day = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        assert_eq!(
            CUSTOMER_DELIVERY_DEADLINE.deadline(placed),
            next_day.and_hms_opt(5, 30, 0).unwrap()
        );
        assert_eq!(
            HEAVY_SAME_DAY.deadline(placed),
            placed.date().and_hms_opt(22, 0, 0).unwrap()
        );
        assert_eq!(
            HEAVY_TAIL.deadline(placed),
            next_day.and_hms_opt(8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_sla_ranges_are_valid() {
        assert!(sla_rules().iter().all(|r| r.box_range.is_valid()));
    }
}
