//! Sector classification: first matching rule wins.

use super::columns::ShipmentColumns;
use crate::rules::ClassificationRule;

/// Assign a sector label to every row.
///
/// Rules are applied in table order. A row claimed by a rule is never
/// revisited, so the earliest matching rule decides its label. Rows no rule
/// matches keep `default`.
pub fn classify<'a>(
    rows: &ShipmentColumns,
    rules: &'a [ClassificationRule],
    default: &'a str,
) -> Vec<&'a str> {
    let mut labels = vec![default; rows.len()];
    let mut claimed = vec![false; rows.len()];

    for rule in rules {
        for (row, label) in labels.iter_mut().enumerate() {
            if claimed[row] {
                continue;
            }
            if rule.matches(rows.order_type(row), rows.box_number(row)) {
                *label = rule.name.as_str();
                claimed[row] = true;
            }
        }
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::columns::Shipment;
    use crate::rules::{BoxRange, DEFAULT_SECTOR, sector_rules};

    fn shipment(box_number: &str, order_type: Option<&str>) -> Shipment {
        Shipment {
            box_number: Some(box_number.to_string()),
            order_type: order_type.map(str::to_string),
            ..Default::default()
        }
    }

    fn labels(rows: &[Shipment], rules: &[ClassificationRule]) -> Vec<String> {
        let columns = ShipmentColumns::from_shipments(rows);
        classify(&columns, rules, DEFAULT_SECTOR)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_reference_table_scenario() {
        let rows = vec![
            shipment("560", Some("S01 - ENTREGA A CLIENTES")),
            shipment("300", Some("S13 - ABASTECIMENTO DE LOJA BOA")),
            shipment("9999", Some("X")),
        ];
        assert_eq!(
            labels(&rows, &sector_rules()),
            vec![
                "Fracionado Pesados",
                "Polo - Abastecimento de Lojas",
                DEFAULT_SECTOR
            ]
        );
    }

    #[test]
    fn test_first_match_wins() {
        let rules = vec![
            ClassificationRule::new("first", ["T"], Some(BoxRange::new(1, 10))),
            ClassificationRule::new("second", ["T"], Some(BoxRange::new(5, 20))),
        ];
        let rows = vec![shipment("7", Some("T")), shipment("15", Some("T"))];
        assert_eq!(labels(&rows, &rules), vec!["first", "second"]);
    }

    #[test]
    fn test_empty_type_set_matches_null_type() {
        let rules = vec![ClassificationRule::new(
            "any",
            Vec::<String>::new(),
            Some(BoxRange::new(1, 5)),
        )];
        let rows = vec![shipment("3", None), shipment("9", None)];
        assert_eq!(labels(&rows, &rules), vec!["any", DEFAULT_SECTOR]);
    }

    #[test]
    fn test_unknown_box_only_matches_unranged_rules() {
        let rules = vec![
            ClassificationRule::new("ranged", ["T"], Some(BoxRange::new(1, 1000))),
            ClassificationRule::new("typed", ["T"], None),
        ];
        let rows = vec![shipment("doca", Some("T"))];
        assert_eq!(labels(&rows, &rules), vec!["typed"]);
    }

    #[test]
    fn test_rule_named_like_default_still_claims() {
        let rules = vec![
            ClassificationRule::new(DEFAULT_SECTOR, ["T"], None),
            ClassificationRule::new("later", ["T"], None),
        ];
        let rows = vec![shipment("1", Some("T"))];
        assert_eq!(labels(&rows, &rules), vec![DEFAULT_SECTOR]);
    }

    #[test]
    fn test_empty_input() {
        assert!(labels(&[], &sector_rules()).is_empty());
    }
}
