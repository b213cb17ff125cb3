//! Line-item aggregation shared by bill create and edit.
//!
//! Submitted forms can mention the same item several times; before
//! anything persists the lines are merged per identity and unit price,
//! dropped when deleted or empty, and summed into the grand total the
//! bill header stores. The whole pass is pure so every validation
//! problem can be reported at once.

use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::ServiceError;

/// One line as submitted, before any cleanup.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmittedLine {
    /// Catalog item reference, when the line is not free-form.
    pub item_id: Option<Uuid>,
    /// Free-form name for off-catalog lines.
    pub custom_name: Option<String>,
    /// Unit price. Catalog lines without one use the catalog price.
    pub price: Option<Decimal>,
    pub quantity: i32,
    /// Marked for removal by the client; dropped before merging.
    pub delete: bool,
}

/// One line after merging, ready to persist.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregatedLine {
    pub item_id: Option<Uuid>,
    pub custom_item_name: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

impl AggregatedLine {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Result of a successful aggregation pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Aggregation {
    /// Merged lines in first-appearance order.
    pub lines: Vec<AggregatedLine>,
    pub grand_total: Decimal,
}

/// Every violation found in one aggregation pass.
#[derive(Debug, thiserror::Error)]
#[error("{}", .violations.join("; "))]
pub struct AggregationError {
    pub violations: Vec<String>,
}

impl From<AggregationError> for ServiceError {
    fn from(err: AggregationError) -> Self {
        ServiceError::validation(err.violations)
    }
}

/// What makes two lines "the same item". The unit price is part of the
/// identity on purpose: the same item sold at two prices stays two rows.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
enum LineKey {
    Catalog(Uuid),
    Custom(String),
}

/// Merges submitted lines into persistable rows.
///
/// `catalog_prices` must contain an entry for every referenced catalog
/// item; a missing entry reads as an unknown item and is reported.
pub fn aggregate(
    lines: &[SubmittedLine],
    catalog_prices: &HashMap<Uuid, Decimal>,
) -> Result<Aggregation, AggregationError> {
    let mut violations: Vec<String> = Vec::new();
    let mut merged: Vec<AggregatedLine> = Vec::new();
    let mut index: HashMap<(LineKey, Decimal), usize> = HashMap::new();

    for (position, line) in lines.iter().enumerate() {
        if line.delete || line.quantity <= 0 {
            continue;
        }
        let label = position + 1;

        if let Some(item_id) = line.item_id {
            if !catalog_prices.contains_key(&item_id) {
                violations.push(format!("Item {}: unknown catalog item", label));
                continue;
            }
        }

        let trimmed_name = line
            .custom_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        let key = match (line.item_id, trimmed_name) {
            (Some(item_id), _) => LineKey::Catalog(item_id),
            (None, Some(name)) => LineKey::Custom(name.to_string()),
            (None, None) => {
                violations.push(format!(
                    "Item {}: choose a catalog item or enter a name",
                    label
                ));
                continue;
            }
        };

        let price = match (line.price, line.item_id) {
            (Some(price), _) => price,
            (None, Some(item_id)) => catalog_prices[&item_id],
            (None, None) => Decimal::ZERO,
        };
        if price < Decimal::ZERO {
            violations.push(format!("Item {}: price cannot be negative", label));
            continue;
        }

        match index.get(&(key.clone(), price)) {
            Some(&slot) => merged[slot].quantity += line.quantity,
            None => {
                index.insert((key.clone(), price), merged.len());
                merged.push(AggregatedLine {
                    item_id: line.item_id,
                    custom_item_name: match key {
                        LineKey::Custom(name) => Some(name),
                        LineKey::Catalog(_) => None,
                    },
                    price,
                    quantity: line.quantity,
                });
            }
        }
    }

    if !violations.is_empty() {
        return Err(AggregationError { violations });
    }
    if merged.is_empty() {
        return Err(AggregationError {
            violations: vec![
                "Cannot save a bill with no items. Please add at least one item.".to_string(),
            ],
        });
    }

    let grand_total = merged.iter().map(AggregatedLine::line_total).sum();

    Ok(Aggregation {
        lines: merged,
        grand_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn catalog_line(item_id: Uuid, quantity: i32) -> SubmittedLine {
        SubmittedLine {
            item_id: Some(item_id),
            custom_name: None,
            price: None,
            quantity,
            delete: false,
        }
    }

    fn custom_line(name: &str, price: Decimal, quantity: i32) -> SubmittedLine {
        SubmittedLine {
            item_id: None,
            custom_name: Some(name.to_string()),
            price: Some(price),
            quantity,
            delete: false,
        }
    }

    fn one_item_catalog(price: Decimal) -> (Uuid, HashMap<Uuid, Decimal>) {
        let id = Uuid::new_v4();
        let mut catalog = HashMap::new();
        catalog.insert(id, price);
        (id, catalog)
    }

    #[test]
    fn merges_duplicate_catalog_lines() {
        let (tea, catalog) = one_item_catalog(dec!(10.00));
        let lines = vec![catalog_line(tea, 2), catalog_line(tea, 3)];

        let result = aggregate(&lines, &catalog).unwrap();
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].quantity, 5);
        assert_eq!(result.grand_total, dec!(50.00));
    }

    #[test]
    fn same_item_at_two_prices_stays_two_rows() {
        let (tea, catalog) = one_item_catalog(dec!(10.00));
        let mut discounted = catalog_line(tea, 1);
        discounted.price = Some(dec!(8.00));
        let lines = vec![catalog_line(tea, 2), discounted];

        let result = aggregate(&lines, &catalog).unwrap();
        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.grand_total, dec!(28.00));
    }

    #[test]
    fn merge_result_ignores_submission_order() {
        let (tea, catalog) = one_item_catalog(dec!(10.00));
        let forward = vec![
            catalog_line(tea, 2),
            custom_line("Samosa", dec!(15.00), 1),
            catalog_line(tea, 3),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = aggregate(&forward, &catalog).unwrap();
        let b = aggregate(&reversed, &catalog).unwrap();

        assert_eq!(a.grand_total, b.grand_total);
        let mut a_rows: Vec<_> = a.lines.iter().map(|l| (l.price, l.quantity)).collect();
        let mut b_rows: Vec<_> = b.lines.iter().map(|l| (l.price, l.quantity)).collect();
        a_rows.sort();
        b_rows.sort();
        assert_eq!(a_rows, b_rows);
    }

    #[test]
    fn custom_names_merge_after_trimming() {
        let catalog = HashMap::new();
        let lines = vec![
            custom_line(" Samosa ", dec!(15.00), 1),
            custom_line("Samosa", dec!(15.00), 2),
        ];

        let result = aggregate(&lines, &catalog).unwrap();
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].custom_item_name.as_deref(), Some("Samosa"));
        assert_eq!(result.lines[0].quantity, 3);
    }

    #[test]
    fn deleted_and_zero_quantity_lines_are_dropped() {
        let (tea, catalog) = one_item_catalog(dec!(10.00));
        let mut deleted = catalog_line(tea, 5);
        deleted.delete = true;
        let lines = vec![deleted, catalog_line(tea, 0), catalog_line(tea, 2)];

        let result = aggregate(&lines, &catalog).unwrap();
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].quantity, 2);
    }

    #[test]
    fn nothing_left_after_filtering_reports_no_items() {
        let (tea, catalog) = one_item_catalog(dec!(10.00));
        let mut deleted = catalog_line(tea, 5);
        deleted.delete = true;
        let lines = vec![deleted, catalog_line(tea, -1)];

        let err = aggregate(&lines, &catalog).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert!(err.violations[0].contains("no items"));
    }

    #[test]
    fn catalog_price_fills_in_when_line_has_none() {
        let (tea, catalog) = one_item_catalog(dec!(12.50));
        let result = aggregate(&[catalog_line(tea, 2)], &catalog).unwrap();
        assert_eq!(result.lines[0].price, dec!(12.50));
        assert_eq!(result.grand_total, dec!(25.00));
    }

    #[test]
    fn explicit_price_wins_over_catalog_price() {
        let (tea, catalog) = one_item_catalog(dec!(12.50));
        let mut line = catalog_line(tea, 2);
        line.price = Some(dec!(11.00));

        let result = aggregate(&[line], &catalog).unwrap();
        assert_eq!(result.lines[0].price, dec!(11.00));
    }

    #[test]
    fn custom_line_without_price_costs_nothing() {
        let catalog = HashMap::new();
        let mut line = custom_line("Sample cup", dec!(0), 1);
        line.price = None;

        let result = aggregate(&[line], &catalog).unwrap();
        assert_eq!(result.lines[0].price, Decimal::ZERO);
        assert_eq!(result.grand_total, Decimal::ZERO);
    }

    #[test]
    fn collects_every_violation_in_one_pass() {
        let catalog = HashMap::new();
        let unknown = SubmittedLine {
            item_id: Some(Uuid::new_v4()),
            custom_name: None,
            price: None,
            quantity: 1,
            delete: false,
        };
        let nameless = SubmittedLine {
            item_id: None,
            custom_name: Some("   ".to_string()),
            price: Some(dec!(5.00)),
            quantity: 1,
            delete: false,
        };
        let negative = custom_line("Refund", dec!(-5.00), 1);

        let err = aggregate(&[unknown, nameless, negative], &catalog).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        assert!(err.violations[0].contains("Item 1"));
        assert!(err.violations[1].contains("Item 2"));
        assert!(err.violations[2].contains("Item 3"));
    }

    #[test]
    fn first_appearance_order_is_preserved() {
        let (tea, mut catalog) = one_item_catalog(dec!(10.00));
        let coffee = Uuid::new_v4();
        catalog.insert(coffee, dec!(20.00));

        let lines = vec![
            catalog_line(coffee, 1),
            custom_line("Samosa", dec!(15.00), 1),
            catalog_line(tea, 1),
            catalog_line(coffee, 2),
        ];

        let result = aggregate(&lines, &catalog).unwrap();
        let kinds: Vec<Option<Uuid>> = result.lines.iter().map(|l| l.item_id).collect();
        assert_eq!(kinds, vec![Some(coffee), None, Some(tea)]);
        assert_eq!(result.lines[0].quantity, 3);
    }

    #[test]
    fn reaggregating_merged_lines_changes_nothing() {
        let (tea, catalog) = one_item_catalog(dec!(10.00));
        let lines = vec![
            catalog_line(tea, 2),
            custom_line("Samosa", dec!(15.00), 1),
            catalog_line(tea, 1),
        ];

        let first = aggregate(&lines, &catalog).unwrap();
        let resubmitted: Vec<SubmittedLine> = first
            .lines
            .iter()
            .map(|l| SubmittedLine {
                item_id: l.item_id,
                custom_name: l.custom_item_name.clone(),
                price: Some(l.price),
                quantity: l.quantity,
                delete: false,
            })
            .collect();
        let second = aggregate(&resubmitted, &catalog).unwrap();

        assert_eq!(first, second);
    }

    proptest! {
        // Merging must never change what the bill adds up to, no matter
        // how the lines arrive.
        #[test]
        fn totals_and_quantities_survive_merging(
            picks in proptest::collection::vec((0usize..3, 1i32..20), 1..12)
        ) {
            let ids = [
                Uuid::from_u128(1),
                Uuid::from_u128(2),
                Uuid::from_u128(3),
            ];
            let prices = [dec!(10.00), dec!(12.50), dec!(99.99)];
            let catalog: HashMap<Uuid, Decimal> =
                ids.iter().copied().zip(prices.iter().copied()).collect();

            let lines: Vec<SubmittedLine> = picks
                .iter()
                .map(|(slot, quantity)| catalog_line(ids[*slot], *quantity))
                .collect();

            let result = aggregate(&lines, &catalog).unwrap();

            let expected_total: Decimal = picks
                .iter()
                .map(|(slot, quantity)| prices[*slot] * Decimal::from(*quantity))
                .sum();
            let expected_quantity: i32 = picks.iter().map(|(_, quantity)| quantity).sum();

            prop_assert_eq!(result.grand_total, expected_total);
            prop_assert_eq!(
                result.lines.iter().map(|l| l.quantity).sum::<i32>(),
                expected_quantity
            );
            prop_assert!(result.lines.len() <= ids.len());
        }
    }
}
