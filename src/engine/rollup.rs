//! Derivation Engine
//!
//! Pure functions computing a row's total from its quantity inputs and the
//! grouped rollup over a full line item collection. Nothing here touches the
//! store or the network, and identical input always yields identical output.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::LineItem;

/// Group label for rows whose summary group is missing or blank
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Parse a raw cell value as an amount. Empty or non-numeric input is 0,
/// never an error.
pub fn parse_amount(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(0.0)
}

/// A row's total: items x quantity x rate
pub fn compute_total(number_of_items: f64, quantity: f64, rate_gbp: f64) -> f64 {
    number_of_items * quantity * rate_gbp
}

/// One summary group with its member rows and rolled-up subtotal.
/// Derived on every store mutation, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupNode {
    pub label: String,
    pub subtotal: f64,
    pub rows: Vec<LineItem>,
}

/// Group line items by summary group, in first-seen order.
///
/// Rows inside a group are sorted by (department, id); a blank summary group
/// lands under [`UNCATEGORIZED`] so no row is silently dropped. Budgets are
/// small, so the rollup is recomputed wholesale rather than maintained
/// incrementally.
pub fn compute_rollup(items: &[LineItem]) -> Vec<RollupNode> {
    let mut nodes: Vec<RollupNode> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let label = if item.summary_group.trim().is_empty() {
            UNCATEGORIZED.to_string()
        } else {
            item.summary_group.clone()
        };

        let slot = match index.get(&label) {
            Some(&i) => i,
            None => {
                nodes.push(RollupNode {
                    label: label.clone(),
                    subtotal: 0.0,
                    rows: Vec::new(),
                });
                index.insert(label, nodes.len() - 1);
                nodes.len() - 1
            }
        };
        nodes[slot].rows.push(item.clone());
    }

    for node in &mut nodes {
        node.rows
            .sort_by(|a, b| a.department.cmp(&b.department).then(a.id.cmp(&b.id)));
        node.subtotal = node.rows.iter().map(|row| row.total_gbp).sum();
    }

    nodes
}
