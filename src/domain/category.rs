//! Budget category taxonomy entry

use serde::{Deserialize, Serialize};
use super::entity::Entity;
use super::line_item::RateType;

/// One entry of the category taxonomy: the closed set of valid
/// (summary group, department, sub department, line item, rate type) tuples.
///
/// Seeding the taxonomy is an operational concern outside this crate; the
/// engine only reads it to label new rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetCategory {
    pub id: u32,
    pub summary_group: String,
    pub department: String,
    pub sub_department: String,
    pub line_item: String,
    pub rate_type: RateType,
    /// Display ordering / GL code
    pub ordering: Option<String>,
}

impl Entity for BudgetCategory {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}
