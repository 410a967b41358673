//! Line Item Entity
//!
//! One budgeted cost row: hierarchical category labels, quantity inputs and
//! a derived GBP total.

use serde::{Deserialize, Serialize};
use super::entity::Entity;

/// Billing unit applied to a line item's rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateType {
    /// One-off fee
    #[default]
    Fee,
    Allowance,
    Buyout,
    Weekly,
    Daily,
}

impl RateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateType::Fee => "fee",
            RateType::Allowance => "allowance",
            RateType::Buyout => "buyout",
            RateType::Weekly => "weekly",
            RateType::Daily => "daily",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "allowance" => RateType::Allowance,
            "buyout" => RateType::Buyout,
            "weekly" => RateType::Weekly,
            "daily" => RateType::Daily,
            _ => RateType::Fee,
        }
    }
}

/// The closed set of fields a budget cell editor may touch.
///
/// Editing one of the three quantity inputs recomputes the row total;
/// everything else passes through verbatim. Adding a field here forces the
/// dispatch in the edit session to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditableField {
    NumberOfItems,
    Quantity,
    RateGbp,
    LineItem,
    RateType,
    Notes,
}

impl EditableField {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditableField::NumberOfItems => "number_of_items",
            EditableField::Quantity => "quantity",
            EditableField::RateGbp => "rate_gbp",
            EditableField::LineItem => "line_item",
            EditableField::RateType => "rate_type",
            EditableField::Notes => "notes",
        }
    }

    /// Whether an edit to this field invalidates the derived total
    pub fn recomputes_total(&self) -> bool {
        match self {
            EditableField::NumberOfItems | EditableField::Quantity | EditableField::RateGbp => true,
            EditableField::LineItem | EditableField::RateType | EditableField::Notes => false,
        }
    }
}

/// A budgeted cost row
///
/// Category labels are denormalized copies taken from the taxonomy at
/// creation time, so historical rows are unaffected by later taxonomy edits.
/// `total_gbp` is derived and never independently user-editable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Unique identifier, assigned by the persistence layer
    pub id: u32,
    /// Owning budget, immutable after creation
    pub budget_id: u32,
    pub summary_group: String,
    pub department: String,
    pub sub_department: String,
    /// Free-text label/description
    pub line_item: String,
    pub number_of_items: f64,
    pub quantity: f64,
    pub rate_gbp: f64,
    pub rate_type: RateType,
    /// Always `number_of_items * quantity * rate_gbp`
    pub total_gbp: f64,
    pub notes: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl Entity for LineItem {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Fields for a line item that has not been persisted yet.
///
/// Creation must round-trip through the gateway to obtain an id before the
/// row is addressable, so there is no id here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub budget_id: u32,
    pub summary_group: String,
    pub department: String,
    pub sub_department: String,
    pub line_item: String,
    pub number_of_items: f64,
    pub quantity: f64,
    pub rate_gbp: f64,
    pub rate_type: RateType,
    pub total_gbp: f64,
}

impl From<NewLineItem> for LineItem {
    /// An unpersisted row; id 0 is a placeholder until the store assigns one
    fn from(new: NewLineItem) -> Self {
        Self {
            id: 0,
            budget_id: new.budget_id,
            summary_group: new.summary_group,
            department: new.department,
            sub_department: new.sub_department,
            line_item: new.line_item,
            number_of_items: new.number_of_items,
            quantity: new.quantity,
            rate_gbp: new.rate_gbp,
            rate_type: new.rate_type,
            total_gbp: new.total_gbp,
            notes: String::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// Partial-update payload sent to the gateway after the debounce window.
///
/// Only the most recent patch per row is ever sent; unset fields leave the
/// stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_items: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_gbp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_type: Option<RateType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_gbp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LineItemPatch {
    /// Snapshot every editable field of a row, plus its derived total
    pub fn from_item(item: &LineItem) -> Self {
        Self {
            number_of_items: Some(item.number_of_items),
            quantity: Some(item.quantity),
            rate_gbp: Some(item.rate_gbp),
            rate_type: Some(item.rate_type),
            total_gbp: Some(item.total_gbp),
            line_item: Some(item.line_item.clone()),
            notes: Some(item.notes.clone()),
        }
    }

    /// Overlay the set fields onto an existing row
    pub fn apply_to(&self, item: &mut LineItem) {
        if let Some(n) = self.number_of_items {
            item.number_of_items = n;
        }
        if let Some(q) = self.quantity {
            item.quantity = q;
        }
        if let Some(r) = self.rate_gbp {
            item.rate_gbp = r;
        }
        if let Some(rt) = self.rate_type {
            item.rate_type = rt;
        }
        if let Some(t) = self.total_gbp {
            item.total_gbp = t;
        }
        if let Some(label) = &self.line_item {
            item.line_item = label.clone();
        }
        if let Some(notes) = &self.notes {
            item.notes = notes.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> LineItem {
        LineItem {
            id: 1,
            budget_id: 1,
            summary_group: "CAPEX".to_string(),
            department: "Set".to_string(),
            sub_department: "Construction".to_string(),
            line_item: "Timber".to_string(),
            number_of_items: 2.0,
            quantity: 3.0,
            rate_gbp: 10.0,
            rate_type: RateType::Fee,
            total_gbp: 60.0,
            notes: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_rate_type_round_trip() {
        assert_eq!(RateType::Weekly.as_str(), "weekly");
        assert_eq!(RateType::from_str("buyout"), RateType::Buyout);
        // Unknown units fall back to the default
        assert_eq!(RateType::from_str("hourly"), RateType::Fee);
    }

    #[test]
    fn test_quantity_fields_recompute_total() {
        assert!(EditableField::NumberOfItems.recomputes_total());
        assert!(EditableField::Quantity.recomputes_total());
        assert!(EditableField::RateGbp.recomputes_total());
        assert!(!EditableField::LineItem.recomputes_total());
        assert!(!EditableField::RateType.recomputes_total());
        assert!(!EditableField::Notes.recomputes_total());
    }

    #[test]
    fn test_patch_overlays_set_fields_only() {
        let mut item = sample_item();
        let patch = LineItemPatch {
            quantity: Some(5.0),
            total_gbp: Some(100.0),
            ..Default::default()
        };
        patch.apply_to(&mut item);
        assert_eq!(item.quantity, 5.0);
        assert_eq!(item.total_gbp, 100.0);
        // Untouched fields keep their values
        assert_eq!(item.number_of_items, 2.0);
        assert_eq!(item.line_item, "Timber");
    }

    #[test]
    fn test_patch_serializes_set_fields_only() {
        let patch = LineItemPatch {
            quantity: Some(5.0),
            rate_type: Some(RateType::Weekly),
            ..Default::default()
        };
        let value = serde_json::to_value(&patch).expect("Serialize failed");
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["quantity"], 5.0);
        assert_eq!(object["rate_type"], "weekly");
    }

    #[test]
    fn test_patch_from_item_carries_every_editable_field() {
        let item = sample_item();
        let patch = LineItemPatch::from_item(&item);
        let mut copy = sample_item();
        copy.quantity = 99.0;
        copy.notes = "stale".to_string();
        patch.apply_to(&mut copy);
        assert_eq!(copy, item);
    }
}
