//! Budget domain entity

use serde::{Deserialize, Serialize};
use super::entity::Entity;

/// Parent aggregate for a set of line items. Read-only to the editing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: u32,
    pub show_id: u32,
    pub name: String,
    pub created_at: Option<i64>,
}

impl Entity for Budget {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Budget {
    pub fn new(id: u32, show_id: u32, name: String) -> Self {
        Self {
            id,
            show_id,
            name,
            created_at: None,
        }
    }
}
