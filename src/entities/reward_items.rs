use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::WeightedItem;

/// Reward candidate of a product. Rows are never deleted, only deactivated,
/// so historical draw records keep pointing at something.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "reward_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub weight: i32,
    pub min_quantity: i32,
    pub max_quantity: i32,
    /// Value of one unit (cents)
    pub value_cents: i64,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Model> for WeightedItem {
    fn from(m: Model) -> Self {
        WeightedItem {
            id: m.id,
            name: m.name,
            weight: m.weight,
            min_quantity: m.min_quantity,
            max_quantity: m.max_quantity,
            value_cents: m.value_cents,
            active: m.is_active,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
