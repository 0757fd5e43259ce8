use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::ProductConfig;

/// Scratch-card / chest product configuration
/// - win_probability_bp / target_rtp_bp: basis points, 100% = 10000
/// - daily_profit_goal_cents / daily_prize_budget_cents: copied into each new
///   ledger period; 0 disables the goal gate / the budget
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    /// Preset family (pix / sorte / ouro ...)
    pub category: Option<String>,
    pub unit_price_cents: i64,
    pub win_probability_bp: i32,
    pub target_rtp_bp: i32,
    pub rtp_enabled: bool,
    pub is_active: bool,
    pub daily_profit_goal_cents: i64,
    pub daily_prize_budget_cents: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn to_config(&self) -> ProductConfig {
        ProductConfig {
            product_id: self.id,
            unit_price_cents: self.unit_price_cents,
            win_probability_bp: self.win_probability_bp,
            target_rtp_bp: self.target_rtp_bp,
            rtp_enabled: self.rtp_enabled,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
