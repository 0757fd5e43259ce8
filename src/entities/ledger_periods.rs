use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::LedgerPeriod;

/// Daily ledger of one product, unique on (product_id, period_date).
/// `version` is bumped on every write; updates are conditional on the
/// version read before the draw.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_periods")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub product_id: i64,
    pub period_date: NaiveDate,
    pub total_sales_cents: i64,
    pub total_prizes_cents: i64,
    pub plays_count: i64,
    pub wins_count: i64,
    pub profit_goal_cents: i64,
    pub daily_prize_budget_cents: i64,
    pub goal_reached: bool,
    pub version: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn to_period(&self) -> LedgerPeriod {
        LedgerPeriod {
            product_id: self.product_id,
            period_date: self.period_date,
            total_sales_cents: self.total_sales_cents,
            total_prizes_cents: self.total_prizes_cents,
            plays_count: self.plays_count,
            wins_count: self.wins_count,
            profit_goal_cents: self.profit_goal_cents,
            daily_prize_budget_cents: self.daily_prize_budget_cents,
            goal_reached: self.goal_reached,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
