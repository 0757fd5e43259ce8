use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::Mode;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "play_mode")]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    #[sea_orm(string_value = "real")]
    Real,
    #[sea_orm(string_value = "demo")]
    Demo,
}

impl From<Mode> for PlayMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Real => PlayMode::Real,
            Mode::Demo => PlayMode::Demo,
        }
    }
}

/// Audit trail: one row per play
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "draw_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub draw_id: Uuid,
    pub user_id: i64,
    pub product_id: i64,
    pub mode: PlayMode,
    pub won: bool,
    pub item_id: Option<i64>,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub payout_cents: i64,
    /// Serialized DrawDiagnostic when a ceiling changed the payout
    pub diagnostic: Option<Json>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
