use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::engine::{DrawOutcome, Mode};
use crate::entities::{PlayMode, draw_record_entity};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PlayRequest {
    /// Balance and ledger the play runs against
    pub mode: Mode,
}

/// Result of one purchased play
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayResponse {
    pub outcome: DrawOutcome,
    /// Name of the prize won, if any
    pub prize_name: Option<String>,
    pub mode: Mode,
    pub unit_price_cents: i64,
    /// Balance of the played mode after debit and payout
    pub balance_after_cents: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct DrawRecordQuery {
    /// Page number (default 1)
    pub page: Option<u32>,
    /// Page size (default 20, max 100)
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawRecordResponse {
    pub draw_id: Uuid,
    pub product_id: i64,
    pub mode: PlayMode,
    pub won: bool,
    pub item_id: Option<i64>,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub payout_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl From<draw_record_entity::Model> for DrawRecordResponse {
    fn from(m: draw_record_entity::Model) -> Self {
        DrawRecordResponse {
            draw_id: m.draw_id,
            product_id: m.product_id,
            mode: m.mode,
            won: m.won,
            item_id: m.item_id,
            quantity: m.quantity,
            unit_price_cents: m.unit_price_cents,
            payout_cents: m.payout_cents,
            created_at: m.created_at.unwrap_or_else(Utc::now),
        }
    }
}
