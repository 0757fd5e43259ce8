use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::{Adjustment, AutoAdjustment, ConfigField};
use crate::entities::{product_entity, reward_item_entity};

/// Prize as shown to players (no weights)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PrizeView {
    pub id: i64,
    pub name: String,
    pub min_quantity: i32,
    pub max_quantity: i32,
    /// Value of one unit (cents)
    pub value_cents: i64,
}

impl From<&reward_item_entity::Model> for PrizeView {
    fn from(m: &reward_item_entity::Model) -> Self {
        PrizeView {
            id: m.id,
            name: m.name.clone(),
            min_quantity: m.min_quantity,
            max_quantity: m.max_quantity,
            value_cents: m.value_cents,
        }
    }
}

/// Product as listed in the player catalog
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    /// Price of one play (cents)
    pub unit_price_cents: i64,
    /// Active prizes, weight-0 items included
    pub prizes: Vec<PrizeView>,
}

impl ProductSummary {
    pub fn new(product: &product_entity::Model, items: &[reward_item_entity::Model]) -> Self {
        ProductSummary {
            id: product.id,
            name: product.name.clone(),
            category: product.category.clone(),
            unit_price_cents: product.unit_price_cents,
            prizes: items
                .iter()
                .filter(|i| i.is_active)
                .map(PrizeView::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RewardItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub weight: i32,
    pub min_quantity: i32,
    pub max_quantity: i32,
    pub value_cents: i64,
    pub is_active: bool,
}

impl From<reward_item_entity::Model> for RewardItemResponse {
    fn from(m: reward_item_entity::Model) -> Self {
        RewardItemResponse {
            id: m.id,
            product_id: m.product_id,
            name: m.name,
            weight: m.weight,
            min_quantity: m.min_quantity,
            max_quantity: m.max_quantity,
            value_cents: m.value_cents,
            is_active: m.is_active,
        }
    }
}

/// Full product configuration (admin)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductDetail {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub unit_price_cents: i64,
    /// Chance that a play wins (bp, 10000 = 100%)
    pub win_probability_bp: i32,
    /// Target return to player (bp)
    pub target_rtp_bp: i32,
    pub rtp_enabled: bool,
    pub is_active: bool,
    /// Copied into each new ledger period; 0 disables the goal gate
    pub daily_profit_goal_cents: i64,
    /// Copied into each new ledger period; 0 means no budget
    pub daily_prize_budget_cents: i64,
    /// Sum of effective item weights; 0 means the product cannot be drawn
    pub total_weight: i64,
    pub items: Vec<RewardItemResponse>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductDetail {
    pub fn new(product: product_entity::Model, items: Vec<reward_item_entity::Model>) -> Self {
        let total_weight = items
            .iter()
            .filter(|i| i.is_active && i.weight > 0)
            .map(|i| i.weight as i64)
            .sum();
        ProductDetail {
            id: product.id,
            name: product.name,
            category: product.category,
            unit_price_cents: product.unit_price_cents,
            win_probability_bp: product.win_probability_bp,
            target_rtp_bp: product.target_rtp_bp,
            rtp_enabled: product.rtp_enabled,
            is_active: product.is_active,
            daily_profit_goal_cents: product.daily_profit_goal_cents,
            daily_prize_budget_cents: product.daily_prize_budget_cents,
            total_weight,
            items: items.into_iter().map(Into::into).collect(),
            updated_at: product.updated_at,
        }
    }
}

/// Create a product. Probabilities default to the category preset when
/// omitted.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    /// Preset key: pix / sorte / ouro / diamante / premium
    pub category: Option<String>,
    pub unit_price_cents: i64,
    pub win_probability_bp: Option<i32>,
    pub target_rtp_bp: Option<i32>,
    pub rtp_enabled: Option<bool>,
    pub is_active: Option<bool>,
    pub daily_profit_goal_cents: Option<i64>,
    pub daily_prize_budget_cents: Option<i64>,
    /// Recompute the dependent field instead of rejecting an unsafe pair
    #[serde(default)]
    pub auto_adjust: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub unit_price_cents: Option<i64>,
    pub win_probability_bp: Option<i32>,
    pub target_rtp_bp: Option<i32>,
    pub rtp_enabled: Option<bool>,
    pub is_active: Option<bool>,
    pub daily_profit_goal_cents: Option<i64>,
    pub daily_prize_budget_cents: Option<i64>,
    #[serde(default)]
    pub auto_adjust: bool,
}

impl UpdateProductRequest {
    /// Field the admin edited, which decides what `auto_adjust` may move.
    /// An explicit target RTP wins when both are present.
    pub fn changed_field(&self) -> ConfigField {
        if self.target_rtp_bp.is_some() {
            ConfigField::TargetRtp
        } else {
            ConfigField::WinProbability
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ApplyPresetRequest {
    pub category: String,
}

/// Result of an admin configuration write
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductWriteResponse {
    pub product: ProductDetail,
    /// Changes made by auto-adjust, empty when the input was already safe
    pub adjustments: Vec<Adjustment>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRewardItemRequest {
    pub name: String,
    pub weight: i32,
    pub min_quantity: i32,
    pub max_quantity: i32,
    pub value_cents: i64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateWeightRequest {
    pub weight: i32,
}

/// Safety preview of a probability / RTP pair; nothing is written.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SafetyCheckRequest {
    pub win_probability_bp: i32,
    pub target_rtp_bp: i32,
    /// Field being edited; drives the suggested adjustment
    pub changed_field: Option<ConfigField>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SafetyCheckResponse {
    pub safe: bool,
    /// `min(win × 4, 70%)`
    pub max_rtp_bp: i32,
    pub violation: Option<String>,
    /// Safe configuration auto-adjust would produce
    pub suggestion: Option<AutoAdjustment>,
}
