use serde::Serialize;
use utoipa::ToSchema;

use crate::entities::wallet_entity;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletResponse {
    /// Real money balance (cents)
    pub balance_cents: i64,
    /// Play money used by demo mode (cents)
    pub demo_balance_cents: i64,
}

impl From<wallet_entity::Model> for WalletResponse {
    fn from(m: wallet_entity::Model) -> Self {
        WalletResponse {
            balance_cents: m.balance_cents,
            demo_balance_cents: m.demo_balance_cents,
        }
    }
}
