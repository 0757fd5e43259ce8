//! Reward draw core.
//!
//! Everything in here is pure: values go in, outcomes come out, nothing
//! touches the database or the network. Services load configuration and
//! ledger snapshots, call into this module and persist the results.
//!
//! Units used across the module:
//! - money is integer cents
//! - win probability and RTP are basis points (100% = 10_000 bp)

pub mod draw;
pub mod error;
pub mod ledger;
pub mod payout;
pub mod pool;
pub mod simulator;

pub use draw::*;
pub use error::*;
pub use ledger::*;
pub use payout::*;
pub use pool::*;
pub use simulator::*;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 100% expressed in basis points.
pub const BP_SCALE: i64 = 10_000;

/// Which balance and which ledger a play runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Real,
    Demo,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Real => "real",
            Mode::Demo => "demo",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine view of one scratch-card or chest type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductConfig {
    pub product_id: i64,
    /// Price of one play (cents, > 0)
    pub unit_price_cents: i64,
    /// Chance that a single play wins anything (bp, 1..=10000)
    pub win_probability_bp: i32,
    /// Long-run share of wagers returned as prizes (bp, 1..=10000)
    pub target_rtp_bp: i32,
    /// Steer realized payouts toward `target_rtp_bp`
    pub rtp_enabled: bool,
}

/// `numerator / denominator` as a percentage, 0 when the denominator is 0.
pub(crate) fn ratio_pct(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 * 100.0 / denominator as f64
}
