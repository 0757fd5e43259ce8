use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::{ProductConfig, SimulationReport};

/// Monte-Carlo run of a product. Overrides preview a configuration
/// without saving it.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SimulateRequest {
    pub n_plays: u64,
    /// Fixed seed for a reproducible run, random when omitted
    pub seed: Option<u64>,
    pub win_probability_bp: Option<i32>,
    pub target_rtp_bp: Option<i32>,
    pub rtp_enabled: Option<bool>,
    /// Start from a copy of today's real ledger instead of an empty one
    #[serde(default)]
    pub from_today: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SimulationResponse {
    /// Configuration the run used
    pub config: ProductConfig,
    pub seed: u64,
    pub report: SimulationReport,
}
