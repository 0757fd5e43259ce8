use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::draw::{DrawDiagnostic, DrawEngine};
use super::error::EngineResult;
use super::ledger::LedgerPeriod;
use super::pool::WeightedItemPool;
use super::{ProductConfig, ratio_pct};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SimulationReport {
    pub plays: u64,
    pub wins: u64,
    pub losses: u64,
    /// Wins lowered to fit a payout ceiling
    pub reduced: u64,
    /// Wins demoted to losses by a payout ceiling
    pub throttled: u64,
    pub total_wagered_cents: i64,
    pub total_paid_cents: i64,
    pub realized_win_rate_pct: f64,
    pub realized_rtp_pct: f64,
    pub profit_margin_pct: f64,
}

/// Replays the draw engine on a throwaway ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioSimulator {
    engine: DrawEngine,
}

impl ScenarioSimulator {
    pub fn new(engine: DrawEngine) -> Self {
        Self { engine }
    }

    /// Simulate `n_plays` plays starting from an empty period.
    pub fn simulate<R: Rng>(
        &self,
        config: &ProductConfig,
        pool: &WeightedItemPool,
        n_plays: u64,
        rng: &mut R,
    ) -> EngineResult<SimulationReport> {
        let start = LedgerPeriod::new(config.product_id, DateTime::<Utc>::UNIX_EPOCH.date_naive(), 0, 0);
        self.simulate_from(config, pool, start, n_plays, rng)
    }

    /// Simulate starting from a copy of an existing period, e.g. today's
    /// state of a live product. The copy is dropped afterwards.
    pub fn simulate_from<R: Rng>(
        &self,
        config: &ProductConfig,
        pool: &WeightedItemPool,
        mut period: LedgerPeriod,
        n_plays: u64,
        rng: &mut R,
    ) -> EngineResult<SimulationReport> {
        // fixed clock keeps the run a pure function of its inputs
        let at: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;
        let mut report = SimulationReport {
            plays: n_plays,
            wins: 0,
            losses: 0,
            reduced: 0,
            throttled: 0,
            total_wagered_cents: 0,
            total_paid_cents: 0,
            realized_win_rate_pct: 0.0,
            realized_rtp_pct: 0.0,
            profit_margin_pct: 0.0,
        };

        for _ in 0..n_plays {
            let result = self.engine.draw(config, pool, &period, rng, at)?;
            period.record(&result.outcome, config.unit_price_cents);

            report.total_wagered_cents += config.unit_price_cents;
            if result.outcome.won {
                report.wins += 1;
                report.total_paid_cents += result.outcome.payout_cents;
            } else {
                report.losses += 1;
            }
            match result.diagnostic {
                Some(DrawDiagnostic::Reduced { .. }) => report.reduced += 1,
                Some(DrawDiagnostic::RtpThrottled { .. }) => report.throttled += 1,
                None => {}
            }
        }

        report.realized_win_rate_pct = ratio_pct(report.wins as i64, n_plays as i64);
        report.realized_rtp_pct = ratio_pct(report.total_paid_cents, report.total_wagered_cents);
        report.profit_margin_pct = ratio_pct(
            report.total_wagered_cents - report.total_paid_cents,
            report.total_wagered_cents,
        );
        Ok(report)
    }
}
