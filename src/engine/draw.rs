use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::{EngineError, EngineResult};
use super::ledger::LedgerPeriod;
use super::pool::{WeightedItem, WeightedItemPool};
use super::{BP_SCALE, ProductConfig};

/// Default slack above the target RTP before payouts are capped (1pp).
pub const DEFAULT_RTP_TOLERANCE_BP: i32 = 100;

/// Result of one play. Never mutated after the draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DrawOutcome {
    pub draw_id: Uuid,
    pub won: bool,
    pub item_id: Option<i64>,
    pub quantity: i32,
    pub payout_cents: i64,
    pub timestamp: DateTime<Utc>,
}

impl DrawOutcome {
    pub fn loss(at: DateTime<Utc>) -> Self {
        Self {
            draw_id: Uuid::new_v4(),
            won: false,
            item_id: None,
            quantity: 0,
            payout_cents: 0,
            timestamp: at,
        }
    }

    fn win(item: &WeightedItem, quantity: i32, payout_cents: i64, at: DateTime<Utc>) -> Self {
        Self {
            draw_id: Uuid::new_v4(),
            won: true,
            item_id: Some(item.id),
            quantity,
            payout_cents,
            timestamp: at,
        }
    }
}

/// Which limit capped a payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CeilingKind {
    Rtp,
    PrizeBudget,
    ProfitGoal,
}

impl CeilingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CeilingKind::Rtp => "rtp",
            CeilingKind::PrizeBudget => "prize_budget",
            CeilingKind::ProfitGoal => "profit_goal",
        }
    }
}

/// Side information about a draw whose payout was capped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawDiagnostic {
    /// Payout lowered to fit under the ceiling.
    Reduced {
        ceiling: CeilingKind,
        requested_cents: i64,
        paid_cents: i64,
    },
    /// Nothing fit under the ceiling; the win was turned into a loss.
    RtpThrottled {
        ceiling: CeilingKind,
        requested_cents: i64,
        limit_cents: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawResult {
    pub outcome: DrawOutcome,
    pub diagnostic: Option<DrawDiagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawSettings {
    pub rtp_tolerance_bp: i32,
}

impl Default for DrawSettings {
    fn default() -> Self {
        Self {
            rtp_tolerance_bp: DEFAULT_RTP_TOLERANCE_BP,
        }
    }
}

/// Weighted reward draw.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrawEngine {
    settings: DrawSettings,
}

impl DrawEngine {
    pub fn new(settings: DrawSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> DrawSettings {
        self.settings
    }

    /// Draw one play of `config` against `pool`.
    ///
    /// `period` is the ledger state before this play; the caller records the
    /// outcome into it afterwards while still holding whatever serializes
    /// access to that period.
    pub fn draw<R: Rng>(
        &self,
        config: &ProductConfig,
        pool: &WeightedItemPool,
        period: &LedgerPeriod,
        rng: &mut R,
        at: DateTime<Utc>,
    ) -> EngineResult<DrawResult> {
        let roll = rng.random_range(0..BP_SCALE);
        if roll >= config.win_probability_bp as i64 {
            return Ok(DrawResult {
                outcome: DrawOutcome::loss(at),
                diagnostic: None,
            });
        }

        let total_weight = pool.total_weight();
        if total_weight <= 0 {
            return Err(EngineError::Configuration {
                product_id: config.product_id,
                reason: "no active reward item with a positive weight".into(),
            });
        }

        let pick = rng.random_range(0..total_weight);
        let item = pool.pick(pick).ok_or_else(|| EngineError::Configuration {
            product_id: config.product_id,
            reason: "weighted selection fell outside the pool".into(),
        })?;

        let (lo, hi) = item.quantity_range();
        let quantity = rng.random_range(lo..=hi);
        let payout = item
            .payout_for(quantity)
            .ok_or_else(|| EngineError::Configuration {
                product_id: config.product_id,
                reason: format!("payout of item {} overflows", item.id),
            })?;

        let Some((ceiling, kind)) = self.payout_ceiling(config, period, payout) else {
            return Ok(DrawResult {
                outcome: DrawOutcome::win(item, quantity, payout, at),
                diagnostic: None,
            });
        };
        if payout <= ceiling {
            return Ok(DrawResult {
                outcome: DrawOutcome::win(item, quantity, payout, at),
                diagnostic: None,
            });
        }

        // re-roll downward: same item with fewer units, then a cheaper item
        let lowered = item
            .largest_fit(ceiling)
            .map(|(qty, paid)| (item, qty, paid))
            .or_else(|| pool.cheapest_fit(ceiling, item.value_cents));

        match lowered {
            Some((chosen, qty, paid)) => {
                log::debug!(
                    target: "draw",
                    "product {} payout reduced by {} ceiling: {} -> {}",
                    config.product_id,
                    kind.as_str(),
                    payout,
                    paid
                );
                Ok(DrawResult {
                    outcome: DrawOutcome::win(chosen, qty, paid, at),
                    diagnostic: Some(DrawDiagnostic::Reduced {
                        ceiling: kind,
                        requested_cents: payout,
                        paid_cents: paid,
                    }),
                })
            }
            None => {
                log::info!(
                    target: "draw",
                    "product {} win demoted by {} ceiling: requested {} limit {}",
                    config.product_id,
                    kind.as_str(),
                    payout,
                    ceiling
                );
                Ok(DrawResult {
                    outcome: DrawOutcome::loss(at),
                    diagnostic: Some(DrawDiagnostic::RtpThrottled {
                        ceiling: kind,
                        requested_cents: payout,
                        limit_cents: ceiling,
                    }),
                })
            }
        }
    }

    /// Tightest payout limit for this play, with the rule that set it.
    fn payout_ceiling(
        &self,
        config: &ProductConfig,
        period: &LedgerPeriod,
        payout: i64,
    ) -> Option<(i64, CeilingKind)> {
        let mut ceilings: Vec<(i64, CeilingKind)> = Vec::with_capacity(3);

        if config.rtp_enabled {
            let allowed_bp = (config.target_rtp_bp + self.settings.rtp_tolerance_bp) as i128;
            let sales = (period.total_sales_cents + config.unit_price_cents) as i128;
            let cap = (allowed_bp * sales).div_euclid(BP_SCALE as i128);
            let room = cap - period.total_prizes_cents as i128;
            ceilings.push((
                room.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
                CeilingKind::Rtp,
            ));
        }

        if let Some(remaining) = period.remaining_budget_cents() {
            ceilings.push((remaining, CeilingKind::PrizeBudget));
        }

        // prizes worth more than the card are expensive
        if payout > config.unit_price_cents
            && let Some(limit) = period.expensive_prize_ceiling()
        {
            ceilings.push((limit.max(config.unit_price_cents), CeilingKind::ProfitGoal));
        }

        ceilings.into_iter().min_by_key(|(cap, _)| *cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::payout::config;
    use crate::engine::pool::item;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn period() -> LedgerPeriod {
        LedgerPeriod::new(1, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(), 0, 0)
    }

    #[test]
    fn test_weighted_choice_follows_weights() {
        let engine = DrawEngine::default();
        let cfg = config(10_000, 7_000);
        let pool =
            WeightedItemPool::from_items([item(1, 1, 1, 1, 10), item(2, 3, 1, 1, 10)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let now = Utc::now();

        let mut heavy = 0;
        for _ in 0..10_000 {
            let result = engine.draw(&cfg, &pool, &period(), &mut rng, now).unwrap();
            assert!(result.outcome.won);
            if result.outcome.item_id == Some(2) {
                heavy += 1;
            }
        }
        assert!((7_300..=7_700).contains(&heavy), "heavy item drawn {heavy} times");
    }

    #[test]
    fn test_empty_pool_is_a_configuration_error() {
        let engine = DrawEngine::default();
        let cfg = config(10_000, 1_000);
        let pool = WeightedItemPool::from_items([item(1, 0, 0, 0, 0)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = engine
            .draw(&cfg, &pool, &period(), &mut rng, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration { product_id: 1, .. }));
    }

    #[test]
    fn test_losses_pay_nothing_and_wins_pay_something() {
        let engine = DrawEngine::default();
        let cfg = config(3_000, 4_000);
        let pool = WeightedItemPool::from_items([item(1, 2, 0, 3, 25), item(2, 1, 2, 2, 80)])
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..5_000 {
            let outcome = engine
                .draw(&cfg, &pool, &period(), &mut rng, Utc::now())
                .unwrap()
                .outcome;
            assert!(outcome.payout_cents >= 0);
            assert_eq!(outcome.payout_cents > 0, outcome.won);
            assert_eq!(outcome.item_id.is_some(), outcome.won);
        }
    }

    #[test]
    fn test_loss_does_not_need_items() {
        // a certain loss never looks at the pool
        let engine = DrawEngine::default();
        let cfg = config(1, 1);
        let pool = WeightedItemPool::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut losses = 0;
        for _ in 0..100 {
            if let Ok(result) = engine.draw(&cfg, &pool, &period(), &mut rng, Utc::now()) {
                assert!(!result.outcome.won);
                losses += 1;
            }
        }
        assert!(losses >= 95);
    }

    #[test]
    fn test_rtp_ceiling_reduces_quantity() {
        let engine = DrawEngine::new(DrawSettings { rtp_tolerance_bp: 0 });
        let mut cfg = config(10_000, 5_000);
        cfg.rtp_enabled = true;
        let pool = WeightedItemPool::from_items([item(1, 1, 5, 5, 100)]).unwrap();
        let mut ledger = period();
        ledger.total_sales_cents = 1_900;
        ledger.total_prizes_cents = 800;

        // cap is 50% of 2000 = 1000, leaving 200: not even the minimum 5 units fit
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let result = engine.draw(&cfg, &pool, &ledger, &mut rng, Utc::now()).unwrap();
        assert!(!result.outcome.won);
        assert_eq!(
            result.diagnostic,
            Some(DrawDiagnostic::RtpThrottled {
                ceiling: CeilingKind::Rtp,
                requested_cents: 500,
                limit_cents: 200,
            })
        );

        let pool = WeightedItemPool::from_items([item(1, 1, 1, 5, 100)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        for _ in 0..50 {
            let result = engine.draw(&cfg, &pool, &ledger, &mut rng, Utc::now()).unwrap();
            assert!(result.outcome.won);
            assert!(result.outcome.payout_cents <= 200);
        }
    }

    #[test]
    fn test_rtp_ceiling_falls_back_to_cheaper_item() {
        let engine = DrawEngine::new(DrawSettings { rtp_tolerance_bp: 0 });
        let mut cfg = config(10_000, 5_000);
        cfg.rtp_enabled = true;
        let pool = WeightedItemPool::from_items([item(1, 1, 1, 1, 30), item(2, 1_000_000, 1, 1, 900)])
            .unwrap();
        let mut ledger = period();
        ledger.total_sales_cents = 900;
        ledger.total_prizes_cents = 450;

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let result = engine.draw(&cfg, &pool, &ledger, &mut rng, Utc::now()).unwrap();
        assert_eq!(result.outcome.item_id, Some(1));
        assert_eq!(result.outcome.payout_cents, 30);
        assert!(matches!(result.diagnostic, Some(DrawDiagnostic::Reduced { ceiling: CeilingKind::Rtp, .. })));
    }

    #[test]
    fn test_budget_ceiling_applies_without_rtp() {
        let engine = DrawEngine::default();
        let cfg = config(10_000, 1_000);
        let pool = WeightedItemPool::from_items([item(1, 1, 3, 3, 100)]).unwrap();
        let mut ledger = period();
        ledger.set_targets(0, 1_000);
        ledger.total_prizes_cents = 950;

        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let result = engine.draw(&cfg, &pool, &ledger, &mut rng, Utc::now()).unwrap();
        assert!(!result.outcome.won);
        assert!(matches!(
            result.diagnostic,
            Some(DrawDiagnostic::RtpThrottled { ceiling: CeilingKind::PrizeBudget, limit_cents: 50, .. })
        ));
    }

    #[test]
    fn test_profit_goal_gate_only_blocks_expensive_prizes() {
        let engine = DrawEngine::default();
        let cfg = config(10_000, 1_000);
        let mut ledger = period();
        ledger.set_targets(10_000, 0);

        // 100 is the unit price: not expensive, always allowed
        let cheap = WeightedItemPool::from_items([item(1, 1, 1, 1, 100)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let result = engine.draw(&cfg, &cheap, &ledger, &mut rng, Utc::now()).unwrap();
        assert_eq!(result.outcome.payout_cents, 100);
        assert!(result.diagnostic.is_none());

        // net 0, goal 10000: expensive prizes allowed up to 5000
        let pricey = WeightedItemPool::from_items([item(1, 1, 1, 1, 6_000)]).unwrap();
        let result = engine.draw(&cfg, &pricey, &ledger, &mut rng, Utc::now()).unwrap();
        assert!(!result.outcome.won);

        let fits = WeightedItemPool::from_items([item(1, 1, 1, 1, 5_000)]).unwrap();
        let result = engine.draw(&cfg, &fits, &ledger, &mut rng, Utc::now()).unwrap();
        assert_eq!(result.outcome.payout_cents, 5_000);
    }

    #[test]
    fn test_unvalidated_oversized_item_fails_instead_of_wrapping() {
        let engine = DrawEngine::default();
        let cfg = config(10_000, 1_000);
        // bypasses validation the way a corrupted pool would
        let pool: WeightedItemPool = serde_json::from_value(serde_json::json!({
            "items": [item(1, 1, 2, 2, i64::MAX / 2 + 1)]
        }))
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let err = engine
            .draw(&cfg, &pool, &period(), &mut rng, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration { product_id: 1, .. }));
    }
}
