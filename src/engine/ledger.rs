use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::draw::DrawOutcome;
use super::ratio_pct;

/// Daily aggregate of one product.
///
/// `net_profit` and `goal_reached` are derived; they are recomputed on
/// every mutation instead of being stored independently, so they can never
/// drift from the totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LedgerPeriod {
    pub product_id: i64,
    pub period_date: NaiveDate,
    pub total_sales_cents: i64,
    pub total_prizes_cents: i64,
    pub plays_count: i64,
    pub wins_count: i64,
    pub profit_goal_cents: i64,
    pub daily_prize_budget_cents: i64,
    pub goal_reached: bool,
}

impl LedgerPeriod {
    pub fn new(product_id: i64, period_date: NaiveDate, profit_goal_cents: i64, daily_prize_budget_cents: i64) -> Self {
        let mut period = Self {
            product_id,
            period_date,
            total_sales_cents: 0,
            total_prizes_cents: 0,
            plays_count: 0,
            wins_count: 0,
            profit_goal_cents,
            daily_prize_budget_cents,
            goal_reached: false,
        };
        period.refresh();
        period
    }

    pub fn net_profit_cents(&self) -> i64 {
        self.total_sales_cents - self.total_prizes_cents
    }

    /// Budget left for prizes today, `None` when no budget is configured.
    pub fn remaining_budget_cents(&self) -> Option<i64> {
        (self.daily_prize_budget_cents > 0)
            .then(|| self.daily_prize_budget_cents - self.total_prizes_cents)
    }

    /// Fold one play into the aggregate.
    pub fn record(&mut self, outcome: &DrawOutcome, unit_price_cents: i64) {
        self.total_sales_cents += unit_price_cents;
        if outcome.won {
            self.total_prizes_cents += outcome.payout_cents;
            self.wins_count += 1;
        }
        self.plays_count += 1;
        self.refresh();
    }

    /// Whether an expensive prize can still be paid without pushing the
    /// period more than half of its goal into loss.
    pub fn may_award_expensive_prize(&self, candidate_cents: i64) -> bool {
        if self.goal_reached {
            return true;
        }
        // net - candidate >= goal * -0.5, kept in integers
        2 * (self.net_profit_cents() as i128 - candidate_cents as i128)
            >= -(self.profit_goal_cents as i128)
    }

    /// Largest prize the profit-goal gate lets through; `None` when the
    /// gate is not active.
    pub fn expensive_prize_ceiling(&self) -> Option<i64> {
        if self.profit_goal_cents <= 0 || self.goal_reached {
            return None;
        }
        let limit = (2 * self.net_profit_cents() as i128 + self.profit_goal_cents as i128)
            .div_euclid(2);
        Some(limit.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// Zero the running totals, keeping goal and budget.
    pub fn reset(&mut self) {
        self.total_sales_cents = 0;
        self.total_prizes_cents = 0;
        self.plays_count = 0;
        self.wins_count = 0;
        self.goal_reached = false;
    }

    pub fn set_targets(&mut self, profit_goal_cents: i64, daily_prize_budget_cents: i64) {
        self.profit_goal_cents = profit_goal_cents;
        self.daily_prize_budget_cents = daily_prize_budget_cents;
        self.refresh();
    }

    pub fn goal_progress_pct(&self) -> f64 {
        if self.profit_goal_cents <= 0 {
            return 0.0;
        }
        ratio_pct(self.net_profit_cents(), self.profit_goal_cents)
    }

    pub fn profit_margin_pct(&self) -> f64 {
        ratio_pct(self.net_profit_cents(), self.total_sales_cents)
    }

    pub fn realized_rtp_pct(&self) -> f64 {
        ratio_pct(self.total_prizes_cents, self.total_sales_cents)
    }

    fn refresh(&mut self) {
        // a period without plays has not reached anything yet
        self.goal_reached = self.plays_count > 0 && self.net_profit_cents() >= self.profit_goal_cents;
    }
}

pub type PeriodKey = (i64, NaiveDate);

/// In-process ledger keyed by `(product_id, date)`.
///
/// Each period sits behind its own mutex; the map lock is only held while
/// looking up or inserting the entry, so different keys never wait on each
/// other.
#[derive(Debug, Default, Clone)]
pub struct LedgerBook {
    periods: Arc<Mutex<HashMap<PeriodKey, Arc<Mutex<LedgerPeriod>>>>>,
}

impl LedgerBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: PeriodKey, defaults: impl FnOnce() -> LedgerPeriod) -> Arc<Mutex<LedgerPeriod>> {
        let mut periods = self.periods.lock();
        periods
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(defaults())))
            .clone()
    }

    /// Run `f` with exclusive access to the period, creating it on first use.
    pub fn with_period<T>(
        &self,
        key: PeriodKey,
        defaults: impl FnOnce() -> LedgerPeriod,
        f: impl FnOnce(&mut LedgerPeriod) -> T,
    ) -> T {
        let period = self.entry(key, defaults);
        let mut guard = period.lock();
        f(&mut guard)
    }

    pub fn record(&self, key: PeriodKey, outcome: &DrawOutcome, unit_price_cents: i64) -> LedgerPeriod {
        self.with_period(
            key,
            || LedgerPeriod::new(key.0, key.1, 0, 0),
            |period| {
                period.record(outcome, unit_price_cents);
                period.clone()
            },
        )
    }

    pub fn reset_period(&self, key: PeriodKey) -> Option<LedgerPeriod> {
        let period = self.periods.lock().get(&key).cloned()?;
        let mut guard = period.lock();
        guard.reset();
        Some(guard.clone())
    }

    pub fn snapshot(&self, key: PeriodKey) -> Option<LedgerPeriod> {
        let period = self.periods.lock().get(&key).cloned()?;
        let guard = period.lock();
        Some(guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::draw::DrawOutcome;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()
    }

    fn outcome(payout: i64) -> DrawOutcome {
        DrawOutcome {
            draw_id: Uuid::new_v4(),
            won: payout > 0,
            item_id: (payout > 0).then_some(1),
            quantity: (payout > 0) as i32,
            payout_cents: payout,
            timestamp: Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_record_keeps_totals_additive() {
        let mut period = LedgerPeriod::new(1, day(), 500, 0);
        let payouts = [0, 250, 0, 0, 1_000, 75, 0, 0, 0, 30];
        for p in payouts {
            period.record(&outcome(p), 150);
        }
        assert_eq!(period.total_sales_cents, 1_500);
        assert_eq!(period.total_prizes_cents, 1_355);
        assert_eq!(period.plays_count, 10);
        assert_eq!(period.wins_count, 4);
        assert_eq!(
            period.net_profit_cents(),
            period.total_sales_cents - period.total_prizes_cents
        );
        assert!(!period.goal_reached);
    }

    #[test]
    fn test_goal_reached_recomputed_each_play() {
        let mut period = LedgerPeriod::new(1, day(), 200, 0);
        period.record(&outcome(0), 100);
        assert!(!period.goal_reached);
        period.record(&outcome(0), 100);
        assert!(period.goal_reached);
        period.record(&outcome(150), 100);
        assert!(!period.goal_reached);
    }

    #[test]
    fn test_may_award_expensive_prize() {
        let mut period = LedgerPeriod::new(1, day(), 100, 0);
        period.record(&outcome(0), 10);
        assert_eq!(period.net_profit_cents(), 10);
        assert!(!period.may_award_expensive_prize(70));
        assert!(period.may_award_expensive_prize(50));
        assert_eq!(period.expensive_prize_ceiling(), Some(60));

        period.set_targets(5, 0);
        assert!(period.goal_reached);
        assert!(period.may_award_expensive_prize(1_000_000));
        assert_eq!(period.expensive_prize_ceiling(), None);
    }

    #[test]
    fn test_goal_gate_ceiling_matches_award_rule() {
        for (sales, prizes, goal) in [
            (10, 0, 100),
            (0, 0, 1),
            (300, 450, 1_000),
            (301, 0, 7_777),
            (50, 1_000, 99),
            (i64::MAX / 2, 0, i64::MAX),
        ] {
            let mut period = LedgerPeriod::new(1, day(), goal, 0);
            period.total_sales_cents = sales;
            period.total_prizes_cents = prizes;
            period.plays_count = 1;
            period.set_targets(goal, 0);
            assert!(!period.goal_reached);

            let ceiling = period.expensive_prize_ceiling().unwrap();
            assert!(period.may_award_expensive_prize(ceiling), "{sales}/{prizes}/{goal}");
            assert!(
                !period.may_award_expensive_prize(ceiling + 1),
                "{sales}/{prizes}/{goal}"
            );
        }
    }

    #[test]
    fn test_remaining_budget() {
        let mut period = LedgerPeriod::new(1, day(), 0, 0);
        assert_eq!(period.remaining_budget_cents(), None);
        period.set_targets(0, 1_000);
        period.record(&outcome(400), 100);
        assert_eq!(period.remaining_budget_cents(), Some(600));
    }

    #[test]
    fn test_reset_keeps_targets() {
        let mut period = LedgerPeriod::new(1, day(), 300, 2_000);
        for p in [0, 90, 0, 0] {
            period.record(&outcome(p), 200);
        }
        assert!(period.goal_reached);
        period.reset();
        assert_eq!(period.total_sales_cents, 0);
        assert_eq!(period.total_prizes_cents, 0);
        assert_eq!(period.plays_count, 0);
        assert!(!period.goal_reached);
        assert_eq!(period.profit_goal_cents, 300);
        assert_eq!(period.daily_prize_budget_cents, 2_000);

        period.reset();
        assert_eq!(period.plays_count, 0);
        assert!(!period.goal_reached);
    }

    #[test]
    fn test_book_serializes_same_key() {
        let book = LedgerBook::new();
        let key = (7, day());
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for i in 0..500 {
                        let payout = if i % 5 == 0 { 40 } else { 0 };
                        book.record(key, &outcome(payout), 10);
                    }
                });
            }
        });
        let period = book.snapshot(key).unwrap();
        assert_eq!(period.plays_count, 4_000);
        assert_eq!(period.total_sales_cents, 40_000);
        assert_eq!(period.total_prizes_cents, 8 * 100 * 40);
        assert_eq!(period.wins_count, 800);
    }

    #[test]
    fn test_book_keys_are_independent() {
        let book = LedgerBook::new();
        let a = (1, day());
        let b = (2, day());
        book.record(a, &outcome(0), 100);
        book.record(b, &outcome(30), 50);
        book.record(b, &outcome(0), 50);

        assert_eq!(book.snapshot(a).unwrap().plays_count, 1);
        assert_eq!(book.snapshot(b).unwrap().plays_count, 2);

        let reset = book.reset_period(b).unwrap();
        assert_eq!(reset.plays_count, 0);
        assert_eq!(book.snapshot(a).unwrap().plays_count, 1);
        assert!(book.reset_period((3, day())).is_none());
    }
}
