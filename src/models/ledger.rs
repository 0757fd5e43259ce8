use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::LedgerPeriod;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LedgerQuery {
    /// Business day (YYYY-MM-DD), today when omitted
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LedgerTargetsRequest {
    pub profit_goal_cents: i64,
    pub daily_prize_budget_cents: i64,
}

/// Dashboard view of one product's day
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LedgerPeriodResponse {
    pub product_id: i64,
    pub period_date: NaiveDate,
    pub total_sales_cents: i64,
    pub total_prizes_cents: i64,
    pub net_profit_cents: i64,
    pub plays_count: i64,
    pub wins_count: i64,
    pub profit_goal_cents: i64,
    pub goal_reached: bool,
    pub goal_progress_pct: f64,
    pub daily_prize_budget_cents: i64,
    /// Only present when a budget is configured
    pub remaining_budget_cents: Option<i64>,
    pub profit_margin_pct: f64,
    pub realized_rtp_pct: f64,
    /// Optimistic concurrency counter of the stored row, 0 before the first play
    pub version: i64,
}

impl LedgerPeriodResponse {
    pub fn new(period: &LedgerPeriod, version: i64) -> Self {
        LedgerPeriodResponse {
            product_id: period.product_id,
            period_date: period.period_date,
            total_sales_cents: period.total_sales_cents,
            total_prizes_cents: period.total_prizes_cents,
            net_profit_cents: period.net_profit_cents(),
            plays_count: period.plays_count,
            wins_count: period.wins_count,
            profit_goal_cents: period.profit_goal_cents,
            goal_reached: period.goal_reached,
            goal_progress_pct: period.goal_progress_pct(),
            daily_prize_budget_cents: period.daily_prize_budget_cents,
            remaining_budget_cents: period.remaining_budget_cents(),
            profit_margin_pct: period.profit_margin_pct(),
            realized_rtp_pct: period.realized_rtp_pct(),
            version,
        }
    }
}

/// All products of one business day plus totals
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailySummaryResponse {
    pub date: NaiveDate,
    pub periods: Vec<LedgerPeriodResponse>,
    pub total_sales_cents: i64,
    pub total_prizes_cents: i64,
    pub net_profit_cents: i64,
    pub plays_count: i64,
    pub products_at_goal: usize,
}

impl DailySummaryResponse {
    pub fn new(date: NaiveDate, periods: Vec<LedgerPeriodResponse>) -> Self {
        let total_sales_cents = periods.iter().map(|p| p.total_sales_cents).sum();
        let total_prizes_cents = periods.iter().map(|p| p.total_prizes_cents).sum();
        DailySummaryResponse {
            date,
            total_sales_cents,
            total_prizes_cents,
            net_profit_cents: total_sales_cents - total_prizes_cents,
            plays_count: periods.iter().map(|p| p.plays_count).sum(),
            products_at_goal: periods.iter().filter(|p| p.goal_reached).count(),
            periods,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(product_id: i64, sales: i64, prizes: i64, goal: i64) -> LedgerPeriod {
        let date = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let mut p = LedgerPeriod::new(product_id, date, goal, 0);
        p.total_sales_cents = sales;
        p.total_prizes_cents = prizes;
        p.plays_count = sales / 100;
        p.goal_reached = sales - prizes >= goal;
        p
    }

    #[test]
    fn test_summary_totals() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let summary = DailySummaryResponse::new(
            date,
            vec![
                LedgerPeriodResponse::new(&period(1, 10_000, 4_000, 5_000), 3),
                LedgerPeriodResponse::new(&period(2, 2_000, 2_500, 1_000), 1),
            ],
        );
        assert_eq!(summary.total_sales_cents, 12_000);
        assert_eq!(summary.total_prizes_cents, 6_500);
        assert_eq!(summary.net_profit_cents, 5_500);
        assert_eq!(summary.plays_count, 120);
        assert_eq!(summary.products_at_goal, 1);
    }

    #[test]
    fn test_budget_hidden_without_budget() {
        let resp = LedgerPeriodResponse::new(&period(1, 500, 0, 0), 0);
        assert_eq!(resp.remaining_budget_cents, None);
        assert_eq!(resp.net_profit_cents, 500);
    }
}
