use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

use crate::config::DrawConfig;
use crate::engine::{EngineError, EngineResult, LedgerBook, LedgerPeriod};
use crate::entities::{ledger_period_entity as ledger, product_entity as products};
use crate::error::{AppError, AppResult};
use crate::models::{DailySummaryResponse, LedgerPeriodResponse};

/// Persisted daily ledgers plus the in-process book used by demo plays.
///
/// Every write to a stored period goes through [`LedgerService::mutate_period`]:
/// read the row, apply the change to a `LedgerPeriod`, then write it back
/// only if `version` is still the one that was read.
#[derive(Clone)]
pub struct LedgerService {
    pool: DatabaseConnection,
    book: LedgerBook,
    max_retries: u32,
    business_offset: FixedOffset,
}

impl LedgerService {
    pub fn new(pool: DatabaseConnection, config: &DrawConfig) -> Self {
        let business_offset = FixedOffset::east_opt(config.period_utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix());
        Self {
            pool,
            book: LedgerBook::new(),
            max_retries: config.ledger_max_retries.max(1),
            business_offset,
        }
    }

    /// Business day `at` falls on.
    pub fn period_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.business_offset).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.period_date(Utc::now())
    }

    /// Draw and record one real-money play.
    ///
    /// `draw` sees the period as stored before this play. When another play
    /// commits first, the row is re-read and `draw` runs again against the
    /// fresh totals, so the ceiling check never uses stale numbers.
    pub async fn record_play<C, T, F>(
        &self,
        conn: &C,
        product: &products::Model,
        date: NaiveDate,
        mut draw: F,
    ) -> AppResult<(T, LedgerPeriod)>
    where
        C: ConnectionTrait,
        F: FnMut(&mut LedgerPeriod) -> EngineResult<T>,
    {
        let (value, row) = self.mutate_period(conn, product, date, &mut draw).await?;
        Ok((value, row.to_period()))
    }

    /// Draw and record one demo play against the in-process book. The
    /// per-period lock is held across the draw and the record.
    pub fn record_demo_play<T, F>(
        &self,
        product: &products::Model,
        date: NaiveDate,
        draw: F,
    ) -> AppResult<(T, LedgerPeriod)>
    where
        F: FnOnce(&mut LedgerPeriod) -> EngineResult<T>,
    {
        let result = self.book.with_period(
            (product.id, date),
            || {
                LedgerPeriod::new(
                    product.id,
                    date,
                    product.daily_profit_goal_cents,
                    product.daily_prize_budget_cents,
                )
            },
            |period| draw(period).map(|value| (value, period.clone())),
        )?;
        Ok(result)
    }

    pub async fn get_period(
        &self,
        product_id: i64,
        date: Option<NaiveDate>,
    ) -> AppResult<LedgerPeriodResponse> {
        let product = self.find_product(product_id).await?;
        let date = date.unwrap_or_else(|| self.today());
        let (period, version) = self.current_period(&product, date).await?;
        Ok(LedgerPeriodResponse::new(&period, version))
    }

    /// Stored state of a period without creating it; a day without plays
    /// reads as an empty period seeded with the product defaults.
    pub async fn current_period(
        &self,
        product: &products::Model,
        date: NaiveDate,
    ) -> AppResult<(LedgerPeriod, i64)> {
        let row = ledger::Entity::find()
            .filter(ledger::Column::ProductId.eq(product.id))
            .filter(ledger::Column::PeriodDate.eq(date))
            .one(&self.pool)
            .await?;
        Ok(match row {
            Some(row) => (row.to_period(), row.version),
            None => (empty_period(product, date), 0),
        })
    }

    pub async fn daily_summary(&self, date: Option<NaiveDate>) -> AppResult<DailySummaryResponse> {
        let date = date.unwrap_or_else(|| self.today());
        let product_list = products::Entity::find()
            .order_by_asc(products::Column::Id)
            .all(&self.pool)
            .await?;
        let rows = ledger::Entity::find()
            .filter(ledger::Column::PeriodDate.eq(date))
            .all(&self.pool)
            .await?;

        let periods = product_list
            .iter()
            .map(|product| {
                match rows.iter().find(|r| r.product_id == product.id) {
                    Some(row) => LedgerPeriodResponse::new(&row.to_period(), row.version),
                    None => LedgerPeriodResponse::new(&empty_period(product, date), 0),
                }
            })
            .collect();

        Ok(DailySummaryResponse::new(date, periods))
    }

    /// Zero the period's totals, keeping goal and budget. Resetting an
    /// already empty period changes nothing but the version.
    pub async fn reset_period(
        &self,
        product_id: i64,
        date: Option<NaiveDate>,
    ) -> AppResult<LedgerPeriodResponse> {
        let product = self.find_product(product_id).await?;
        let date = date.unwrap_or_else(|| self.today());
        let ((), row) = self
            .mutate_period(&self.pool, &product, date, &mut |period: &mut LedgerPeriod| {
                period.reset();
                Ok(())
            })
            .await?;
        self.book.reset_period((product_id, date));

        log::info!(
            target: "ledger",
            "Ledger reset for product {} on {}",
            product_id,
            date
        );
        Ok(LedgerPeriodResponse::new(&row.to_period(), row.version))
    }

    pub async fn set_targets(
        &self,
        product_id: i64,
        date: Option<NaiveDate>,
        profit_goal_cents: i64,
        daily_prize_budget_cents: i64,
    ) -> AppResult<LedgerPeriodResponse> {
        if profit_goal_cents < 0 || daily_prize_budget_cents < 0 {
            return Err(AppError::ValidationError(
                "Profit goal and prize budget must not be negative".into(),
            ));
        }
        let product = self.find_product(product_id).await?;
        let date = date.unwrap_or_else(|| self.today());
        let ((), row) = self
            .mutate_period(&self.pool, &product, date, &mut |period: &mut LedgerPeriod| {
                period.set_targets(profit_goal_cents, daily_prize_budget_cents);
                Ok(())
            })
            .await?;
        Ok(LedgerPeriodResponse::new(&row.to_period(), row.version))
    }

    /// Insert the period if it does not exist yet, then return it.
    pub async fn ensure_period<C: ConnectionTrait>(
        &self,
        conn: &C,
        product: &products::Model,
        date: NaiveDate,
    ) -> Result<ledger::Model, DbErr> {
        if let Some(row) = find_period(conn, product.id, date).await? {
            return Ok(row);
        }

        ledger::Entity::insert(ledger::ActiveModel {
            product_id: Set(product.id),
            period_date: Set(date),
            total_sales_cents: Set(0),
            total_prizes_cents: Set(0),
            plays_count: Set(0),
            wins_count: Set(0),
            profit_goal_cents: Set(product.daily_profit_goal_cents),
            daily_prize_budget_cents: Set(product.daily_prize_budget_cents),
            goal_reached: Set(false),
            version: Set(0),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([ledger::Column::ProductId, ledger::Column::PeriodDate])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

        find_period(conn, product.id, date).await?.ok_or_else(|| {
            DbErr::RecordNotFound(format!("ledger period {} / {}", product.id, date))
        })
    }

    /// Read-modify-write of one stored period with a version check,
    /// retried up to `max_retries` times.
    async fn mutate_period<C, T, F>(
        &self,
        conn: &C,
        product: &products::Model,
        date: NaiveDate,
        change: &mut F,
    ) -> AppResult<(T, ledger::Model)>
    where
        C: ConnectionTrait,
        F: FnMut(&mut LedgerPeriod) -> EngineResult<T>,
    {
        for attempt in 1..=self.max_retries {
            let row = self.ensure_period(conn, product, date).await?;
            let mut period = row.to_period();
            let value = change(&mut period)?;

            if let Some(saved) = write_if_unchanged(conn, &row, &period).await? {
                return Ok((value, saved));
            }
            log::warn!(
                target: "ledger",
                "Version conflict on product {} {} (attempt {}/{})",
                product.id,
                date,
                attempt,
                self.max_retries
            );
        }

        Err(EngineError::Concurrency {
            attempts: self.max_retries,
        }
        .into())
    }

    async fn find_product(&self, product_id: i64) -> AppResult<products::Model> {
        products::Entity::find_by_id(product_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {product_id}")))
    }
}

fn empty_period(product: &products::Model, date: NaiveDate) -> LedgerPeriod {
    LedgerPeriod::new(
        product.id,
        date,
        product.daily_profit_goal_cents,
        product.daily_prize_budget_cents,
    )
}

async fn find_period<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    date: NaiveDate,
) -> Result<Option<ledger::Model>, DbErr> {
    ledger::Entity::find()
        .filter(ledger::Column::ProductId.eq(product_id))
        .filter(ledger::Column::PeriodDate.eq(date))
        .one(conn)
        .await
}

/// `UPDATE ... WHERE id = ? AND version = ?`; `None` when someone else
/// wrote the row since it was read.
async fn write_if_unchanged<C: ConnectionTrait>(
    conn: &C,
    row: &ledger::Model,
    period: &LedgerPeriod,
) -> Result<Option<ledger::Model>, DbErr> {
    let now = Utc::now();
    let result = ledger::Entity::update_many()
        .col_expr(
            ledger::Column::TotalSalesCents,
            Expr::value(period.total_sales_cents),
        )
        .col_expr(
            ledger::Column::TotalPrizesCents,
            Expr::value(period.total_prizes_cents),
        )
        .col_expr(ledger::Column::PlaysCount, Expr::value(period.plays_count))
        .col_expr(ledger::Column::WinsCount, Expr::value(period.wins_count))
        .col_expr(
            ledger::Column::ProfitGoalCents,
            Expr::value(period.profit_goal_cents),
        )
        .col_expr(
            ledger::Column::DailyPrizeBudgetCents,
            Expr::value(period.daily_prize_budget_cents),
        )
        .col_expr(ledger::Column::GoalReached, Expr::value(period.goal_reached))
        .col_expr(
            ledger::Column::Version,
            Expr::col(ledger::Column::Version).add(1),
        )
        .col_expr(ledger::Column::UpdatedAt, Expr::value(now))
        .filter(ledger::Column::Id.eq(row.id))
        .filter(ledger::Column::Version.eq(row.version))
        .exec(conn)
        .await?;

    if result.rows_affected != 1 {
        return Ok(None);
    }

    Ok(Some(ledger::Model {
        total_sales_cents: period.total_sales_cents,
        total_prizes_cents: period.total_prizes_cents,
        plays_count: period.plays_count,
        wins_count: period.wins_count,
        profit_goal_cents: period.profit_goal_cents,
        daily_prize_budget_cents: period.daily_prize_budget_cents,
        goal_reached: period.goal_reached,
        version: row.version + 1,
        updated_at: Some(now),
        ..row.clone()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn service(offset_minutes: i32) -> LedgerService {
        let config = DrawConfig {
            period_utc_offset_minutes: offset_minutes,
            ..DrawConfig::default()
        };
        LedgerService::new(DatabaseConnection::Disconnected, &config)
    }

    #[test]
    fn test_period_date_follows_business_offset() {
        // 01:30 UTC is still the previous day three hours west of UTC
        let at = Utc.with_ymd_and_hms(2026, 10, 2, 1, 30, 0).unwrap();
        assert_eq!(
            service(-180).period_date(at),
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()
        );
        assert_eq!(
            service(0).period_date(at),
            NaiveDate::from_ymd_opt(2026, 10, 2).unwrap()
        );
    }

    fn product() -> products::Model {
        products::Model {
            id: 7,
            name: "Raspadinha Pix".into(),
            category: Some("pix".into()),
            unit_price_cents: 100,
            win_probability_bp: 1_500,
            target_rtp_bp: 4_500,
            rtp_enabled: true,
            is_active: true,
            daily_profit_goal_cents: 1_000,
            daily_prize_budget_cents: 0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_demo_plays_share_one_period_per_day() {
        let svc = service(0);
        let day = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let product = product();

        for payout in [0, 250, 0] {
            svc.record_demo_play(&product, day, |period| {
                let at = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
                let mut outcome = crate::engine::DrawOutcome::loss(at);
                if payout > 0 {
                    outcome.won = true;
                    outcome.item_id = Some(1);
                    outcome.quantity = 1;
                    outcome.payout_cents = payout;
                }
                period.record(&outcome, product.unit_price_cents);
                Ok(())
            })
            .unwrap();
        }

        let period = svc.book.snapshot((product.id, day)).unwrap();
        assert_eq!(period.plays_count, 3);
        assert_eq!(period.wins_count, 1);
        assert_eq!(period.total_sales_cents, 300);
        assert_eq!(period.total_prizes_cents, 250);
        assert_eq!(period.profit_goal_cents, 1_000);
        assert!(!period.goal_reached);
    }

    #[test]
    fn test_demo_draw_error_leaves_period_untouched() {
        let svc = service(0);
        let day = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let product = product();

        let err = svc
            .record_demo_play(&product, day, |_period| -> EngineResult<()> {
                Err(EngineError::Configuration {
                    product_id: 7,
                    reason: "no drawable items".into(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, AppError::ConfigurationError(_)));

        let period = svc.book.snapshot((product.id, day)).unwrap();
        assert_eq!(period.plays_count, 0);
    }

    #[tokio::test]
    async fn test_concurrent_demo_plays_are_not_lost() {
        let svc = service(0);
        let day = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let product = product();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let svc = svc.clone();
                let product = product.clone();
                tokio::task::spawn_blocking(move || {
                    for _ in 0..50 {
                        svc.record_demo_play(&product, day, |period| {
                            let outcome = crate::engine::DrawOutcome::loss(Utc::now());
                            period.record(&outcome, product.unit_price_cents);
                            Ok(())
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.await.unwrap();
        }

        let period = svc.book.snapshot((product.id, day)).unwrap();
        assert_eq!(period.plays_count, 200);
        assert_eq!(period.total_sales_cents, 20_000);
    }

    fn stored(version: i64, plays: i64) -> ledger::Model {
        ledger::Model {
            id: 11,
            product_id: 7,
            period_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            total_sales_cents: plays * 100,
            total_prizes_cents: 0,
            plays_count: plays,
            wins_count: 0,
            profit_goal_cents: 1_000,
            daily_prize_budget_cents: 0,
            goal_reached: false,
            version,
            created_at: None,
            updated_at: None,
        }
    }

    fn affected(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn losing_play(period: &mut LedgerPeriod) -> EngineResult<()> {
        let outcome = crate::engine::DrawOutcome::loss(Utc::now());
        period.record(&outcome, 100);
        Ok(())
    }

    #[tokio::test]
    async fn test_version_conflict_redraws_on_fresh_row() {
        // another play bumped the row between our read and our write
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stored(0, 0)]])
            .append_query_results([vec![stored(1, 1)]])
            .append_exec_results([affected(0), affected(1)])
            .into_connection();
        let svc = service(0);
        let day = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();

        let mut draws = 0;
        let ((), period) = svc
            .record_play(&db, &product(), day, |period: &mut LedgerPeriod| {
                draws += 1;
                losing_play(period)
            })
            .await
            .unwrap();

        assert_eq!(draws, 2);
        assert_eq!(period.plays_count, 2);
        assert_eq!(period.total_sales_cents, 200);
    }

    #[tokio::test]
    async fn test_conflicts_past_retry_limit_surface_as_concurrency_error() {
        let config = DrawConfig {
            ledger_max_retries: 3,
            ..DrawConfig::default()
        };
        let svc = LedgerService::new(DatabaseConnection::Disconnected, &config);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stored(0, 0)], vec![stored(1, 1)], vec![stored(2, 2)]])
            .append_exec_results([affected(0), affected(0), affected(0)])
            .into_connection();
        let day = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();

        let err = svc
            .record_play(&db, &product(), day, losing_play)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ConcurrencyError(_)));
        // three reads and three rejected writes, nothing more
        assert_eq!(db.into_transaction_log().len(), 6);
    }
}
