use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::Order;

use crate::config::DrawConfig;
use crate::engine::{DrawEngine, DrawResult, EngineResult, LedgerPeriod, Mode};
use crate::entities::{PlayMode, draw_record_entity as records};
use crate::error::{AppError, AppResult};
use crate::models::{
    DrawRecordQuery, DrawRecordResponse, PaginatedResponse, PaginationParams, PlayResponse,
};
use crate::services::{ConfigService, LedgerService, WalletService};

#[derive(Clone)]
pub struct PlayService {
    pool: DatabaseConnection,
    engine: DrawEngine,
    config_service: ConfigService,
    ledger_service: LedgerService,
    wallet_service: WalletService,
}

impl PlayService {
    pub fn new(
        pool: DatabaseConnection,
        config: &DrawConfig,
        config_service: ConfigService,
        ledger_service: LedgerService,
        wallet_service: WalletService,
    ) -> Self {
        Self {
            pool,
            engine: DrawEngine::new(config.settings()),
            config_service,
            ledger_service,
            wallet_service,
        }
    }

    /// Purchase and resolve one play.
    ///
    /// Steps, all inside one transaction:
    /// 1. debit the unit price from the balance of `mode`
    /// 2. draw against the current period and record the outcome into it
    ///    (stored period for real plays, in-process book for demo plays)
    /// 3. credit the payout
    /// 4. append the draw record
    ///
    /// Any error before commit rolls the debit back. A product without
    /// drawable items is refused before anything is debited.
    pub async fn play(&self, user_id: i64, product_id: i64, mode: Mode) -> AppResult<PlayResponse> {
        let snapshot = self.config_service.snapshot(product_id).await?;
        if !snapshot.product.is_active {
            return Err(AppError::NotFound(format!("Product {product_id}")));
        }
        snapshot.ensure_playable()?;
        let unit_price_cents = snapshot.config.unit_price_cents;
        let now = Utc::now();
        let date = self.ledger_service.period_date(now);
        let engine = self.engine;

        let draw = |period: &mut LedgerPeriod| -> EngineResult<DrawResult> {
            let result = engine.draw(
                &snapshot.config,
                &snapshot.pool,
                period,
                &mut rand::rng(),
                now,
            )?;
            period.record(&result.outcome, unit_price_cents);
            Ok(result)
        };

        let txn = self.pool.begin().await?;

        self.wallet_service.ensure_wallet(&txn, user_id).await?;
        self.wallet_service
            .debit(&txn, user_id, mode, unit_price_cents)
            .await?;

        let (result, period): (DrawResult, LedgerPeriod) = match mode {
            Mode::Real => {
                self.ledger_service
                    .record_play(&txn, &snapshot.product, date, draw)
                    .await?
            }
            Mode::Demo => self
                .ledger_service
                .record_demo_play(&snapshot.product, date, draw)?,
        };
        let outcome = result.outcome;

        self.wallet_service
            .credit(&txn, user_id, mode, outcome.payout_cents)
            .await?;
        let balance_after_cents = self.wallet_service.balance(&txn, user_id, mode).await?;

        log::debug!(
            target: "draw",
            "Play {} of product {} ({}) by user {}: payout {}, period net {}",
            outcome.draw_id,
            product_id,
            mode,
            user_id,
            outcome.payout_cents,
            period.net_profit_cents()
        );

        records::ActiveModel {
            draw_id: Set(outcome.draw_id),
            user_id: Set(user_id),
            product_id: Set(product_id),
            mode: Set(PlayMode::from(mode)),
            won: Set(outcome.won),
            item_id: Set(outcome.item_id),
            quantity: Set(outcome.quantity),
            unit_price_cents: Set(unit_price_cents),
            payout_cents: Set(outcome.payout_cents),
            diagnostic: Set(result
                .diagnostic
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?),
            created_at: Set(Some(outcome.timestamp)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        let prize_name = outcome
            .item_id
            .and_then(|id| snapshot.item_name(id))
            .map(str::to_string);
        Ok(PlayResponse {
            outcome,
            prize_name,
            mode,
            unit_price_cents,
            balance_after_cents,
        })
    }

    /// The user's plays, newest first.
    pub async fn list_draws(
        &self,
        user_id: i64,
        query: &DrawRecordQuery,
    ) -> AppResult<PaginatedResponse<DrawRecordResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let base_query = records::Entity::find().filter(records::Column::UserId.eq(user_id));
        let total = base_query.clone().count(&self.pool).await? as i64;

        let rows = base_query
            .order_by(records::Column::CreatedAt, Order::Desc)
            .order_by(records::Column::Id, Order::Desc)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::new(
            rows.into_iter().map(Into::into).collect(),
            params.get_page(),
            params.get_page_size(),
            total,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalletConfig;
    use crate::entities::{product_entity as products, reward_item_entity as items};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn product() -> products::Model {
        products::Model {
            id: 9,
            name: "Raspadinha Sorte".into(),
            category: Some("sorte".into()),
            unit_price_cents: 200,
            win_probability_bp: 2_000,
            target_rtp_bp: 5_500,
            rtp_enabled: true,
            is_active: true,
            daily_profit_goal_cents: 0,
            daily_prize_budget_cents: 0,
            created_at: None,
            updated_at: None,
        }
    }

    fn retired_item() -> items::Model {
        items::Model {
            id: 1,
            product_id: 9,
            name: "Pix R$ 5".into(),
            weight: 4,
            min_quantity: 1,
            max_quantity: 1,
            value_cents: 500,
            is_active: false,
            created_at: None,
            updated_at: None,
        }
    }

    fn service(db: DatabaseConnection) -> PlayService {
        let draw = DrawConfig::default();
        PlayService::new(
            db.clone(),
            &draw,
            ConfigService::new(db.clone(), &draw),
            LedgerService::new(db.clone(), &draw),
            WalletService::new(db, &WalletConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_unplayable_product_is_refused_before_debit() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![product()]])
            .append_query_results([vec![retired_item()]])
            .into_connection();
        let svc = service(db.clone());

        let err = svc.play(42, 9, Mode::Real).await.unwrap_err();
        assert!(matches!(err, AppError::ConfigurationError(_)));

        // product and item reads only, no transaction and no wallet update
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 2);
        assert!(!format!("{log:?}").contains("wallets"));
    }
}
