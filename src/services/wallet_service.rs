use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};

use crate::config::WalletConfig;
use crate::engine::Mode;
use crate::entities::wallet_entity as wallets;
use crate::error::{AppError, AppResult};
use crate::models::WalletResponse;

#[derive(Clone)]
pub struct WalletService {
    pool: DatabaseConnection,
    demo_initial_balance_cents: i64,
}

/// Column holding the balance of a mode.
fn balance_column(mode: Mode) -> wallets::Column {
    match mode {
        Mode::Real => wallets::Column::BalanceCents,
        Mode::Demo => wallets::Column::DemoBalanceCents,
    }
}

impl WalletService {
    pub fn new(pool: DatabaseConnection, config: &WalletConfig) -> Self {
        Self {
            pool,
            demo_initial_balance_cents: config.demo_initial_balance_cents,
        }
    }

    pub async fn get_wallet(&self, user_id: i64) -> AppResult<WalletResponse> {
        let wallet = self.ensure_wallet(&self.pool, user_id).await?;
        Ok(wallet.into())
    }

    /// Refill the demo balance to its initial amount.
    pub async fn reset_demo_balance(&self, user_id: i64) -> AppResult<WalletResponse> {
        self.ensure_wallet(&self.pool, user_id).await?;
        wallets::Entity::update_many()
            .col_expr(
                wallets::Column::DemoBalanceCents,
                Expr::value(self.demo_initial_balance_cents),
            )
            .col_expr(wallets::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(wallets::Column::UserId.eq(user_id))
            .exec(&self.pool)
            .await?;
        log::info!("Demo balance reset for user {user_id}");
        self.get_wallet(user_id).await
    }

    /// Fetch the wallet, creating it on first use. Concurrent first uses
    /// race on the unique user_id index; the loser's insert is a no-op.
    pub async fn ensure_wallet<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
    ) -> Result<wallets::Model, DbErr> {
        if let Some(m) = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(conn)
            .await?
        {
            return Ok(m);
        }

        wallets::Entity::insert(wallets::ActiveModel {
            user_id: Set(user_id),
            balance_cents: Set(0),
            demo_balance_cents: Set(self.demo_initial_balance_cents),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(wallets::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

        wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("wallet of user {user_id}")))
    }

    /// `balance -= amount` only if the balance covers it.
    pub async fn debit<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        mode: Mode,
        amount_cents: i64,
    ) -> AppResult<()> {
        if amount_cents <= 0 {
            return Err(AppError::ValidationError(
                "Debit amount must be positive".into(),
            ));
        }
        let column = balance_column(mode);
        let result = wallets::Entity::update_many()
            .col_expr(column, Expr::col(column).sub(amount_cents))
            .col_expr(wallets::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(wallets::Column::UserId.eq(user_id))
            .filter(column.gte(amount_cents))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::InsufficientBalance);
        }
        Ok(())
    }

    pub async fn credit<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        mode: Mode,
        amount_cents: i64,
    ) -> AppResult<()> {
        if amount_cents == 0 {
            return Ok(());
        }
        if amount_cents < 0 {
            return Err(AppError::ValidationError(
                "Credit amount must not be negative".into(),
            ));
        }
        let column = balance_column(mode);
        let result = wallets::Entity::update_many()
            .col_expr(column, Expr::col(column).add(amount_cents))
            .col_expr(wallets::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(wallets::Column::UserId.eq(user_id))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Wallet of user {user_id}")));
        }
        Ok(())
    }

    pub async fn balance<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        mode: Mode,
    ) -> AppResult<i64> {
        let wallet = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Wallet of user {user_id}")))?;
        Ok(match mode {
            Mode::Real => wallet.balance_cents,
            Mode::Demo => wallet.demo_balance_cents,
        })
    }
}
