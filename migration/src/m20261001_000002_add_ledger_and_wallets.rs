use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum LedgerPeriods {
    Table,
    Id,
    ProductId,
    PeriodDate,
    TotalSalesCents,
    TotalPrizesCents,
    PlaysCount,
    WinsCount,
    ProfitGoalCents,
    DailyPrizeBudgetCents,
    GoalReached,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Wallets {
    Table,
    Id,
    UserId,
    BalanceCents,
    DemoBalanceCents,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DrawRecords {
    Table,
    Id,
    DrawId,
    UserId,
    ProductId,
    Mode,
    Won,
    ItemId,
    Quantity,
    UnitPriceCents,
    PayoutCents,
    Diagnostic,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ConfigChanges {
    Table,
    Id,
    ProductId,
    ActorId,
    Action,
    Before,
    After,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("play_mode"))
                    .values(vec![Alias::new("real"), Alias::new("demo")])
                    .to_owned(),
            )
            .await?;

        // one row per (product, business day)
        manager
            .create_table(
                Table::create()
                    .table(LedgerPeriods::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerPeriods::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LedgerPeriods::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerPeriods::PeriodDate).date().not_null())
                    .col(
                        ColumnDef::new(LedgerPeriods::TotalSalesCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LedgerPeriods::TotalPrizesCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LedgerPeriods::PlaysCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LedgerPeriods::WinsCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LedgerPeriods::ProfitGoalCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LedgerPeriods::DailyPrizeBudgetCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LedgerPeriods::GoalReached)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LedgerPeriods::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LedgerPeriods::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(LedgerPeriods::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_ledger_periods_product_date")
                    .table(LedgerPeriods::Table)
                    .col(LedgerPeriods::ProductId)
                    .col(LedgerPeriods::PeriodDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Wallets::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Wallets::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Wallets::BalanceCents)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Wallets::BalanceCents).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Wallets::DemoBalanceCents)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Wallets::DemoBalanceCents).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Wallets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Wallets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_wallets_user_id")
                    .table(Wallets::Table)
                    .col(Wallets::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DrawRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DrawRecords::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DrawRecords::DrawId).uuid().not_null())
                    .col(ColumnDef::new(DrawRecords::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(DrawRecords::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DrawRecords::Mode)
                            .custom(Alias::new("play_mode"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(DrawRecords::Won).boolean().not_null())
                    .col(ColumnDef::new(DrawRecords::ItemId).big_integer().null())
                    .col(
                        ColumnDef::new(DrawRecords::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DrawRecords::UnitPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DrawRecords::PayoutCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(DrawRecords::Diagnostic).json_binary().null())
                    .col(
                        ColumnDef::new(DrawRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_draw_records_draw_id")
                    .table(DrawRecords::Table)
                    .col(DrawRecords::DrawId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_draw_records_user_created")
                    .table(DrawRecords::Table)
                    .col(DrawRecords::UserId)
                    .col(DrawRecords::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ConfigChanges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConfigChanges::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ConfigChanges::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConfigChanges::ActorId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ConfigChanges::Action).string_len(64).not_null())
                    .col(ColumnDef::new(ConfigChanges::Before).json_binary().null())
                    .col(ColumnDef::new(ConfigChanges::After).json_binary().null())
                    .col(
                        ColumnDef::new(ConfigChanges::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ConfigChanges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DrawRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Wallets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerPeriods::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("play_mode")).to_owned())
            .await?;
        Ok(())
    }
}
