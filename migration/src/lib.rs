pub use sea_orm_migration::prelude::*;

mod m20261001_000001_add_products;
mod m20261001_000002_add_ledger_and_wallets;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_add_products::Migration),
            Box::new(m20261001_000002_add_ledger_and_wallets::Migration),
        ]
    }
}
