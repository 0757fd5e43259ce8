pub mod config_changes;
pub mod draw_records;
pub mod ledger_periods;
pub mod products;
pub mod reward_items;
pub mod wallets;

pub use config_changes as config_change_entity;
pub use draw_records as draw_record_entity;
pub use draw_records::PlayMode;
pub use ledger_periods as ledger_period_entity;
pub use products as product_entity;
pub use reward_items as reward_item_entity;
pub use wallets as wallet_entity;
