pub mod admin;
pub mod ledger;
pub mod product;
pub mod wallet;

pub use admin::admin_config;
pub use product::product_config;
pub use wallet::wallet_config;
