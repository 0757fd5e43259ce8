pub mod config_service;
pub mod ledger_service;
pub mod play_service;
pub mod wallet_service;

pub use config_service::*;
pub use ledger_service::*;
pub use play_service::*;
pub use wallet_service::*;
