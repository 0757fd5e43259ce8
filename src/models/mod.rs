pub mod common;
pub mod ledger;
pub mod pagination;
pub mod play;
pub mod product;
pub mod simulation;
pub mod wallet;

pub use common::*;
pub use ledger::*;
pub use pagination::*;
pub use play::*;
pub use product::*;
pub use simulation::*;
pub use wallet::*;
