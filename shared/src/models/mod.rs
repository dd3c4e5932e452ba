//! Domain models for the poultry farm inventory

mod catalog;
mod house;
mod ledger;
mod transaction;
mod user;

pub use catalog::*;
pub use house::*;
pub use ledger::*;
pub use transaction::*;
pub use user::*;
