//! HTTP request handlers

pub mod catalog;
pub mod farm;
pub mod health;
pub mod inventory;
pub mod transaction;

pub use catalog::*;
pub use farm::*;
pub use health::*;
pub use inventory::*;
pub use transaction::*;
