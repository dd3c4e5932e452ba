//! Shared domain types and the inventory confirmation workflow for the
//! poultry farm platform
//!
//! This crate performs no I/O. The backend loads records, hands them to the
//! workflow engine and persists whatever the engine decided.

pub mod error;
pub mod models;
pub mod roles;
pub mod types;
pub mod validation;
pub mod workflow;

pub use error::*;
pub use models::*;
pub use roles::*;
pub use types::*;
pub use validation::*;
pub use workflow::*;
