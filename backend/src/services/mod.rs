//! Business logic services for the poultry farm platform

pub mod catalog;
pub mod farm;
pub mod inventory;
pub mod ledger;
pub mod workflow;

pub use catalog::CatalogService;
pub use farm::FarmService;
pub use inventory::InventoryService;
pub use ledger::LedgerStore;
pub use workflow::WorkflowService;
