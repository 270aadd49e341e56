// Stock and revenue operations
pub mod inventory;

// Per-item serialization of mutations
pub mod locks;

// Typed request inputs
pub mod validation;

pub use inventory::{InventoryService, SaleCommand, SaleReceipt, StockReceipt};
