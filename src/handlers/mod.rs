pub mod common;
pub mod sales;
pub mod stocks;

pub use common::{AppJson, InventoryHandlerState};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

impl InventoryHandlerState for AppState {
    fn inventory_service(&self) -> &crate::services::InventoryService {
        &self.inventory_service
    }
}
