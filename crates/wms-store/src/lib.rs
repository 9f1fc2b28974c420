//! # WMS Store
//!
//! 庫存帳與協作者儲存介面

pub mod ledger;
pub mod memory;
pub mod repository;

// Re-export 主要類型
pub use ledger::{InventoryLedger, SyncReport};
pub use memory::InMemoryStore;
pub use repository::{
    DeliveryHistory, OrderRepository, PackingRepository, ReturnRepository, TransferRepository,
    WarehouseRepository, WaveRepository,
};
