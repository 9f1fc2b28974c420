//! # WMS
//!
//! 多倉履約引擎：派倉、波次揀貨、包裝、運費比價、倉間調撥與退貨

pub mod engine;
pub mod packing;
pub mod router;
pub mod shipping;
pub mod telemetry;
pub mod transfers;
pub mod waves;

// Re-export 主要類型
pub use engine::{FulfillmentEngine, Repositories};
pub use packing::PackingOrchestrator;
pub use router::OrderRouter;
pub use shipping::{CarrierGateway, RateShopper, TariffCarrier};
pub use transfers::TransferManager;
pub use waves::WaveBatcher;

pub use wms_calc::CarrierTariff;
pub use wms_core::{Result, WmsError};
pub use wms_store::{InMemoryStore, InventoryLedger, SyncReport};
