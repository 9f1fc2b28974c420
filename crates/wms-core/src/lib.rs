//! # WMS Core
//!
//! 多倉履約引擎的核心資料模型與類型定義

pub mod config;
pub mod geo;
pub mod inventory;
pub mod money;
pub mod order;
pub mod packing;
pub mod returns;
pub mod routing;
pub mod shipping;
pub mod transfer;
pub mod warehouse;
pub mod wave;

// Re-export 主要類型
pub use config::{EngineConfig, PackingConfig, ScoringConfig, ShippingConfig, WavingConfig};
pub use geo::GeoPoint;
pub use inventory::{ensure_positive, BinLocation, InventoryKey, InventoryRecord};
pub use money::Money;
pub use order::{Order, OrderAssignment, OrderItem, OrderStatus, Priority, ReservedLine};
pub use packing::{Dimensions, PackingStation, PackingTask, PackingTaskStatus, PackItem, PackagingType, StationStatus};
pub use returns::{ItemCondition, ReturnRequest};
pub use routing::{CandidateScore, DeliveryRecord, RoutingDecision, ScoreBreakdown};
pub use shipping::{ServiceLevel, ShipmentSpec, ShippingLabel, ShippingRate};
pub use transfer::{InventoryTransfer, TransferStatus};
pub use warehouse::{Warehouse, Zone, ZoneType};
pub use wave::{PickListLine, PickingWave, WaveStatus};

/// 履約引擎錯誤類型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WmsError {
    #[error("找不到{entity}: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("庫存不足：物料 {product_id} 於倉庫 {warehouse_id}，需要 {requested}，可用 {available}")]
    InsufficientStock {
        product_id: String,
        warehouse_id: String,
        requested: i64,
        available: i64,
    },

    #[error("倉庫 {0} 沒有可用的包裝站")]
    NoStationAvailable(String),

    #[error("{entity} 無法從 {from} 轉換到 {to}")]
    InvalidStateTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("外部依賴失敗: {0}")]
    ExternalDependencyFailure(String),

    #[error("無效的輸入: {0}")]
    InvalidInput(String),

    #[error("無效的配置: {0}")]
    InvalidConfig(String),
}

impl WmsError {
    /// 建立 NotFound 錯誤
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// 建立狀態轉換錯誤
    pub fn invalid_transition(
        entity: &'static str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidStateTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// 預期內、由呼叫端處理的狀況（改派、排隊或交由人員處理），不視為系統故障
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientStock { .. } | Self::NoStationAvailable(_)
        )
    }

    /// 呼叫端應以退避重試
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExternalDependencyFailure(_))
    }
}

pub type Result<T> = std::result::Result<T, WmsError>;
