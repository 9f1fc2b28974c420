//! 協作者介面
//!
//! 引擎所讀寫的外部資料（訂單、倉庫主檔、波次、包裝站、調撥、退貨、出貨歷史）
//! 以 trait 注入，所有實作必須可跨執行緒共用。

use chrono::NaiveDate;
use uuid::Uuid;
use wms_core::{
    DeliveryRecord, InventoryTransfer, Order, OrderAssignment, OrderStatus, PackingStation,
    PackingTask, PickingWave, ReturnRequest, Result, RoutingDecision, Warehouse,
};

/// 訂單與派倉結果
pub trait OrderRepository: Send + Sync {
    fn get_order(&self, order_id: &str) -> Result<Order>;

    fn save_order(&self, order: Order);

    fn get_assignment(&self, order_id: &str) -> Option<OrderAssignment>;

    fn save_assignment(&self, assignment: OrderAssignment);

    /// 指定倉庫的派倉結果，依派倉時間排序
    fn assignments_for_warehouse(&self, warehouse_id: &str) -> Vec<OrderAssignment>;

    fn save_decision(&self, decision: RoutingDecision);

    /// 訂單的歷次派倉決策，依派倉時間排序
    fn decisions_for_order(&self, order_id: &str) -> Vec<RoutingDecision>;

    /// 指定倉庫中尚未出貨的訂單數
    fn pending_count(&self, warehouse_id: &str) -> u32 {
        let open = self
            .assignments_for_warehouse(warehouse_id)
            .iter()
            .filter(|a| !matches!(a.status, OrderStatus::Shipped | OrderStatus::Cancelled))
            .count();
        u32::try_from(open).unwrap_or(u32::MAX)
    }
}

/// 倉庫主檔
pub trait WarehouseRepository: Send + Sync {
    fn get_warehouse(&self, warehouse_id: &str) -> Result<Warehouse>;

    fn save_warehouse(&self, warehouse: Warehouse);

    /// 所有倉庫，依ID排序
    fn list_warehouses(&self) -> Vec<Warehouse>;
}

/// 揀貨波次
pub trait WaveRepository: Send + Sync {
    fn get_wave(&self, wave_id: Uuid) -> Result<PickingWave>;

    fn save_wave(&self, wave: PickingWave);

    /// 指定倉庫的波次，依建立時間排序
    fn waves_for_warehouse(&self, warehouse_id: &str) -> Vec<PickingWave>;
}

/// 包裝站與包裝任務
pub trait PackingRepository: Send + Sync {
    fn get_station(&self, station_id: &str) -> Result<PackingStation>;

    fn save_station(&self, station: PackingStation);

    /// 指定倉庫的包裝站，依ID排序
    fn stations_for_warehouse(&self, warehouse_id: &str) -> Vec<PackingStation>;

    /// 原子地取得一個可用包裝站並標記為忙碌；沒有可用站時回傳 None
    fn claim_station(&self, warehouse_id: &str) -> Option<PackingStation>;

    /// 包裝站回到可用狀態
    fn release_station(&self, station_id: &str) -> Result<()>;

    fn get_task(&self, task_id: Uuid) -> Result<PackingTask>;

    fn save_task(&self, task: PackingTask);

    /// 訂單最近一次的包裝任務
    fn task_for_order(&self, order_id: &str) -> Option<PackingTask>;
}

/// 倉間調撥
pub trait TransferRepository: Send + Sync {
    fn get_transfer(&self, transfer_id: Uuid) -> Result<InventoryTransfer>;

    fn save_transfer(&self, transfer: InventoryTransfer);

    /// 所有調撥，依建立時間排序
    fn list_transfers(&self) -> Vec<InventoryTransfer>;
}

/// 退貨
pub trait ReturnRepository: Send + Sync {
    fn get_return(&self, return_id: Uuid) -> Result<ReturnRequest>;

    fn save_return(&self, request: ReturnRequest);

    fn returns_for_order(&self, order_id: &str) -> Vec<ReturnRequest>;
}

/// 出貨歷史（準時率來源）
pub trait DeliveryHistory: Send + Sync {
    fn record_delivery(&self, record: DeliveryRecord);

    /// 指定倉庫自某日（含）起出貨的記錄
    fn deliveries_since(&self, warehouse_id: &str, since: NaiveDate) -> Vec<DeliveryRecord>;
}
