//! 記憶體內的協作者實作

use chrono::NaiveDate;
use dashmap::DashMap;
use uuid::Uuid;
use wms_core::{
    DeliveryRecord, InventoryTransfer, Order, OrderAssignment, PackingStation, PackingTask,
    PickingWave, ReturnRequest, Result, RoutingDecision, StationStatus, Warehouse, WmsError,
};

use crate::repository::{
    DeliveryHistory, OrderRepository, PackingRepository, ReturnRepository, TransferRepository,
    WarehouseRepository, WaveRepository,
};

/// 記憶體儲存（實作所有協作者介面）
#[derive(Default)]
pub struct InMemoryStore {
    orders: DashMap<String, Order>,
    assignments: DashMap<String, OrderAssignment>,
    decisions: DashMap<String, Vec<RoutingDecision>>,
    warehouses: DashMap<String, Warehouse>,
    waves: DashMap<Uuid, PickingWave>,
    stations: DashMap<String, PackingStation>,
    tasks: DashMap<Uuid, PackingTask>,
    order_tasks: DashMap<String, Uuid>,
    transfers: DashMap<Uuid, InventoryTransfer>,
    returns: DashMap<Uuid, ReturnRequest>,
    deliveries: DashMap<String, Vec<DeliveryRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderRepository for InMemoryStore {
    fn get_order(&self, order_id: &str) -> Result<Order> {
        self.orders
            .get(order_id)
            .map(|o| o.value().clone())
            .ok_or_else(|| WmsError::not_found("訂單", order_id))
    }

    fn save_order(&self, order: Order) {
        self.orders.insert(order.id.clone(), order);
    }

    fn get_assignment(&self, order_id: &str) -> Option<OrderAssignment> {
        self.assignments.get(order_id).map(|a| a.value().clone())
    }

    fn save_assignment(&self, assignment: OrderAssignment) {
        self.assignments.insert(assignment.order_id.clone(), assignment);
    }

    fn assignments_for_warehouse(&self, warehouse_id: &str) -> Vec<OrderAssignment> {
        let mut assignments: Vec<OrderAssignment> = self
            .assignments
            .iter()
            .filter(|a| a.warehouse_id == warehouse_id)
            .map(|a| a.value().clone())
            .collect();
        assignments.sort_by(|a, b| {
            a.routed_at
                .cmp(&b.routed_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        assignments
    }

    fn save_decision(&self, decision: RoutingDecision) {
        let mut history = self.decisions.entry(decision.order_id.clone()).or_default();
        history.push(decision);
        history.sort_by_key(|d| d.routed_at);
    }

    fn decisions_for_order(&self, order_id: &str) -> Vec<RoutingDecision> {
        self.decisions
            .get(order_id)
            .map(|d| d.value().clone())
            .unwrap_or_default()
    }
}

impl WarehouseRepository for InMemoryStore {
    fn get_warehouse(&self, warehouse_id: &str) -> Result<Warehouse> {
        self.warehouses
            .get(warehouse_id)
            .map(|w| w.value().clone())
            .ok_or_else(|| WmsError::not_found("倉庫", warehouse_id))
    }

    fn save_warehouse(&self, warehouse: Warehouse) {
        self.warehouses.insert(warehouse.id.clone(), warehouse);
    }

    fn list_warehouses(&self) -> Vec<Warehouse> {
        let mut warehouses: Vec<Warehouse> = self.warehouses.iter().map(|w| w.value().clone()).collect();
        warehouses.sort_by(|a, b| a.id.cmp(&b.id));
        warehouses
    }
}

impl WaveRepository for InMemoryStore {
    fn get_wave(&self, wave_id: Uuid) -> Result<PickingWave> {
        self.waves
            .get(&wave_id)
            .map(|w| w.value().clone())
            .ok_or_else(|| WmsError::not_found("揀貨波次", wave_id.to_string()))
    }

    fn save_wave(&self, wave: PickingWave) {
        self.waves.insert(wave.id, wave);
    }

    fn waves_for_warehouse(&self, warehouse_id: &str) -> Vec<PickingWave> {
        let mut waves: Vec<PickingWave> = self
            .waves
            .iter()
            .filter(|w| w.warehouse_id == warehouse_id)
            .map(|w| w.value().clone())
            .collect();
        waves.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        waves
    }
}

impl PackingRepository for InMemoryStore {
    fn get_station(&self, station_id: &str) -> Result<PackingStation> {
        self.stations
            .get(station_id)
            .map(|s| s.value().clone())
            .ok_or_else(|| WmsError::not_found("包裝站", station_id))
    }

    fn save_station(&self, station: PackingStation) {
        self.stations.insert(station.id.clone(), station);
    }

    fn stations_for_warehouse(&self, warehouse_id: &str) -> Vec<PackingStation> {
        let mut stations: Vec<PackingStation> = self
            .stations
            .iter()
            .filter(|s| s.warehouse_id == warehouse_id)
            .map(|s| s.value().clone())
            .collect();
        stations.sort_by(|a, b| a.id.cmp(&b.id));
        stations
    }

    fn claim_station(&self, warehouse_id: &str) -> Option<PackingStation> {
        for candidate in self.stations_for_warehouse(warehouse_id) {
            // 寫鎖內檢查並標記，兩個請求不會拿到同一站
            if let Some(mut station) = self.stations.get_mut(&candidate.id) {
                if station.is_available() {
                    station.status = StationStatus::Busy;
                    return Some(station.value().clone());
                }
            }
        }
        None
    }

    fn release_station(&self, station_id: &str) -> Result<()> {
        let mut station = self
            .stations
            .get_mut(station_id)
            .ok_or_else(|| WmsError::not_found("包裝站", station_id))?;
        if station.status == StationStatus::Busy {
            station.status = StationStatus::Available;
        }
        Ok(())
    }

    fn get_task(&self, task_id: Uuid) -> Result<PackingTask> {
        self.tasks
            .get(&task_id)
            .map(|t| t.value().clone())
            .ok_or_else(|| WmsError::not_found("包裝任務", task_id.to_string()))
    }

    fn save_task(&self, task: PackingTask) {
        self.order_tasks.insert(task.order_id.clone(), task.id);
        self.tasks.insert(task.id, task);
    }

    fn task_for_order(&self, order_id: &str) -> Option<PackingTask> {
        let task_id = self.order_tasks.get(order_id).map(|id| *id)?;
        self.tasks.get(&task_id).map(|t| t.value().clone())
    }
}

impl TransferRepository for InMemoryStore {
    fn get_transfer(&self, transfer_id: Uuid) -> Result<InventoryTransfer> {
        self.transfers
            .get(&transfer_id)
            .map(|t| t.value().clone())
            .ok_or_else(|| WmsError::not_found("調撥單", transfer_id.to_string()))
    }

    fn save_transfer(&self, transfer: InventoryTransfer) {
        self.transfers.insert(transfer.id, transfer);
    }

    fn list_transfers(&self) -> Vec<InventoryTransfer> {
        let mut transfers: Vec<InventoryTransfer> = self.transfers.iter().map(|t| t.value().clone()).collect();
        transfers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        transfers
    }
}

impl ReturnRepository for InMemoryStore {
    fn get_return(&self, return_id: Uuid) -> Result<ReturnRequest> {
        self.returns
            .get(&return_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| WmsError::not_found("退貨單", return_id.to_string()))
    }

    fn save_return(&self, request: ReturnRequest) {
        self.returns.insert(request.id, request);
    }

    fn returns_for_order(&self, order_id: &str) -> Vec<ReturnRequest> {
        let mut returns: Vec<ReturnRequest> = self
            .returns
            .iter()
            .filter(|r| r.order_id == order_id)
            .map(|r| r.value().clone())
            .collect();
        returns.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        returns
    }
}

impl DeliveryHistory for InMemoryStore {
    fn record_delivery(&self, record: DeliveryRecord) {
        self.deliveries
            .entry(record.warehouse_id.clone())
            .or_default()
            .push(record);
    }

    fn deliveries_since(&self, warehouse_id: &str, since: NaiveDate) -> Vec<DeliveryRecord> {
        self.deliveries
            .get(warehouse_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.shipped_on >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use std::thread;
    use wms_core::{OrderStatus, Priority};

    fn assignment(order_id: &str, warehouse_id: &str, status: OrderStatus, minute: i64) -> OrderAssignment {
        OrderAssignment {
            order_id: order_id.to_string(),
            warehouse_id: warehouse_id.to_string(),
            decision_id: Uuid::new_v4(),
            priority: Priority::Normal,
            routed_at: Utc::now() + Duration::minutes(minute),
            status,
            reserved: Vec::new(),
            shortages: Vec::new(),
            wave_id: None,
        }
    }

    #[test]
    fn test_pending_count_ignores_closed_orders() {
        let store = InMemoryStore::new();
        store.save_assignment(assignment("SO-1", "WH-A", OrderStatus::PendingFulfillment, 0));
        store.save_assignment(assignment("SO-2", "WH-A", OrderStatus::Picking, 1));
        store.save_assignment(assignment("SO-3", "WH-A", OrderStatus::Shipped, 2));
        store.save_assignment(assignment("SO-4", "WH-B", OrderStatus::PendingFulfillment, 3));

        assert_eq!(store.pending_count("WH-A"), 2);
        assert_eq!(store.pending_count("WH-C"), 0);

        let ids: Vec<_> = store
            .assignments_for_warehouse("WH-A")
            .into_iter()
            .map(|a| a.order_id)
            .collect();
        assert_eq!(ids, vec!["SO-1", "SO-2", "SO-3"]);
    }

    #[test]
    fn test_missing_entities_are_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(store.get_order("SO-404"), Err(WmsError::NotFound { .. })));
        assert!(matches!(store.get_warehouse("WH-404"), Err(WmsError::NotFound { .. })));
        assert!(matches!(store.get_wave(Uuid::new_v4()), Err(WmsError::NotFound { .. })));
        assert!(store.task_for_order("SO-404").is_none());
    }

    #[test]
    fn test_claim_station_is_exclusive() {
        let store = Arc::new(InMemoryStore::new());
        store.save_station(PackingStation::new("PS-1", "WH-A"));
        store.save_station(PackingStation::new("PS-2", "WH-A"));
        let mut offline = PackingStation::new("PS-3", "WH-A");
        offline.status = StationStatus::Offline;
        store.save_station(offline);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.claim_station("WH-A").map(|s| s.id))
            })
            .collect();
        let mut claimed: Vec<String> = handles
            .into_iter()
            .filter_map(|h| h.join().ok().flatten())
            .collect();
        claimed.sort();

        assert_eq!(claimed, vec!["PS-1".to_string(), "PS-2".to_string()]);
        assert!(store.claim_station("WH-A").is_none());

        store.release_station("PS-2").unwrap();
        assert_eq!(store.claim_station("WH-A").map(|s| s.id), Some("PS-2".to_string()));
    }

    #[test]
    fn test_deliveries_since() {
        let store = InMemoryStore::new();
        let day = |d: u32| NaiveDate::from_ymd_opt(2025, 11, d).unwrap();
        for d in [1, 10, 20] {
            store.record_delivery(DeliveryRecord {
                order_id: format!("SO-{}", d),
                warehouse_id: "WH-A".to_string(),
                shipped_on: day(d),
                estimated_delivery_date: day(d + 2),
                delivered_on: day(d + 1),
            });
        }

        assert_eq!(store.deliveries_since("WH-A", day(10)).len(), 2);
        assert!(store.deliveries_since("WH-B", day(1)).is_empty());
    }
}
