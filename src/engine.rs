//! 履約引擎門面
//!
//! 組合派倉、波次、包裝、比價、調撥與退貨服務，所有協作者皆由外部注入。

use std::sync::Arc;

use uuid::Uuid;
use wms_core::{
    DeliveryRecord, EngineConfig, InventoryTransfer, ItemCondition, Order, OrderStatus,
    PackingTask, PickingWave, Result, ReturnRequest, RoutingDecision, ShipmentSpec, ShippingLabel,
    ShippingRate, WmsError,
};
use wms_store::{
    DeliveryHistory, InMemoryStore, InventoryLedger, OrderRepository, PackingRepository,
    ReturnRepository, SyncReport, TransferRepository, WarehouseRepository, WaveRepository,
};

use crate::packing::PackingOrchestrator;
use crate::router::OrderRouter;
use crate::shipping::{CarrierGateway, RateShopper};
use crate::transfers::TransferManager;
use crate::waves::WaveBatcher;

/// 注入的協作者
#[derive(Clone)]
pub struct Repositories {
    pub orders: Arc<dyn OrderRepository>,
    pub warehouses: Arc<dyn WarehouseRepository>,
    pub waves: Arc<dyn WaveRepository>,
    pub packing: Arc<dyn PackingRepository>,
    pub transfers: Arc<dyn TransferRepository>,
    pub returns: Arc<dyn ReturnRepository>,
    pub history: Arc<dyn DeliveryHistory>,
}

impl Repositories {
    /// 全部由同一個記憶體儲存提供
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            orders: store.clone(),
            warehouses: store.clone(),
            waves: store.clone(),
            packing: store.clone(),
            transfers: store.clone(),
            returns: store.clone(),
            history: store,
        }
    }
}

/// 多倉履約引擎
pub struct FulfillmentEngine {
    config: EngineConfig,
    ledger: Arc<InventoryLedger>,
    repos: Repositories,
    router: OrderRouter,
    batcher: WaveBatcher,
    packing: PackingOrchestrator,
    shopper: RateShopper,
    transfers: TransferManager,
}

impl FulfillmentEngine {
    /// 創建引擎（配置不合法時失敗）
    pub fn new(
        config: EngineConfig,
        ledger: Arc<InventoryLedger>,
        repos: Repositories,
        carriers: Vec<Arc<dyn CarrierGateway>>,
    ) -> Result<Self> {
        config.validate()?;

        let router = OrderRouter::new(
            config.scoring.clone(),
            Arc::clone(&ledger),
            Arc::clone(&repos.orders),
            Arc::clone(&repos.warehouses),
            Arc::clone(&repos.history),
        );
        let batcher = WaveBatcher::new(
            config.waving.clone(),
            Arc::clone(&ledger),
            Arc::clone(&repos.orders),
            Arc::clone(&repos.waves),
        );
        let packing = PackingOrchestrator::new(
            config.packing.clone(),
            Arc::clone(&ledger),
            Arc::clone(&repos.orders),
            Arc::clone(&repos.packing),
        );
        let shopper = RateShopper::new(carriers, config.shipping.carrier_timeout());
        let transfers = TransferManager::new(
            Arc::clone(&ledger),
            Arc::clone(&repos.orders),
            Arc::clone(&repos.transfers),
            Arc::clone(&repos.returns),
        );

        tracing::info!("履約引擎已建立");
        Ok(Self {
            config,
            ledger,
            repos,
            router,
            batcher,
            packing,
            shopper,
            transfers,
        })
    }

    /// 以記憶體儲存建立引擎
    pub fn in_memory(config: EngineConfig, carriers: Vec<Arc<dyn CarrierGateway>>) -> Result<Self> {
        let store = Arc::new(InMemoryStore::new());
        Self::new(
            config,
            Arc::new(InventoryLedger::new()),
            Repositories::in_memory(store),
            carriers,
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    // ---- 派倉 ----

    pub fn route(&self, order: &Order) -> Result<RoutingDecision> {
        self.router.route(order)
    }

    pub fn route_at(&self, order: &Order, routed_at: chrono::DateTime<chrono::Utc>) -> Result<RoutingDecision> {
        self.router.route_at(order, routed_at)
    }

    // ---- 波次 ----

    pub fn build_waves(&self, warehouse_id: &str) -> Result<Vec<PickingWave>> {
        self.batcher.build_waves(warehouse_id)
    }

    pub fn start_wave(&self, wave_id: Uuid, pickers: Vec<String>) -> Result<PickingWave> {
        self.batcher.start_wave(wave_id, pickers)
    }

    pub fn complete_wave(&self, wave_id: Uuid) -> Result<PickingWave> {
        self.batcher.complete_wave(wave_id)
    }

    pub fn cancel_wave(&self, wave_id: Uuid) -> Result<PickingWave> {
        self.batcher.cancel_wave(wave_id)
    }

    // ---- 包裝 ----

    pub fn assign_to_packing(&self, order_id: &str) -> Result<PackingTask> {
        self.packing.assign_to_packing(order_id)
    }

    pub fn start_packing(&self, task_id: Uuid) -> Result<PackingTask> {
        self.packing.start_packing(task_id)
    }

    pub fn complete_packing(&self, task_id: Uuid) -> Result<PackingTask> {
        self.packing.complete_packing(task_id)
    }

    // ---- 出貨 ----

    pub async fn get_rates(&self, shipment: &ShipmentSpec) -> Result<Vec<ShippingRate>> {
        self.shopper.get_rates(shipment).await
    }

    /// 由包裝結果組出貨件資訊（出貨倉 → 收貨地）
    pub fn shipment_for_order(&self, order_id: &str) -> Result<ShipmentSpec> {
        let order = self.repos.orders.get_order(order_id)?;
        let task = self.repos.packing.task_for_order(order_id).ok_or_else(|| {
            WmsError::invalid_transition("訂單", OrderStatus::PendingFulfillment, OrderStatus::Shipped)
        })?;
        let warehouse = self.repos.warehouses.get_warehouse(&task.warehouse_id)?;

        Ok(ShipmentSpec {
            origin: warehouse.location,
            destination: order.destination,
            weight_grams: task.weight_grams,
            dimensions: task.dimensions,
        })
    }

    /// 為訂單詢價
    pub async fn quote_order(&self, order_id: &str) -> Result<Vec<ShippingRate>> {
        let shipment = self.shipment_for_order(order_id)?;
        self.shopper.get_rates(&shipment).await
    }

    /// 購買面單並將已包裝的訂單標記為已出貨
    pub async fn ship_order(&self, order_id: &str, rate: &ShippingRate) -> Result<ShippingLabel> {
        let mut assignment = self
            .repos
            .orders
            .get_assignment(order_id)
            .ok_or_else(|| WmsError::not_found("派倉結果", order_id))?;
        if assignment.status != OrderStatus::Packed {
            return Err(WmsError::invalid_transition(
                "訂單",
                assignment.status,
                OrderStatus::Shipped,
            ));
        }

        let shipment = self.shipment_for_order(order_id)?;
        let label = self.shopper.purchase_label(rate, &shipment).await?;

        assignment.status = OrderStatus::Shipped;
        self.repos.orders.save_assignment(assignment);

        tracing::info!("訂單 {} 已出貨，追蹤號碼 {}", order_id, label.tracking_number);
        Ok(label)
    }

    /// 記錄實際到貨（準時率來源）
    pub fn record_delivery(&self, record: DeliveryRecord) {
        self.repos.history.record_delivery(record);
    }

    // ---- 調撥與退貨 ----

    pub fn create_transfer(
        &self,
        product_id: &str,
        from_warehouse_id: &str,
        to_warehouse_id: &str,
        quantity: i64,
        reason: &str,
    ) -> Result<InventoryTransfer> {
        self.transfers
            .create_transfer(product_id, from_warehouse_id, to_warehouse_id, quantity, reason)
    }

    pub fn process_transfer(&self, transfer_id: Uuid) -> Result<InventoryTransfer> {
        self.transfers.process_transfer(transfer_id)
    }

    pub fn cancel_transfer(&self, transfer_id: Uuid) -> Result<InventoryTransfer> {
        self.transfers.cancel_transfer(transfer_id)
    }

    pub fn rebalance(&self, product_id: &str, to_warehouse_id: &str, quantity: i64) -> Result<InventoryTransfer> {
        self.transfers.rebalance(product_id, to_warehouse_id, quantity)
    }

    pub fn process_return(
        &self,
        order_id: &str,
        product_id: &str,
        quantity: i64,
        condition: ItemCondition,
    ) -> Result<ReturnRequest> {
        self.transfers
            .process_return(order_id, product_id, quantity, condition)
    }

    // ---- 對帳 ----

    /// 庫存對帳
    pub fn sync_inventory(&self) -> SyncReport {
        self.ledger.reconcile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wms_core::ScoringConfig;

    #[test]
    fn test_rejects_invalid_config() {
        let mut scoring = ScoringConfig::default();
        scoring.inventory_weight = 0.9;
        let config = EngineConfig::default().with_scoring(scoring);

        assert!(matches!(
            FulfillmentEngine::in_memory(config, Vec::new()),
            Err(WmsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_shipment_requires_packing() {
        let engine = FulfillmentEngine::in_memory(EngineConfig::default(), Vec::new()).unwrap();
        assert!(matches!(
            engine.shipment_for_order("SO-404"),
            Err(WmsError::NotFound { .. })
        ));
        assert_eq!(engine.sync_inventory(), SyncReport::default());
    }
}
