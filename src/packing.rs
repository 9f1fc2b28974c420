//! 包裝作業
//!
//! 只接受揀貨完成的訂單；保留庫存已在揀貨完成時扣帳。

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use wms_calc::{PackagingCalculator, WeighedLine};
use wms_core::{
    OrderStatus, PackItem, PackingConfig, PackingTask, PackingTaskStatus, Result, WmsError,
};
use wms_store::{InventoryLedger, OrderRepository, PackingRepository};

/// 包裝服務
pub struct PackingOrchestrator {
    config: PackingConfig,
    ledger: Arc<InventoryLedger>,
    orders: Arc<dyn OrderRepository>,
    packing: Arc<dyn PackingRepository>,
}

impl PackingOrchestrator {
    pub fn new(
        config: PackingConfig,
        ledger: Arc<InventoryLedger>,
        orders: Arc<dyn OrderRepository>,
        packing: Arc<dyn PackingRepository>,
    ) -> Self {
        Self {
            config,
            ledger,
            orders,
            packing,
        }
    }

    /// 為揀貨完成的訂單建立包裝任務並指派包裝站
    pub fn assign_to_packing(&self, order_id: &str) -> Result<PackingTask> {
        let order = self.orders.get_order(order_id)?;
        let assignment = self.orders.get_assignment(order_id).ok_or_else(|| {
            WmsError::invalid_transition("訂單", OrderStatus::PendingRouting, OrderStatus::Packing)
        })?;

        if assignment.status != OrderStatus::Picked {
            return Err(WmsError::invalid_transition(
                "訂單",
                assignment.status,
                OrderStatus::Packing,
            ));
        }
        if let Some(open) = self.packing.task_for_order(order_id).filter(|t| t.is_open()) {
            return Err(WmsError::invalid_transition(
                "包裝任務",
                open.status,
                PackingTaskStatus::Pending,
            ));
        }
        if assignment.reserved.is_empty() {
            return Err(WmsError::InvalidInput(format!("訂單 {} 沒有可包裝的明細", order_id)));
        }

        let warehouse_id = assignment.warehouse_id.as_str();
        let items: Vec<PackItem> = assignment
            .reserved
            .iter()
            .map(|line| PackItem {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                bin: self
                    .ledger
                    .get(&line.product_id, warehouse_id)
                    .and_then(|r| r.location)
                    .map(|loc| format!("{}-{}", loc.zone, loc.bin)),
            })
            .collect();

        let weighed: Vec<WeighedLine> = items
            .iter()
            .map(|item| WeighedLine {
                quantity: item.quantity,
                unit_weight_grams: order.item(&item.product_id).and_then(|i| i.unit_weight_grams),
            })
            .collect();
        let item_count: i64 = items.iter().map(|item| item.quantity).sum();
        let weight_grams = PackagingCalculator::estimate_weight_grams(&weighed, &self.config);

        let station = self
            .packing
            .claim_station(warehouse_id)
            .ok_or_else(|| WmsError::NoStationAvailable(warehouse_id.to_string()))?;

        let task = PackingTask {
            id: Uuid::new_v4(),
            order_id: order_id.to_string(),
            warehouse_id: warehouse_id.to_string(),
            station_id: station.id.clone(),
            items,
            packaging: PackagingCalculator::select_packaging(item_count, weight_grams, &self.config),
            dimensions: PackagingCalculator::dimensions_for(item_count),
            weight_grams,
            status: PackingTaskStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.packing.save_task(task.clone());

        let mut assignment = assignment;
        assignment.status = OrderStatus::Packing;
        self.orders.save_assignment(assignment);

        tracing::info!(
            "訂單 {} 指派至包裝站 {}：{:?}，{} 件，{} 公克",
            order_id,
            station.id,
            task.packaging,
            item_count,
            weight_grams
        );
        Ok(task)
    }

    /// 開始包裝
    pub fn start_packing(&self, task_id: Uuid) -> Result<PackingTask> {
        let mut task = self.packing.get_task(task_id)?;
        task.start()?;
        self.packing.save_task(task.clone());
        Ok(task)
    }

    /// 完成包裝：包裝站釋放，訂單進入已包裝
    pub fn complete_packing(&self, task_id: Uuid) -> Result<PackingTask> {
        let mut task = self.packing.get_task(task_id)?;
        task.complete()?;
        self.packing.save_task(task.clone());
        self.packing.release_station(&task.station_id)?;

        if let Some(mut assignment) = self.orders.get_assignment(&task.order_id) {
            assignment.status = OrderStatus::Packed;
            self.orders.save_assignment(assignment);
        }

        tracing::info!("訂單 {} 包裝完成（站 {}）", task.order_id, task.station_id);
        Ok(task)
    }
}
