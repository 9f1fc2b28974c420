//! 波次揀貨
//!
//! 每個倉庫的建波次操作互斥執行；已在未取消波次中的訂單不會被重複排入。

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use uuid::Uuid;
use wms_calc::{WaveCandidate, WavePlanner};
use wms_core::{OrderAssignment, OrderStatus, PickingWave, Result, WavingConfig, WaveStatus, WmsError};
use wms_store::{InventoryLedger, OrderRepository, WaveRepository};

/// 波次服務
pub struct WaveBatcher {
    config: WavingConfig,
    ledger: Arc<InventoryLedger>,
    orders: Arc<dyn OrderRepository>,
    waves: Arc<dyn WaveRepository>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl WaveBatcher {
    pub fn new(
        config: WavingConfig,
        ledger: Arc<InventoryLedger>,
        orders: Arc<dyn OrderRepository>,
        waves: Arc<dyn WaveRepository>,
    ) -> Self {
        Self {
            config,
            ledger,
            orders,
            waves,
            locks: DashMap::new(),
        }
    }

    fn warehouse_lock(&self, warehouse_id: &str) -> Arc<Mutex<()>> {
        let entry = self.locks.entry(warehouse_id.to_string()).or_default();
        Arc::clone(entry.value())
    }

    /// 將倉庫中待履約且尚未入波次的訂單排成新波次
    pub fn build_waves(&self, warehouse_id: &str) -> Result<Vec<PickingWave>> {
        let lock = self.warehouse_lock(warehouse_id);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let pending: Vec<OrderAssignment> = self
            .orders
            .assignments_for_warehouse(warehouse_id)
            .into_iter()
            .filter(|a| a.status == OrderStatus::PendingFulfillment && a.wave_id.is_none())
            .collect();

        let mut candidates = Vec::with_capacity(pending.len());
        for assignment in &pending {
            if assignment.reserved.is_empty() {
                tracing::debug!("訂單 {} 沒有已保留的明細，暫不排入波次", assignment.order_id);
                continue;
            }
            candidates.push(WaveCandidate {
                order_id: assignment.order_id.clone(),
                priority: assignment.priority,
                routed_at: assignment.routed_at,
                lines: assignment.reserved.clone(),
            });
        }

        let locations = self.ledger.locations_for_warehouse(warehouse_id);
        let waves = WavePlanner::plan(
            warehouse_id,
            candidates,
            self.config.max_wave_size,
            &locations,
        );

        for wave in &waves {
            self.waves.save_wave(wave.clone());
            for order_id in &wave.order_ids {
                self.update_assignment(order_id, |a| a.wave_id = Some(wave.id))?;
            }
        }

        if !waves.is_empty() {
            tracing::info!(
                "倉庫 {} 新建波次 {} 個，共 {} 筆訂單",
                warehouse_id,
                waves.len(),
                waves.iter().map(|w| w.order_ids.len()).sum::<usize>()
            );
        }
        Ok(waves)
    }

    /// 開始揀貨
    pub fn start_wave(&self, wave_id: Uuid, pickers: Vec<String>) -> Result<PickingWave> {
        let mut wave = self.waves.get_wave(wave_id)?;
        let lock = self.warehouse_lock(&wave.warehouse_id);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        wave.start(pickers)?;
        for order_id in &wave.order_ids {
            self.update_assignment(order_id, |a| a.status = OrderStatus::Picking)?;
        }
        self.waves.save_wave(wave.clone());

        tracing::info!("波次 {} 開始揀貨（揀貨員 {} 位）", wave.id, wave.pickers.len());
        Ok(wave)
    }

    /// 完成揀貨：扣除各訂單已保留的庫存
    ///
    /// 扣帳前先以目前庫存列檢查整個波次，任何一列不足就不異動。
    /// 已是揀貨完成的訂單不再扣帳，失敗後重試不會重複扣除。
    pub fn complete_wave(&self, wave_id: Uuid) -> Result<PickingWave> {
        let mut wave = self.waves.get_wave(wave_id)?;
        let lock = self.warehouse_lock(&wave.warehouse_id);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if !wave.status.can_transition_to(WaveStatus::Completed) {
            return Err(WmsError::invalid_transition(
                "揀貨波次",
                wave.status,
                WaveStatus::Completed,
            ));
        }

        let mut outstanding = Vec::with_capacity(wave.order_ids.len());
        for order_id in &wave.order_ids {
            let assignment = self
                .orders
                .get_assignment(order_id)
                .ok_or_else(|| WmsError::not_found("派倉結果", order_id.as_str()))?;
            if assignment.status == OrderStatus::Picked {
                tracing::debug!("訂單 {} 已扣帳，略過", order_id);
                continue;
            }
            outstanding.push(assignment);
        }

        self.check_wave_demand(wave.id, &outstanding)?;

        for mut assignment in outstanding {
            for line in &assignment.reserved {
                self.ledger
                    .consume(&line.product_id, &assignment.warehouse_id, line.quantity)?;
            }
            assignment.status = OrderStatus::Picked;
            self.orders.save_assignment(assignment);
        }

        wave.complete()?;
        self.waves.save_wave(wave.clone());

        tracing::info!("波次 {} 揀貨完成，共 {} 件", wave.id, wave.total_units());
        Ok(wave)
    }

    /// 取消波次：訂單回到待履約，可重新排入波次
    pub fn cancel_wave(&self, wave_id: Uuid) -> Result<PickingWave> {
        let mut wave = self.waves.get_wave(wave_id)?;
        let lock = self.warehouse_lock(&wave.warehouse_id);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        wave.cancel()?;
        for order_id in &wave.order_ids {
            self.update_assignment(order_id, |a| {
                a.wave_id = None;
                a.status = OrderStatus::PendingFulfillment;
            })?;
        }
        self.waves.save_wave(wave.clone());

        tracing::info!("波次 {} 已取消，{} 筆訂單回到待履約", wave.id, wave.order_ids.len());
        Ok(wave)
    }

    /// 以目前庫存列檢查整批訂單的扣帳需求
    fn check_wave_demand(&self, wave_id: Uuid, assignments: &[OrderAssignment]) -> Result<()> {
        let mut demand: BTreeMap<(&str, &str), i64> = BTreeMap::new();
        for assignment in assignments {
            for line in &assignment.reserved {
                *demand
                    .entry((line.product_id.as_str(), assignment.warehouse_id.as_str()))
                    .or_default() += line.quantity;
            }
        }
        for (&(product_id, warehouse_id), &quantity) in &demand {
            let (reserved, on_hand) = self
                .ledger
                .get(product_id, warehouse_id)
                .map(|r| (r.reserved_qty, r.on_hand_qty))
                .unwrap_or((0, 0));
            if quantity > reserved || quantity > on_hand {
                tracing::warn!(
                    "波次 {} 無法完成：{}@{} 需扣 {}，保留 {}，現有 {}",
                    wave_id,
                    product_id,
                    warehouse_id,
                    quantity,
                    reserved,
                    on_hand
                );
                return Err(WmsError::InvalidInput(format!(
                    "波次 {} 扣帳數量超過保留量：{}@{} 需扣 {}, 已保留 {}",
                    wave_id, product_id, warehouse_id, quantity, reserved
                )));
            }
        }

        Ok(())
    }

    fn update_assignment(&self, order_id: &str, apply: impl FnOnce(&mut OrderAssignment)) -> Result<()> {
        let mut assignment = self
            .orders
            .get_assignment(order_id)
            .ok_or_else(|| WmsError::not_found("派倉結果", order_id))?;
        apply(&mut assignment);
        self.orders.save_assignment(assignment);
        Ok(())
    }
}
