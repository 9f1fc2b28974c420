//! 訂單派倉
//!
//! 從倉庫主檔、庫存帳與出貨歷史組出候選快照，交由評分器選倉，
//! 保存決策後在勝出倉庫保留每一行明細。保留失敗的明細記為缺貨，不視為派倉失敗。

use std::sync::Arc;

use chrono::{DateTime, Days, Utc};
use wms_calc::{CandidateSnapshot, WarehouseScorer};
use wms_core::{
    ensure_positive, Order, OrderAssignment, OrderStatus, ReservedLine, Result, RoutingDecision,
    ScoringConfig, WmsError,
};
use wms_store::{DeliveryHistory, InventoryLedger, OrderRepository, WarehouseRepository};

/// 派倉服務
pub struct OrderRouter {
    scorer: WarehouseScorer,
    ledger: Arc<InventoryLedger>,
    orders: Arc<dyn OrderRepository>,
    warehouses: Arc<dyn WarehouseRepository>,
    history: Arc<dyn DeliveryHistory>,
}

impl OrderRouter {
    pub fn new(
        config: ScoringConfig,
        ledger: Arc<InventoryLedger>,
        orders: Arc<dyn OrderRepository>,
        warehouses: Arc<dyn WarehouseRepository>,
        history: Arc<dyn DeliveryHistory>,
    ) -> Self {
        Self {
            scorer: WarehouseScorer::new(config),
            ledger,
            orders,
            warehouses,
            history,
        }
    }

    /// 派倉（以目前時間）
    pub fn route(&self, order: &Order) -> Result<RoutingDecision> {
        self.route_at(order, Utc::now())
    }

    /// 派倉
    ///
    /// 已派倉且尚未排入波次的訂單可以重新派倉：先釋放舊倉的保留再在新倉保留。
    pub fn route_at(&self, order: &Order, routed_at: DateTime<Utc>) -> Result<RoutingDecision> {
        for item in &order.items {
            ensure_positive(item.quantity)?;
        }

        let previous = self.orders.get_assignment(&order.id);
        if let Some(existing) = &previous {
            if existing.status != OrderStatus::PendingFulfillment || existing.wave_id.is_some() {
                return Err(WmsError::invalid_transition(
                    "訂單",
                    existing.status,
                    OrderStatus::PendingFulfillment,
                ));
            }
        }

        let snapshots = self.snapshots(order, routed_at);
        let decision = self.scorer.route(order, &snapshots, routed_at)?;

        self.orders.save_order(order.clone());
        self.orders.save_decision(decision.clone());

        if let Some(existing) = previous {
            self.release_lines(&existing.warehouse_id, &existing.reserved);
        }

        let (reserved, shortages) = self.reserve_lines(order, &decision.warehouse_id)?;
        if !shortages.is_empty() {
            tracing::debug!(
                "訂單 {} 於 {} 缺貨 {} 行",
                order.id,
                decision.warehouse_id,
                shortages.len()
            );
        }

        self.orders.save_assignment(OrderAssignment {
            order_id: order.id.clone(),
            warehouse_id: decision.warehouse_id.clone(),
            decision_id: decision.id,
            priority: order.priority,
            routed_at,
            status: OrderStatus::PendingFulfillment,
            reserved,
            shortages,
            wave_id: None,
        });

        tracing::info!(
            "訂單 {} 派往 {}（分數 {:.3}{}）",
            order.id,
            decision.warehouse_id,
            decision.score,
            if decision.partial_fulfillment { "，部分履約" } else { "" }
        );
        Ok(decision)
    }

    /// 組出所有啟用中倉庫的候選快照
    pub fn snapshots(&self, order: &Order, now: DateTime<Utc>) -> Vec<CandidateSnapshot> {
        let today = now.date_naive();
        let since = today
            .checked_sub_days(Days::new(self.scorer.config().history_window_days as u64))
            .unwrap_or(today);

        self.warehouses
            .list_warehouses()
            .into_iter()
            .filter(|w| w.active)
            .map(|warehouse| {
                let on_hand = self.ledger.on_hand_by_product(
                    &warehouse.id,
                    order.items.iter().map(|item| item.product_id.as_str()),
                );
                let deliveries = self.history.deliveries_since(&warehouse.id, since);
                let on_time_rate = self.scorer.on_time_rate(&deliveries, now);
                let pending = self.orders.pending_count(&warehouse.id);

                let mut snapshot = CandidateSnapshot::new(warehouse).with_pending_orders(pending);
                snapshot.on_hand = on_hand;
                snapshot.on_time_rate = on_time_rate;
                snapshot
            })
            .collect()
    }

    fn reserve_lines(
        &self,
        order: &Order,
        warehouse_id: &str,
    ) -> Result<(Vec<ReservedLine>, Vec<ReservedLine>)> {
        let mut reserved = Vec::new();
        let mut shortages = Vec::new();

        for item in &order.items {
            let line = ReservedLine {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            };
            match self.ledger.reserve(&item.product_id, warehouse_id, item.quantity) {
                Ok(_) => reserved.push(line),
                Err(e) if e.is_recoverable() => {
                    tracing::debug!("訂單 {} 保留失敗: {}", order.id, e);
                    shortages.push(line);
                }
                Err(e) => {
                    self.release_lines(warehouse_id, &reserved);
                    return Err(e);
                }
            }
        }

        Ok((reserved, shortages))
    }

    fn release_lines(&self, warehouse_id: &str, lines: &[ReservedLine]) {
        for line in lines {
            if let Err(e) = self.ledger.release(&line.product_id, warehouse_id, line.quantity) {
                tracing::warn!(
                    "釋放保留失敗 {}@{} × {}: {}",
                    line.product_id,
                    warehouse_id,
                    line.quantity,
                    e
                );
            }
        }
    }
}
