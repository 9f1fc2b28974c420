//! 倉間調撥與退貨
//!
//! 兩者都只透過庫存帳的原子操作異動庫存。
//! 退貨只接受已出貨的訂單，累計數量不超過實際出貨量；同一訂單的退貨互斥處理。

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use uuid::Uuid;
use wms_core::{
    ensure_positive, InventoryTransfer, ItemCondition, OrderStatus, Result, ReturnRequest,
    TransferStatus, WmsError,
};
use wms_store::{InventoryLedger, OrderRepository, ReturnRepository, TransferRepository};

/// 調撥與退貨服務
pub struct TransferManager {
    ledger: Arc<InventoryLedger>,
    orders: Arc<dyn OrderRepository>,
    transfers: Arc<dyn TransferRepository>,
    returns: Arc<dyn ReturnRepository>,
    return_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TransferManager {
    pub fn new(
        ledger: Arc<InventoryLedger>,
        orders: Arc<dyn OrderRepository>,
        transfers: Arc<dyn TransferRepository>,
        returns: Arc<dyn ReturnRepository>,
    ) -> Self {
        Self {
            ledger,
            orders,
            transfers,
            returns,
            return_locks: DashMap::new(),
        }
    }

    fn order_lock(&self, order_id: &str) -> Arc<Mutex<()>> {
        let entry = self.return_locks.entry(order_id.to_string()).or_default();
        Arc::clone(entry.value())
    }

    /// 建立調撥單（來源可用量不足時不建立）
    pub fn create_transfer(
        &self,
        product_id: &str,
        from_warehouse_id: &str,
        to_warehouse_id: &str,
        quantity: i64,
        reason: &str,
    ) -> Result<InventoryTransfer> {
        let transfer = InventoryTransfer::new(
            product_id.to_string(),
            from_warehouse_id.to_string(),
            to_warehouse_id.to_string(),
            quantity,
            reason.to_string(),
        )?;

        let available = self.ledger.available(product_id, from_warehouse_id);
        if available < quantity {
            return Err(WmsError::InsufficientStock {
                product_id: product_id.to_string(),
                warehouse_id: from_warehouse_id.to_string(),
                requested: quantity,
                available,
            });
        }

        self.transfers.save_transfer(transfer.clone());
        tracing::info!(
            "建立調撥單 {}: {} × {}，{} → {}",
            transfer.id,
            product_id,
            quantity,
            from_warehouse_id,
            to_warehouse_id
        );
        Ok(transfer)
    }

    /// 執行調撥
    pub fn process_transfer(&self, transfer_id: Uuid) -> Result<InventoryTransfer> {
        let mut transfer = self.transfers.get_transfer(transfer_id)?;
        transfer.ensure_pending(TransferStatus::Completed)?;

        self.ledger.transfer(
            &transfer.product_id,
            &transfer.from_warehouse_id,
            &transfer.to_warehouse_id,
            transfer.quantity,
        )?;
        transfer.mark_completed()?;
        self.transfers.save_transfer(transfer.clone());

        tracing::info!("調撥單 {} 已完成", transfer.id);
        Ok(transfer)
    }

    /// 取消待執行的調撥單
    pub fn cancel_transfer(&self, transfer_id: Uuid) -> Result<InventoryTransfer> {
        let mut transfer = self.transfers.get_transfer(transfer_id)?;
        transfer.mark_cancelled()?;
        self.transfers.save_transfer(transfer.clone());

        tracing::info!("調撥單 {} 已取消", transfer.id);
        Ok(transfer)
    }

    /// 補貨調撥：從可用量最多的倉庫（同量取ID小者）調入目的倉
    pub fn rebalance(&self, product_id: &str, to_warehouse_id: &str, quantity: i64) -> Result<InventoryTransfer> {
        ensure_positive(quantity)?;

        let donor = self
            .ledger
            .records_for_product(product_id)
            .into_iter()
            .filter(|r| r.warehouse_id != to_warehouse_id)
            .max_by(|a, b| {
                a.available_qty
                    .cmp(&b.available_qty)
                    .then_with(|| b.warehouse_id.cmp(&a.warehouse_id))
            })
            .ok_or_else(|| WmsError::InsufficientStock {
                product_id: product_id.to_string(),
                warehouse_id: to_warehouse_id.to_string(),
                requested: quantity,
                available: 0,
            })?;

        tracing::debug!(
            "補貨 {} 至 {}：選定來源 {}（可用 {}）",
            product_id,
            to_warehouse_id,
            donor.warehouse_id,
            donor.available_qty
        );
        self.create_transfer(product_id, &donor.warehouse_id, to_warehouse_id, quantity, "補貨調撥")
    }

    /// 處理退貨：退款 = 單價 × 數量；新品與已拆封品退回原出貨倉
    ///
    /// 訂單必須已出貨；累計退貨量以該物料實際出貨（已保留並扣帳）的數量為上限。
    pub fn process_return(
        &self,
        order_id: &str,
        product_id: &str,
        quantity: i64,
        condition: ItemCondition,
    ) -> Result<ReturnRequest> {
        ensure_positive(quantity)?;

        let lock = self.order_lock(order_id);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let order = self.orders.get_order(order_id)?;
        let item = order.item(product_id).ok_or_else(|| {
            WmsError::InvalidInput(format!("訂單 {} 不含物料 {}", order_id, product_id))
        })?;

        let assignment = self.orders.get_assignment(order_id).ok_or_else(|| {
            WmsError::invalid_transition("訂單", OrderStatus::PendingRouting, "returned")
        })?;
        if assignment.status != OrderStatus::Shipped {
            return Err(WmsError::invalid_transition("訂單", assignment.status, "returned"));
        }

        let shipped: i64 = assignment
            .reserved
            .iter()
            .filter(|line| line.product_id == product_id)
            .map(|line| line.quantity)
            .sum();
        let returned: i64 = self
            .returns
            .returns_for_order(order_id)
            .iter()
            .filter(|r| r.product_id == product_id)
            .map(|r| r.quantity)
            .sum();
        if returned.saturating_add(quantity) > shipped {
            return Err(WmsError::InvalidInput(format!(
                "退貨數量超過出貨數量：出貨 {}, 已退 {}, 本次 {}",
                shipped, returned, quantity
            )));
        }

        let mut request = ReturnRequest::new(
            order_id.to_string(),
            product_id.to_string(),
            quantity,
            condition,
            item.unit_price,
        )?;

        if request.restockable {
            self.ledger.adjust(product_id, &assignment.warehouse_id, quantity)?;
            request.restocked_warehouse_id = Some(assignment.warehouse_id.clone());
        }
        self.returns.save_return(request.clone());

        tracing::info!(
            "訂單 {} 退貨 {} × {}（{}），退款 {}{}",
            order_id,
            product_id,
            quantity,
            condition,
            request.refund_amount,
            match &request.restocked_warehouse_id {
                Some(w) => format!("，回補至 {}", w),
                None => String::new(),
            }
        );
        Ok(request)
    }
}
