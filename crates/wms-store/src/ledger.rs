//! 庫存帳
//!
//! 每個（物料, 倉庫）一列，各列獨立加鎖。所有異動先驗證後提交，
//! 提交後保證 `available == on_hand - reserved >= 0`。
//! 取得列鎖之前必須先釋放 map 的分片鎖；調撥時依倉庫ID字典序鎖兩列。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use wms_core::{ensure_positive, BinLocation, InventoryKey, InventoryRecord, Result, WmsError};

type Row = Arc<Mutex<InventoryRecord>>;

/// 對帳結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// 掃描的庫存列數
    pub synced: usize,

    /// 偵測並修正的偏差數
    pub conflicts: usize,
}

/// 庫存帳
#[derive(Default)]
pub struct InventoryLedger {
    rows: DashMap<InventoryKey, Row>,
}

fn lock(row: &Row) -> MutexGuard<'_, InventoryRecord> {
    row.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn no_stock(product_id: &str, warehouse_id: &str, requested: i64) -> WmsError {
    WmsError::InsufficientStock {
        product_id: product_id.to_string(),
        warehouse_id: warehouse_id.to_string(),
        requested,
        available: 0,
    }
}

impl InventoryLedger {
    /// 創建空的庫存帳
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出列的句柄（分片鎖在此函數返回前釋放）
    fn row(&self, product_id: &str, warehouse_id: &str) -> Option<Row> {
        let key = InventoryKey::new(product_id, warehouse_id);
        self.rows.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    fn row_or_insert(&self, product_id: &str, warehouse_id: &str) -> Row {
        let key = InventoryKey::new(product_id, warehouse_id);
        let entry = self.rows.entry(key).or_insert_with(|| {
            Arc::new(Mutex::new(InventoryRecord::new(
                product_id.to_string(),
                warehouse_id.to_string(),
                0,
            )))
        });
        Arc::clone(entry.value())
    }

    /// 調整現有庫存（入庫為正、出庫為負）
    ///
    /// 第一次正向入庫時建立庫存列。
    pub fn adjust(&self, product_id: &str, warehouse_id: &str, delta: i64) -> Result<InventoryRecord> {
        if delta == 0 {
            return Err(WmsError::InvalidInput("調整數量不可為 0".to_string()));
        }

        let row = if delta > 0 {
            self.row_or_insert(product_id, warehouse_id)
        } else {
            self.row(product_id, warehouse_id)
                .ok_or_else(|| no_stock(product_id, warehouse_id, -delta))?
        };

        let mut record = lock(&row);
        record.adjust(delta)?;
        tracing::debug!(
            "庫存調整 {}@{}: {:+} → 現有 {}",
            product_id,
            warehouse_id,
            delta,
            record.on_hand_qty
        );
        Ok(record.clone())
    }

    /// 保留庫存
    pub fn reserve(&self, product_id: &str, warehouse_id: &str, quantity: i64) -> Result<InventoryRecord> {
        ensure_positive(quantity)?;
        let row = self
            .row(product_id, warehouse_id)
            .ok_or_else(|| no_stock(product_id, warehouse_id, quantity))?;

        let mut record = lock(&row);
        record.reserve(quantity)?;
        Ok(record.clone())
    }

    /// 釋放保留
    pub fn release(&self, product_id: &str, warehouse_id: &str, quantity: i64) -> Result<InventoryRecord> {
        ensure_positive(quantity)?;
        let row = self.existing(product_id, warehouse_id)?;

        let mut record = lock(&row);
        record.release(quantity)?;
        Ok(record.clone())
    }

    /// 揀貨完成扣帳：保留與現有同時扣除
    pub fn consume(&self, product_id: &str, warehouse_id: &str, quantity: i64) -> Result<InventoryRecord> {
        ensure_positive(quantity)?;
        let row = self.existing(product_id, warehouse_id)?;

        let mut record = lock(&row);
        record.consume(quantity)?;
        Ok(record.clone())
    }

    /// 倉間調撥（全有或全無）
    ///
    /// 回傳（來源列, 目的列）提交後的快照。
    pub fn transfer(
        &self,
        product_id: &str,
        from_warehouse_id: &str,
        to_warehouse_id: &str,
        quantity: i64,
    ) -> Result<(InventoryRecord, InventoryRecord)> {
        ensure_positive(quantity)?;
        if from_warehouse_id == to_warehouse_id {
            return Err(WmsError::InvalidInput(format!(
                "調撥來源與目的倉庫相同: {}",
                from_warehouse_id
            )));
        }

        let source = self
            .row(product_id, from_warehouse_id)
            .ok_or_else(|| no_stock(product_id, from_warehouse_id, quantity))?;

        // 建立目的列前先檢查來源可用量
        let snapshot_available = lock(&source).available_qty;
        if snapshot_available < quantity {
            return Err(WmsError::InsufficientStock {
                product_id: product_id.to_string(),
                warehouse_id: from_warehouse_id.to_string(),
                requested: quantity,
                available: snapshot_available,
            });
        }

        let destination = self.row_or_insert(product_id, to_warehouse_id);

        let (mut src, mut dst) = if from_warehouse_id < to_warehouse_id {
            let src = lock(&source);
            let dst = lock(&destination);
            (src, dst)
        } else {
            let dst = lock(&destination);
            let src = lock(&source);
            (src, dst)
        };

        if dst.on_hand_qty.checked_add(quantity).is_none() {
            return Err(WmsError::InvalidInput(format!(
                "調撥目的倉 {} 庫存溢位",
                to_warehouse_id
            )));
        }

        // 來源扣減若失敗，目的列尚未異動
        src.adjust(-quantity)?;
        dst.adjust(quantity)?;

        tracing::debug!(
            "調撥 {} × {}: {} → {}",
            product_id,
            quantity,
            from_warehouse_id,
            to_warehouse_id
        );
        Ok((src.clone(), dst.clone()))
    }

    /// 設置儲位
    pub fn set_location(&self, product_id: &str, warehouse_id: &str, location: BinLocation) -> Result<()> {
        let row = self.existing(product_id, warehouse_id)?;
        lock(&row).location = Some(location);
        Ok(())
    }

    /// 查詢單列快照
    pub fn get(&self, product_id: &str, warehouse_id: &str) -> Option<InventoryRecord> {
        self.row(product_id, warehouse_id).map(|row| lock(&row).clone())
    }

    /// 可用庫存（無記錄為 0）
    pub fn available(&self, product_id: &str, warehouse_id: &str) -> i64 {
        self.get(product_id, warehouse_id)
            .map(|r| r.available_qty)
            .unwrap_or(0)
    }

    /// 指定倉庫的所有庫存列，依物料ID排序
    pub fn records_for_warehouse(&self, warehouse_id: &str) -> Vec<InventoryRecord> {
        self.snapshot(|key| key.warehouse_id == warehouse_id)
    }

    /// 指定物料在所有倉庫的庫存列，依倉庫ID排序
    pub fn records_for_product(&self, product_id: &str) -> Vec<InventoryRecord> {
        self.snapshot(|key| key.product_id == product_id)
    }

    /// 指定倉庫中，各物料的現有庫存
    pub fn on_hand_by_product<'a>(
        &self,
        warehouse_id: &str,
        product_ids: impl IntoIterator<Item = &'a str>,
    ) -> HashMap<String, i64> {
        product_ids
            .into_iter()
            .map(|product_id| {
                let on_hand = self
                    .get(product_id, warehouse_id)
                    .map(|r| r.on_hand_qty)
                    .unwrap_or(0);
                (product_id.to_string(), on_hand)
            })
            .collect()
    }

    /// 指定倉庫中已設置儲位的物料
    pub fn locations_for_warehouse(&self, warehouse_id: &str) -> HashMap<String, BinLocation> {
        self.records_for_warehouse(warehouse_id)
            .into_iter()
            .filter_map(|r| r.location.map(|location| (r.product_id, location)))
            .collect()
    }

    /// 原樣匯入外部記錄（不驗證，偏差交由對帳修正）
    pub fn import(&self, record: InventoryRecord) {
        let row = self.row_or_insert(&record.product_id, &record.warehouse_id);
        *lock(&row) = record;
    }

    /// 對帳：重算可用量並修正偏差，可重複執行
    pub fn reconcile(&self) -> SyncReport {
        let rows: Vec<Row> = self.rows.iter().map(|entry| Arc::clone(entry.value())).collect();

        let mut report = SyncReport::default();
        for row in rows {
            let mut record = lock(&row);
            report.synced += 1;
            if record.reconcile() {
                report.conflicts += 1;
                tracing::warn!(
                    "庫存偏差已修正 {}@{}: 現有 {}, 保留 {}",
                    record.product_id,
                    record.warehouse_id,
                    record.on_hand_qty,
                    record.reserved_qty
                );
            }
        }

        tracing::info!("庫存對帳完成: 掃描 {} 列, 修正 {} 筆", report.synced, report.conflicts);
        report
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn existing(&self, product_id: &str, warehouse_id: &str) -> Result<Row> {
        self.row(product_id, warehouse_id)
            .ok_or_else(|| WmsError::not_found("庫存記錄", format!("{}@{}", product_id, warehouse_id)))
    }

    fn snapshot(&self, filter: impl Fn(&InventoryKey) -> bool) -> Vec<InventoryRecord> {
        let rows: Vec<Row> = self
            .rows
            .iter()
            .filter(|entry| filter(entry.key()))
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut records: Vec<InventoryRecord> = rows.iter().map(|row| lock(row).clone()).collect();
        records.sort_by(|a, b| a.key().cmp(&b.key()));
        records
    }
}
