//! 庫存模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, WmsError};

/// 庫存鍵（物料, 倉庫）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InventoryKey {
    pub product_id: String,
    pub warehouse_id: String,
}

impl InventoryKey {
    pub fn new(product_id: impl Into<String>, warehouse_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            warehouse_id: warehouse_id.into(),
        }
    }
}

/// 儲位（區域 + 貨架）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BinLocation {
    /// 區域代碼
    pub zone: String,
    /// 貨架/儲位代碼
    pub bin: String,
}

impl BinLocation {
    pub fn new(zone: impl Into<String>, bin: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            bin: bin.into(),
        }
    }
}

/// 庫存記錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// 物料ID
    pub product_id: String,

    /// 倉庫ID
    pub warehouse_id: String,

    /// 現有庫存
    pub on_hand_qty: i64,

    /// 已保留數量
    pub reserved_qty: i64,

    /// 可用庫存（現有 - 已保留）
    pub available_qty: i64,

    /// 儲位
    pub location: Option<BinLocation>,

    /// 最後異動時間
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// 創建新的庫存記錄
    pub fn new(product_id: String, warehouse_id: String, on_hand_qty: i64) -> Self {
        Self {
            product_id,
            warehouse_id,
            on_hand_qty,
            reserved_qty: 0,
            available_qty: on_hand_qty,
            location: None,
            updated_at: Utc::now(),
        }
    }

    /// 建構器模式：設置已保留數量
    pub fn with_reserved_qty(mut self, reserved_qty: i64) -> Self {
        self.reserved_qty = reserved_qty;
        self.calculate_available();
        self
    }

    /// 建構器模式：設置儲位
    pub fn with_location(mut self, location: BinLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn key(&self) -> InventoryKey {
        InventoryKey::new(self.product_id.clone(), self.warehouse_id.clone())
    }

    /// 計算可用庫存
    pub fn calculate_available(&mut self) {
        self.available_qty = self.on_hand_qty - self.reserved_qty;
    }

    /// 不變量：可用 = 現有 - 保留 且 >= 0，保留 >= 0
    pub fn is_consistent(&self) -> bool {
        self.available_qty == self.on_hand_qty - self.reserved_qty
            && self.available_qty >= 0
            && self.reserved_qty >= 0
    }

    fn insufficient(&self, requested: i64) -> WmsError {
        WmsError::InsufficientStock {
            product_id: self.product_id.clone(),
            warehouse_id: self.warehouse_id.clone(),
            requested,
            available: self.available_qty,
        }
    }

    fn touch(&mut self) {
        self.calculate_available();
        self.updated_at = Utc::now();
    }

    /// 調整現有庫存（入庫為正、出庫為負）
    pub fn adjust(&mut self, delta: i64) -> Result<()> {
        let on_hand = self.on_hand_qty.checked_add(delta).ok_or_else(|| {
            WmsError::InvalidInput(format!(
                "庫存調整溢位：現有 {}, 調整 {}",
                self.on_hand_qty, delta
            ))
        })?;
        if on_hand < self.reserved_qty {
            return Err(self.insufficient(-delta));
        }
        self.on_hand_qty = on_hand;
        self.touch();
        Ok(())
    }

    /// 保留庫存
    pub fn reserve(&mut self, quantity: i64) -> Result<()> {
        ensure_positive(quantity)?;
        if quantity > self.available_qty {
            return Err(self.insufficient(quantity));
        }
        self.reserved_qty += quantity;
        self.touch();
        Ok(())
    }

    /// 釋放已保留的庫存
    pub fn release(&mut self, quantity: i64) -> Result<()> {
        ensure_positive(quantity)?;
        if quantity > self.reserved_qty {
            return Err(WmsError::InvalidInput(format!(
                "釋放數量超過已保留數量：釋放 {}, 已保留 {}",
                quantity, self.reserved_qty
            )));
        }
        self.reserved_qty -= quantity;
        self.touch();
        Ok(())
    }

    /// 出貨扣帳：保留量與現有量同時扣除
    pub fn consume(&mut self, quantity: i64) -> Result<()> {
        ensure_positive(quantity)?;
        if quantity > self.reserved_qty || quantity > self.on_hand_qty {
            return Err(WmsError::InvalidInput(format!(
                "扣帳數量超過已保留數量：扣帳 {}, 已保留 {}",
                quantity, self.reserved_qty
            )));
        }
        self.reserved_qty -= quantity;
        self.on_hand_qty -= quantity;
        self.touch();
        Ok(())
    }

    /// 對帳修正：回傳是否偵測到偏差
    ///
    /// 現有量為負時歸零；保留量超過現有量時壓回現有量。
    pub fn reconcile(&mut self) -> bool {
        let mut drifted = false;
        if self.on_hand_qty < 0 {
            self.on_hand_qty = 0;
            drifted = true;
        }
        if self.reserved_qty < 0 {
            self.reserved_qty = 0;
            drifted = true;
        }
        if self.on_hand_qty - self.reserved_qty < 0 {
            self.reserved_qty = self.on_hand_qty;
            drifted = true;
        }
        let stale = self.available_qty != self.on_hand_qty - self.reserved_qty;
        self.calculate_available();
        if drifted || stale {
            self.updated_at = Utc::now();
        }
        drifted
    }
}

/// 數量必須為正數
pub fn ensure_positive(quantity: i64) -> Result<()> {
    if quantity <= 0 {
        return Err(WmsError::InvalidInput(format!("數量必須為正數: {}", quantity)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(on_hand: i64) -> InventoryRecord {
        InventoryRecord::new("SKU-001".to_string(), "WH-A".to_string(), on_hand)
    }

    #[test]
    fn test_create_record() {
        let inventory = record(100).with_location(BinLocation::new("A", "01-02"));

        assert_eq!(inventory.on_hand_qty, 100);
        assert_eq!(inventory.available_qty, 100);
        assert_eq!(inventory.location, Some(BinLocation::new("A", "01-02")));
        assert!(inventory.is_consistent());
    }

    #[test]
    fn test_reserve_and_release() {
        let mut inventory = record(100);

        assert!(inventory.reserve(50).is_ok());
        assert_eq!(inventory.reserved_qty, 50);
        assert_eq!(inventory.available_qty, 50);

        // 超量保留應該失敗且不改變記錄
        let err = inventory.reserve(60).unwrap_err();
        assert!(matches!(err, WmsError::InsufficientStock { requested: 60, available: 50, .. }));
        assert_eq!(inventory.reserved_qty, 50);

        assert!(inventory.release(30).is_ok());
        assert_eq!(inventory.reserved_qty, 20);
        assert_eq!(inventory.available_qty, 80);

        assert!(matches!(inventory.release(21), Err(WmsError::InvalidInput(_))));
    }

    #[test]
    fn test_adjust_cannot_undercut_reservations() {
        let mut inventory = record(10).with_reserved_qty(8);

        assert!(inventory.adjust(-2).is_ok());
        assert_eq!(inventory.available_qty, 0);
        assert!(inventory.adjust(-1).is_err());
        assert_eq!(inventory.on_hand_qty, 8);
    }

    #[test]
    fn test_adjust_overflow_is_rejected() {
        let mut inventory = record(10);
        assert!(matches!(inventory.adjust(i64::MAX), Err(WmsError::InvalidInput(_))));
        assert_eq!(inventory.on_hand_qty, 10);
        assert!(inventory.is_consistent());
    }

    #[test]
    fn test_consume() {
        let mut inventory = record(10).with_reserved_qty(4);
        inventory.consume(3).unwrap();
        assert_eq!(inventory.on_hand_qty, 7);
        assert_eq!(inventory.reserved_qty, 1);
        assert_eq!(inventory.available_qty, 6);
        assert!(inventory.consume(2).is_err());
    }

    #[test]
    fn test_non_positive_quantities_rejected() {
        let mut inventory = record(10);
        assert!(matches!(inventory.reserve(0), Err(WmsError::InvalidInput(_))));
        assert!(matches!(inventory.release(-1), Err(WmsError::InvalidInput(_))));
    }

    #[test]
    fn test_reconcile_clamps_reserved() {
        let mut inventory = record(5);
        inventory.reserved_qty = 9;
        inventory.available_qty = 5;

        assert!(inventory.reconcile());
        assert_eq!(inventory.reserved_qty, 5);
        assert_eq!(inventory.available_qty, 0);
        assert!(inventory.is_consistent());

        // 第二次對帳沒有偏差
        assert!(!inventory.reconcile());
    }

    #[test]
    fn test_reconcile_negative_on_hand() {
        let mut inventory = record(0);
        inventory.on_hand_qty = -3;
        inventory.reserved_qty = 2;

        assert!(inventory.reconcile());
        assert_eq!(inventory.on_hand_qty, 0);
        assert_eq!(inventory.reserved_qty, 0);
        assert!(inventory.is_consistent());
    }
}
