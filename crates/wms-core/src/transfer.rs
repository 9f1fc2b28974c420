//! 調撥模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::inventory::ensure_positive;
use crate::{Result, WmsError};

/// 調撥狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Completed,
    Cancelled,
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Completed => "completed",
            TransferStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// 倉間調撥
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTransfer {
    /// 調撥ID
    pub id: Uuid,

    /// 物料ID
    pub product_id: String,

    /// 來源倉
    pub from_warehouse_id: String,

    /// 目的倉
    pub to_warehouse_id: String,

    /// 數量
    pub quantity: i64,

    /// 調撥原因
    pub reason: String,

    /// 狀態
    pub status: TransferStatus,

    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl InventoryTransfer {
    /// 創建新的調撥單（待審核）
    pub fn new(
        product_id: String,
        from_warehouse_id: String,
        to_warehouse_id: String,
        quantity: i64,
        reason: String,
    ) -> Result<Self> {
        ensure_positive(quantity)?;
        if from_warehouse_id == to_warehouse_id {
            return Err(WmsError::InvalidInput(format!(
                "來源倉與目的倉相同: {}",
                from_warehouse_id
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            product_id,
            from_warehouse_id,
            to_warehouse_id,
            quantity,
            reason,
            status: TransferStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        })
    }

    /// 確認是否可執行
    pub fn ensure_pending(&self, target: TransferStatus) -> Result<()> {
        if self.status != TransferStatus::Pending {
            return Err(WmsError::invalid_transition("調撥單", self.status, target));
        }
        Ok(())
    }

    pub fn mark_completed(&mut self) -> Result<()> {
        self.ensure_pending(TransferStatus::Completed)?;
        self.status = TransferStatus::Completed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_cancelled(&mut self) -> Result<()> {
        self.ensure_pending(TransferStatus::Cancelled)?;
        self.status = TransferStatus::Cancelled;
        Ok(())
    }
}
