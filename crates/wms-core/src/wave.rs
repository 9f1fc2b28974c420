//! 揀貨波次模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{BinLocation, Priority, Result, WmsError};

/// 波次狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl WaveStatus {
    pub fn can_transition_to(self, target: WaveStatus) -> bool {
        matches!(
            (self, target),
            (WaveStatus::Pending, WaveStatus::InProgress)
                | (WaveStatus::InProgress, WaveStatus::Completed)
                | (WaveStatus::Pending, WaveStatus::Cancelled)
                | (WaveStatus::InProgress, WaveStatus::Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WaveStatus::Completed | WaveStatus::Cancelled)
    }
}

impl fmt::Display for WaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WaveStatus::Pending => "pending",
            WaveStatus::InProgress => "in_progress",
            WaveStatus::Completed => "completed",
            WaveStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// 彙總揀貨單的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickListLine {
    /// 物料ID
    pub product_id: String,

    /// 波次內合計數量
    pub quantity: i64,

    /// 儲位（未設定時排在最後）
    pub location: Option<BinLocation>,
}

/// 揀貨波次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickingWave {
    /// 波次ID
    pub id: Uuid,

    /// 倉庫ID
    pub warehouse_id: String,

    /// 優先級（一個波次只含單一優先級）
    pub priority: Priority,

    /// 訂單ID（依派倉順序）
    pub order_ids: Vec<String>,

    /// 揀貨路徑（依區域、儲位排序）
    pub pick_list: Vec<PickListLine>,

    /// 狀態
    pub status: WaveStatus,

    /// 指派的揀貨員
    pub pickers: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PickingWave {
    /// 創建新的波次
    pub fn new(
        warehouse_id: String,
        priority: Priority,
        order_ids: Vec<String>,
        pick_list: Vec<PickListLine>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            warehouse_id,
            priority,
            order_ids,
            pick_list,
            status: WaveStatus::Pending,
            pickers: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    fn transition(&mut self, target: WaveStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(WmsError::invalid_transition("揀貨波次", self.status, target));
        }
        self.status = target;
        Ok(())
    }

    /// 開始揀貨
    pub fn start(&mut self, pickers: Vec<String>) -> Result<()> {
        if pickers.is_empty() {
            return Err(WmsError::InvalidInput("開始揀貨至少需要一位揀貨員".to_string()));
        }
        self.transition(WaveStatus::InProgress)?;
        self.pickers = pickers;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// 完成揀貨
    pub fn complete(&mut self) -> Result<()> {
        self.transition(WaveStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// 取消波次
    pub fn cancel(&mut self) -> Result<()> {
        self.transition(WaveStatus::Cancelled)
    }

    pub fn total_units(&self) -> i64 {
        self.pick_list.iter().map(|line| line.quantity).sum()
    }
}
