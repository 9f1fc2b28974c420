//! 包裝模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Result, WmsError};

/// 包材類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackagingType {
    Envelope,
    SmallBox,
    MediumBox,
    LargeBox,
    Pallet,
}

impl fmt::Display for PackagingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackagingType::Envelope => "envelope",
            PackagingType::SmallBox => "small_box",
            PackagingType::MediumBox => "medium_box",
            PackagingType::LargeBox => "large_box",
            PackagingType::Pallet => "pallet",
        };
        f.write_str(s)
    }
}

/// 外箱尺寸（公分）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_cm: u32,
    pub width_cm: u32,
    pub height_cm: u32,
}

impl Dimensions {
    pub const fn new(length_cm: u32, width_cm: u32, height_cm: u32) -> Self {
        Self {
            length_cm,
            width_cm,
            height_cm,
        }
    }

    /// 體積（立方公分）
    pub fn volume_cm3(&self) -> u64 {
        self.length_cm as u64 * self.width_cm as u64 * self.height_cm as u64
    }
}

/// 包裝站狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationStatus {
    Available,
    Busy,
    Offline,
}

/// 包裝站
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingStation {
    pub id: String,
    pub warehouse_id: String,
    pub status: StationStatus,
}

impl PackingStation {
    pub fn new(id: impl Into<String>, warehouse_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            warehouse_id: warehouse_id.into(),
            status: StationStatus::Available,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == StationStatus::Available
    }
}

/// 包裝任務狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackingTaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for PackingTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackingTaskStatus::Pending => "pending",
            PackingTaskStatus::InProgress => "in_progress",
            PackingTaskStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// 待包裝品項
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackItem {
    pub product_id: String,
    pub quantity: i64,
    /// 儲位代碼（區域-貨架）
    pub bin: Option<String>,
}

/// 包裝任務
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingTask {
    /// 任務ID
    pub id: Uuid,

    /// 訂單ID
    pub order_id: String,

    /// 倉庫ID
    pub warehouse_id: String,

    /// 包裝站
    pub station_id: String,

    /// 品項
    pub items: Vec<PackItem>,

    /// 包材
    pub packaging: PackagingType,

    /// 外箱尺寸
    pub dimensions: Dimensions,

    /// 總重（公克）
    pub weight_grams: u64,

    /// 狀態
    pub status: PackingTaskStatus,

    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PackingTask {
    /// 開始包裝
    pub fn start(&mut self) -> Result<()> {
        if self.status != PackingTaskStatus::Pending {
            return Err(WmsError::invalid_transition(
                "包裝任務",
                self.status,
                PackingTaskStatus::InProgress,
            ));
        }
        self.status = PackingTaskStatus::InProgress;
        Ok(())
    }

    /// 完成包裝
    pub fn complete(&mut self) -> Result<()> {
        if self.status != PackingTaskStatus::InProgress {
            return Err(WmsError::invalid_transition(
                "包裝任務",
                self.status,
                PackingTaskStatus::Completed,
            ));
        }
        self.status = PackingTaskStatus::Completed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.status != PackingTaskStatus::Completed
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}
