//! 訂單模型
//!
//! 訂單本身由結帳子系統擁有，引擎只讀取並回寫派倉結果與履約狀態。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{GeoPoint, Money};

/// 訂單優先級
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Normal,
    Low,
}

impl Priority {
    /// 排序權重（越大越優先）
    pub fn rank(self) -> u8 {
        match self {
            Priority::Urgent => 3,
            Priority::High => 2,
            Priority::Normal => 1,
            Priority::Low => 0,
        }
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Urgent => write!(f, "urgent"),
            Priority::High => write!(f, "high"),
            Priority::Normal => write!(f, "normal"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// 訂單明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// 物料ID
    pub product_id: String,

    /// 需求數量
    pub quantity: i64,

    /// 單價
    pub unit_price: Money,

    /// 單件重量（公克），來自商品目錄；缺省時以平均重量估算
    pub unit_weight_grams: Option<u32>,
}

impl OrderItem {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
            unit_weight_grams: None,
        }
    }

    /// 建構器模式：設置單件重量
    pub fn with_unit_weight_grams(mut self, grams: u32) -> Self {
        self.unit_weight_grams = Some(grams);
        self
    }
}

/// 訂單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// 訂單ID
    pub id: String,

    /// 收貨座標
    pub destination: GeoPoint,

    /// 優先級
    pub priority: Priority,

    /// 訂單總額
    pub total_value: Money,

    /// 明細
    pub items: Vec<OrderItem>,

    /// 建立時間
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// 創建新的訂單，總額由明細計算
    pub fn new(id: impl Into<String>, destination: GeoPoint, items: Vec<OrderItem>) -> Self {
        let total_value = items
            .iter()
            .map(|item| item.unit_price * item.quantity)
            .sum();
        Self {
            id: id.into(),
            destination,
            priority: Priority::Normal,
            total_value,
            items,
            created_at: Utc::now(),
        }
    }

    /// 建構器模式：設置優先級
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// 建構器模式：覆寫訂單總額（含運費/折扣後的金額）
    pub fn with_total_value(mut self, total_value: Money) -> Self {
        self.total_value = total_value;
        self
    }

    /// 以明細重算總額，溢位時為 None
    pub fn checked_items_value(&self) -> Option<Money> {
        self.items.iter().try_fold(Money::ZERO, |acc, item| {
            item.unit_price
                .checked_mul(item.quantity)
                .and_then(|line| acc.checked_add(line))
        })
    }

    /// 總件數
    pub fn total_units(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// 查找明細
    pub fn item(&self, product_id: &str) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }
}

/// 履約狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingRouting,
    PendingFulfillment,
    Picking,
    Picked,
    Packing,
    Packed,
    Shipped,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::PendingRouting => "pending_routing",
            OrderStatus::PendingFulfillment => "pending_fulfillment",
            OrderStatus::Picking => "picking",
            OrderStatus::Picked => "picked",
            OrderStatus::Packing => "packing",
            OrderStatus::Packed => "packed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// 已保留的明細
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedLine {
    pub product_id: String,
    pub quantity: i64,
}

/// 派倉結果（引擎回寫到訂單的部分）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAssignment {
    /// 訂單ID
    pub order_id: String,

    /// 履約倉庫
    pub warehouse_id: String,

    /// 採用的派倉決策
    pub decision_id: Uuid,

    /// 優先級（冗餘，供波次排序）
    pub priority: Priority,

    /// 派倉時間（波次內先進先出）
    pub routed_at: DateTime<Utc>,

    /// 履約狀態
    pub status: OrderStatus,

    /// 成功保留的明細
    pub reserved: Vec<ReservedLine>,

    /// 保留失敗的明細（部分履約，由下游處理）
    pub shortages: Vec<ReservedLine>,

    /// 所屬揀貨波次
    pub wave_id: Option<Uuid>,
}

impl OrderAssignment {
    pub fn is_partial(&self) -> bool {
        !self.shortages.is_empty()
    }
}
