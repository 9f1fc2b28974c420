//! 退貨模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Money, Result, WmsError};

/// 退貨品況
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    New,
    Opened,
    Damaged,
}

impl ItemCondition {
    /// 可否重新上架
    pub fn is_restockable(self) -> bool {
        matches!(self, ItemCondition::New | ItemCondition::Opened)
    }
}

impl fmt::Display for ItemCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemCondition::New => f.write_str("new"),
            ItemCondition::Opened => f.write_str("opened"),
            ItemCondition::Damaged => f.write_str("damaged"),
        }
    }
}

/// 退貨申請
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    /// 退貨ID
    pub id: Uuid,

    /// 訂單ID
    pub order_id: String,

    /// 物料ID
    pub product_id: String,

    /// 數量
    pub quantity: i64,

    /// 品況
    pub condition: ItemCondition,

    /// 退款金額（單價 × 數量）
    pub refund_amount: Money,

    /// 是否重新上架
    pub restockable: bool,

    /// 重新上架的倉庫（原出貨倉）
    pub restocked_warehouse_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl ReturnRequest {
    pub fn new(
        order_id: String,
        product_id: String,
        quantity: i64,
        condition: ItemCondition,
        unit_price: Money,
    ) -> Result<Self> {
        let refund_amount = unit_price.checked_mul(quantity).ok_or_else(|| {
            WmsError::InvalidInput(format!("退款金額溢位：單價 {} × {}", unit_price, quantity))
        })?;
        Ok(Self {
            id: Uuid::new_v4(),
            order_id,
            product_id,
            quantity,
            condition,
            refund_amount,
            restockable: condition.is_restockable(),
            restocked_warehouse_id: None,
            created_at: Utc::now(),
        })
    }
}
