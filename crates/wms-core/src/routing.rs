//! 派倉決策模型

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Money;

/// 各項子分數（皆介於 0 ~ 1）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// 庫存可得性
    pub inventory: f64,
    /// 距離
    pub proximity: f64,
    /// 容量餘裕
    pub capacity: f64,
    /// 歷史準時率
    pub on_time: f64,
    /// 目前工作量
    pub workload: f64,
}

/// 單一候選倉的評分結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    /// 倉庫ID
    pub warehouse_id: String,

    /// 綜合分數
    pub score: f64,

    /// 子分數
    pub breakdown: ScoreBreakdown,

    /// 距離（公里）
    pub distance_km: f64,

    /// 預估運費
    pub shipping_cost: Money,

    /// 預估運輸天數
    pub transit_days: u32,
}

/// 派倉決策（建立後不可變更，重新派倉會產生新的決策）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// 決策ID
    pub id: Uuid,

    /// 訂單ID
    pub order_id: String,

    /// 選定倉庫
    pub warehouse_id: String,

    /// 可讀的決策理由
    pub rationale: String,

    /// 預計出貨日
    pub estimated_ship_date: NaiveDate,

    /// 預計到貨日
    pub estimated_delivery_date: NaiveDate,

    /// 預估運費
    pub estimated_shipping_cost: Money,

    /// 勝出的綜合分數
    pub score: f64,

    /// 勝出倉無法完整滿足所有明細（部分履約由下游處理）
    pub partial_fulfillment: bool,

    /// 所有候選倉的評分（依名次排序）
    pub candidates: Vec<CandidateScore>,

    /// 派倉時間
    pub routed_at: DateTime<Utc>,
}

impl RoutingDecision {
    /// 勝出候選的評分
    pub fn winner(&self) -> Option<&CandidateScore> {
        self.candidates.first()
    }

    /// 預估運輸天數
    pub fn transit_days(&self) -> i64 {
        (self.estimated_delivery_date - self.estimated_ship_date).num_days()
    }

    /// 比較決策內容（忽略決策ID）
    pub fn same_outcome(&self, other: &RoutingDecision) -> bool {
        self.order_id == other.order_id
            && self.warehouse_id == other.warehouse_id
            && self.rationale == other.rationale
            && self.estimated_ship_date == other.estimated_ship_date
            && self.estimated_delivery_date == other.estimated_delivery_date
            && self.estimated_shipping_cost == other.estimated_shipping_cost
            && self.score == other.score
            && self.partial_fulfillment == other.partial_fulfillment
            && self.candidates == other.candidates
    }
}

/// 歷史出貨記錄（計算準時率用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub order_id: String,
    pub warehouse_id: String,
    /// 出貨日
    pub shipped_on: NaiveDate,
    /// 預計到貨日
    pub estimated_delivery_date: NaiveDate,
    /// 實際到貨日
    pub delivered_on: NaiveDate,
}

impl DeliveryRecord {
    /// 是否在預計到貨日（含）之前送達
    pub fn met_estimate(&self) -> bool {
        self.delivered_on <= self.estimated_delivery_date
    }
}
