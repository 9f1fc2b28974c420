//! 倉庫評分與派倉決策
//!
//! 對每個候選倉獨立計算五項子分數，以固定權重合成綜合分數。
//! 綜合分數最高者勝出；同分時取預估運費較低者，再以倉庫ID決定。

use chrono::{DateTime, Days, Utc};
use rayon::prelude::*;
use std::collections::HashMap;
use uuid::Uuid;
use wms_core::{
    CandidateScore, DeliveryRecord, Money, Order, Result, RoutingDecision, ScoreBreakdown,
    ScoringConfig, Warehouse, WmsError,
};

use crate::lead_time::LeadTimeCalculator;

/// 分數比較容差
pub const SCORE_EPSILON: f64 = 1e-9;

/// 候選倉快照（評分當下的狀態）
#[derive(Debug, Clone)]
pub struct CandidateSnapshot {
    /// 倉庫主資料
    pub warehouse: Warehouse,

    /// 各物料現有庫存
    pub on_hand: HashMap<String, i64>,

    /// 回溯期間的準時率（無記錄為 None）
    pub on_time_rate: Option<f64>,

    /// 待處理訂單數
    pub pending_orders: u32,
}

impl CandidateSnapshot {
    pub fn new(warehouse: Warehouse) -> Self {
        Self {
            warehouse,
            on_hand: HashMap::new(),
            on_time_rate: None,
            pending_orders: 0,
        }
    }

    /// 建構器模式：設置物料庫存
    pub fn with_stock(mut self, product_id: impl Into<String>, on_hand: i64) -> Self {
        self.on_hand.insert(product_id.into(), on_hand);
        self
    }

    /// 建構器模式：設置準時率
    pub fn with_on_time_rate(mut self, rate: f64) -> Self {
        self.on_time_rate = Some(rate);
        self
    }

    /// 建構器模式：設置待處理訂單數
    pub fn with_pending_orders(mut self, pending: u32) -> Self {
        self.pending_orders = pending;
        self
    }
}

/// 倉庫評分器
pub struct WarehouseScorer {
    config: ScoringConfig,
}

impl WarehouseScorer {
    /// 創建新的評分器
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// 派倉：對所有候選倉評分並選出勝者
    ///
    /// 沒有任何候選倉能完整供貨時仍回傳分數最高者，並標記為部分履約。
    pub fn route(
        &self,
        order: &Order,
        candidates: &[CandidateSnapshot],
        routed_at: DateTime<Utc>,
    ) -> Result<RoutingDecision> {
        if candidates.is_empty() {
            return Err(WmsError::InvalidInput(format!(
                "訂單 {} 沒有候選倉庫",
                order.id
            )));
        }
        if order.items.is_empty() {
            return Err(WmsError::InvalidInput(format!("訂單 {} 沒有明細", order.id)));
        }
        if order.checked_items_value().is_none() {
            return Err(WmsError::InvalidInput(format!("訂單 {} 的金額溢位", order.id)));
        }
        if !order.destination.is_valid() {
            return Err(WmsError::InvalidInput(format!(
                "訂單 {} 的收貨座標無效",
                order.id
            )));
        }

        tracing::debug!("訂單 {} 評分候選倉 {} 個", order.id, candidates.len());

        let mut scores: Vec<CandidateScore> = candidates
            .par_iter()
            .map(|candidate| self.score(order, candidate))
            .collect();
        rank_candidates(&mut scores);

        let winner = scores
            .first()
            .cloned()
            .ok_or_else(|| WmsError::InvalidInput(format!("訂單 {} 沒有候選倉庫", order.id)))?;

        let partial = winner.breakdown.inventory < 1.0;
        if scores.iter().all(|s| s.breakdown.inventory == 0.0) {
            tracing::info!(
                "訂單 {} 沒有任何候選倉有庫存，仍派往 {}，部分履約由下游處理",
                order.id,
                winner.warehouse_id
            );
        }

        let ship_date = LeadTimeCalculator::ship_date(routed_at);
        let delivery_date = LeadTimeCalculator::delivery_date(ship_date, winner.transit_days);

        Ok(RoutingDecision {
            id: Uuid::new_v4(),
            order_id: order.id.clone(),
            warehouse_id: winner.warehouse_id.clone(),
            rationale: rationale(&winner, scores.len(), partial),
            estimated_ship_date: ship_date,
            estimated_delivery_date: delivery_date,
            estimated_shipping_cost: winner.shipping_cost,
            score: winner.score,
            partial_fulfillment: partial,
            candidates: scores,
            routed_at,
        })
    }

    /// 單一候選倉評分
    pub fn score(&self, order: &Order, candidate: &CandidateSnapshot) -> CandidateScore {
        let warehouse = &candidate.warehouse;
        let distance_km = warehouse.location.distance_km(&order.destination);

        let breakdown = ScoreBreakdown {
            inventory: inventory_score(order, &candidate.on_hand),
            proximity: self.proximity_score(distance_km),
            capacity: capacity_score(warehouse),
            on_time: candidate
                .on_time_rate
                .unwrap_or(self.config.default_on_time_rate)
                .clamp(0.0, 1.0),
            workload: self.workload_score(candidate.pending_orders),
        };

        CandidateScore {
            warehouse_id: warehouse.id.clone(),
            score: self.composite(&breakdown),
            breakdown,
            distance_km,
            shipping_cost: self.shipping_cost(order.total_value, distance_km),
            transit_days: LeadTimeCalculator::transit_days(
                distance_km,
                self.config.average_km_per_day,
            ),
        }
    }

    /// 加權合成
    pub fn composite(&self, breakdown: &ScoreBreakdown) -> f64 {
        let c = &self.config;
        breakdown.inventory * c.inventory_weight
            + breakdown.proximity * c.proximity_weight
            + breakdown.capacity * c.capacity_weight
            + breakdown.on_time * c.on_time_weight
            + breakdown.workload * c.workload_weight
    }

    /// 距離分數：max(0, 1 - 距離/上限)
    pub fn proximity_score(&self, distance_km: f64) -> f64 {
        (1.0 - distance_km / self.config.max_distance_km).max(0.0)
    }

    /// 工作量分數：max(0, 1 - 待處理/上限)
    pub fn workload_score(&self, pending_orders: u32) -> f64 {
        (1.0 - pending_orders as f64 / self.config.max_pending_orders as f64).max(0.0)
    }

    /// 預估運費：基本運費 + 距離 × 每公里運費；訂單金額超過門檻免運
    pub fn shipping_cost(&self, order_value: Money, distance_km: f64) -> Money {
        if order_value > self.config.free_shipping_threshold {
            return Money::ZERO;
        }
        self.config.base_shipping_cost + self.config.shipping_rate_per_km.mul_f64(distance_km)
    }

    /// 回溯期間的準時率（只計入回溯窗口內出貨的記錄）
    pub fn on_time_rate(&self, history: &[DeliveryRecord], now: DateTime<Utc>) -> Option<f64> {
        let today = now.date_naive();
        let since = today
            .checked_sub_days(Days::new(self.config.history_window_days as u64))
            .unwrap_or(today);
        let recent: Vec<_> = history.iter().filter(|r| r.shipped_on >= since).collect();
        if recent.is_empty() {
            return None;
        }
        let met = recent.iter().filter(|r| r.met_estimate()).count();
        Some(met as f64 / recent.len() as f64)
    }
}

impl Default for WarehouseScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

/// 庫存可得性：能完整滿足的明細比例（每行 0 或 1，取平均）
pub fn inventory_score(order: &Order, on_hand: &HashMap<String, i64>) -> f64 {
    if order.items.is_empty() {
        return 0.0;
    }
    let satisfied = order
        .items
        .iter()
        .filter(|item| on_hand.get(&item.product_id).copied().unwrap_or(0) >= item.quantity)
        .count();
    satisfied as f64 / order.items.len() as f64
}

/// 容量餘裕：max(0, 1 - 使用率)
pub fn capacity_score(warehouse: &Warehouse) -> f64 {
    (1.0 - warehouse.utilization()).max(0.0)
}

/// 分數量化到 `SCORE_EPSILON` 的格點，落在同一格視為同分
fn score_key(score: f64) -> i64 {
    (score / SCORE_EPSILON).round() as i64
}

/// 排名：分數高者優先，同分取運費低者，再取倉庫ID
pub fn rank_candidates(scores: &mut [CandidateScore]) {
    scores.sort_by(|a, b| {
        score_key(b.score)
            .cmp(&score_key(a.score))
            .then_with(|| a.shipping_cost.cmp(&b.shipping_cost))
            .then_with(|| a.warehouse_id.cmp(&b.warehouse_id))
    });
}

fn rationale(winner: &CandidateScore, candidate_count: usize, partial: bool) -> String {
    let b = &winner.breakdown;
    let mut text = format!(
        "於 {} 個候選倉中選定 {}：綜合分數 {:.3}（庫存 {:.2}、距離 {:.0} 公里/{:.2}、容量 {:.2}、準時率 {:.2}、工作量 {:.2}），預估運費 {}，運輸 {} 天",
        candidate_count,
        winner.warehouse_id,
        winner.score,
        b.inventory,
        winner.distance_km,
        b.proximity,
        b.capacity,
        b.on_time,
        b.workload,
        winner.shipping_cost,
        winner.transit_days,
    );
    if partial {
        text.push_str("；無法完整供貨，部分履約由下游處理");
    }
    text
}
