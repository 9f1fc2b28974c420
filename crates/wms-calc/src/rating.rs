//! 運費計算與報價排序
//!
//! 每個承運商提供標準與快遞兩種報價：
//! 標準運費 = 基本費 + 重量(公斤) × 每公斤費率；快遞 = 標準 × 1.5，天數 = max(標準 - 2, 1)。

use serde::{Deserialize, Serialize};
use wms_core::{Money, ServiceLevel, ShippingRate};

/// 承運商費率表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierTariff {
    /// 承運商名稱
    pub carrier: String,

    /// 基本費
    pub base_rate: Money,

    /// 每公斤費率
    pub per_kg_rate: Money,

    /// 標準件運輸天數
    pub standard_days: u32,

    /// 是否提供追蹤
    pub tracking: bool,
}

impl CarrierTariff {
    pub fn new(carrier: impl Into<String>, base_rate: Money, per_kg_rate: Money, standard_days: u32) -> Self {
        Self {
            carrier: carrier.into(),
            base_rate,
            per_kg_rate,
            standard_days,
            tracking: true,
        }
    }

    /// 建構器模式：不提供追蹤
    pub fn without_tracking(mut self) -> Self {
        self.tracking = false;
        self
    }

    /// 標準運費（重量以公克計，半分四捨五入）
    pub fn standard_cost(&self, weight_grams: u64) -> Money {
        self.base_rate + self.per_kg_rate.mul_ratio(weight_grams as i64, 1000)
    }

    /// 報價（標準 + 快遞）
    pub fn quote(&self, weight_grams: u64) -> Vec<ShippingRate> {
        let standard = self.standard_cost(weight_grams);
        vec![
            ShippingRate {
                carrier: self.carrier.clone(),
                service: ServiceLevel::Standard,
                cost: standard,
                estimated_days: self.standard_days,
                tracking: self.tracking,
            },
            ShippingRate {
                carrier: self.carrier.clone(),
                service: ServiceLevel::Express,
                cost: express_cost(standard),
                estimated_days: express_days(self.standard_days),
                tracking: self.tracking,
            },
        ]
    }
}

/// 快遞運費 = 標準 × 1.5
pub fn express_cost(standard: Money) -> Money {
    standard.mul_ratio(3, 2)
}

/// 快遞天數 = max(標準 - 2, 1)
pub fn express_days(standard_days: u32) -> u32 {
    standard_days.saturating_sub(2).max(1)
}

/// 排序報價：運費遞增，同價依天數、承運商、服務等級
pub fn rank_rates(rates: &mut [ShippingRate]) {
    rates.sort_by(|a, b| {
        a.cost
            .cmp(&b.cost)
            .then_with(|| a.estimated_days.cmp(&b.estimated_days))
            .then_with(|| a.carrier.cmp(&b.carrier))
            .then_with(|| a.service.cmp(&b.service))
    });
}
