//! 引擎配置模型

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Money, Result, WmsError};

/// 無歷史出貨記錄時的準時率
pub const DEFAULT_ON_TIME_RATE: f64 = 0.8;

/// 波次上限
pub const DEFAULT_MAX_WAVE_SIZE: usize = 20;

/// 平均單件重量（公克），商品目錄沒有重量時使用
pub const DEFAULT_UNIT_WEIGHT_GRAMS: u32 = 500;

/// 派倉評分參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// 庫存可得性權重
    pub inventory_weight: f64,

    /// 距離權重
    pub proximity_weight: f64,

    /// 容量餘裕權重
    pub capacity_weight: f64,

    /// 歷史準時率權重
    pub on_time_weight: f64,

    /// 工作量權重
    pub workload_weight: f64,

    /// 距離上限（公里），超過即距離分數為 0
    pub max_distance_km: f64,

    /// 工作量上限（待處理訂單數）
    pub max_pending_orders: u32,

    /// 無歷史記錄時的準時率
    pub default_on_time_rate: f64,

    /// 準時率回溯天數
    pub history_window_days: u32,

    /// 基本運費
    pub base_shipping_cost: Money,

    /// 每公里運費
    pub shipping_rate_per_km: Money,

    /// 免運門檻（訂單金額超過即免運）
    pub free_shipping_threshold: Money,

    /// 平均每日運輸距離（公里）
    pub average_km_per_day: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            inventory_weight: 0.40,
            proximity_weight: 0.30,
            capacity_weight: 0.15,
            on_time_weight: 0.10,
            workload_weight: 0.05,
            max_distance_km: 5000.0,
            max_pending_orders: 100,
            default_on_time_rate: DEFAULT_ON_TIME_RATE,
            history_window_days: 30,
            base_shipping_cost: Money::from_major(5),
            shipping_rate_per_km: Money::from_minor(10),
            free_shipping_threshold: Money::from_major(100),
            average_km_per_day: 500.0,
        }
    }
}

impl ScoringConfig {
    /// 建構器模式：設置免運門檻
    pub fn with_free_shipping_threshold(mut self, threshold: Money) -> Self {
        self.free_shipping_threshold = threshold;
        self
    }

    /// 建構器模式：設置運費參數
    pub fn with_shipping_rates(mut self, base: Money, per_km: Money) -> Self {
        self.base_shipping_cost = base;
        self.shipping_rate_per_km = per_km;
        self
    }

    /// 建構器模式：設置平均每日運輸距離
    pub fn with_average_km_per_day(mut self, km: f64) -> Self {
        self.average_km_per_day = km;
        self
    }

    /// 權重合計
    pub fn total_weight(&self) -> f64 {
        self.inventory_weight
            + self.proximity_weight
            + self.capacity_weight
            + self.on_time_weight
            + self.workload_weight
    }

    fn validate(&self) -> Result<()> {
        let weights = [
            self.inventory_weight,
            self.proximity_weight,
            self.capacity_weight,
            self.on_time_weight,
            self.workload_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(WmsError::InvalidConfig("評分權重不可為負數".to_string()));
        }
        if (self.total_weight() - 1.0).abs() > 1e-6 {
            return Err(WmsError::InvalidConfig(format!(
                "評分權重合計必須為 1.0，目前為 {}",
                self.total_weight()
            )));
        }
        if self.max_distance_km <= 0.0 || self.average_km_per_day <= 0.0 {
            return Err(WmsError::InvalidConfig("距離參數必須為正數".to_string()));
        }
        if self.max_pending_orders == 0 {
            return Err(WmsError::InvalidConfig("工作量上限必須為正數".to_string()));
        }
        if !(0.0..=1.0).contains(&self.default_on_time_rate) {
            return Err(WmsError::InvalidConfig("預設準時率必須介於 0 與 1".to_string()));
        }
        Ok(())
    }
}

/// 波次參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WavingConfig {
    /// 每波次最多訂單數
    pub max_wave_size: usize,
}

impl Default for WavingConfig {
    fn default() -> Self {
        Self {
            max_wave_size: DEFAULT_MAX_WAVE_SIZE,
        }
    }
}

/// 包裝參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackingConfig {
    /// 平均單件重量（公克）
    pub default_unit_weight_grams: u32,

    /// 信封上限（公克，僅限單件）
    pub envelope_max_grams: u64,

    /// 小箱上限（公克）
    pub small_box_max_grams: u64,

    /// 中箱上限（公克）
    pub medium_box_max_grams: u64,

    /// 大箱上限（公克），超過改用棧板
    pub large_box_max_grams: u64,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            default_unit_weight_grams: DEFAULT_UNIT_WEIGHT_GRAMS,
            envelope_max_grams: 500,
            small_box_max_grams: 2_000,
            medium_box_max_grams: 10_000,
            large_box_max_grams: 30_000,
        }
    }
}

/// 運送參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingConfig {
    /// 承運商呼叫逾時（毫秒）
    pub carrier_timeout_ms: u64,
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            carrier_timeout_ms: 5_000,
        }
    }
}

impl ShippingConfig {
    pub fn carrier_timeout(&self) -> Duration {
        Duration::from_millis(self.carrier_timeout_ms)
    }
}

/// 引擎配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub waving: WavingConfig,
    pub packing: PackingConfig,
    pub shipping: ShippingConfig,
}

impl EngineConfig {
    /// 從 JSON 載入（缺少的欄位使用預設值）
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| WmsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置評分參數
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    /// 建構器模式：設置波次上限
    pub fn with_max_wave_size(mut self, size: usize) -> Self {
        self.waving.max_wave_size = size;
        self
    }

    /// 建構器模式：設置承運商逾時
    pub fn with_carrier_timeout(mut self, timeout: Duration) -> Self {
        self.shipping.carrier_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// 檢查配置
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        if self.waving.max_wave_size == 0 {
            return Err(WmsError::InvalidConfig("波次上限必須為正數".to_string()));
        }
        let packing = &self.packing;
        if packing.default_unit_weight_grams == 0 {
            return Err(WmsError::InvalidConfig("平均單件重量必須為正數".to_string()));
        }
        if !(packing.small_box_max_grams <= packing.medium_box_max_grams
            && packing.medium_box_max_grams <= packing.large_box_max_grams)
        {
            return Err(WmsError::InvalidConfig("包材重量級距必須遞增".to_string()));
        }
        if self.shipping.carrier_timeout_ms == 0 {
            return Err(WmsError::InvalidConfig("承運商逾時必須為正數".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();

        assert!((config.scoring.total_weight() - 1.0).abs() < 1e-9);
        assert_eq!(config.scoring.default_on_time_rate, DEFAULT_ON_TIME_RATE);
        assert_eq!(config.waving.max_wave_size, 20);
        assert_eq!(config.shipping.carrier_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = EngineConfig::from_json(
            r#"{ "waving": { "max_wave_size": 12 }, "scoring": { "free_shipping_threshold": 7500 } }"#,
        )
        .unwrap();

        assert_eq!(config.waving.max_wave_size, 12);
        assert_eq!(config.scoring.free_shipping_threshold, Money::from_minor(7500));
        // 未提供的欄位保持預設
        assert_eq!(config.scoring.max_distance_km, 5000.0);
        assert_eq!(config.packing.default_unit_weight_grams, 500);
    }

    #[test]
    fn test_from_json_rejects_bad_weights() {
        let err = EngineConfig::from_json(r#"{ "scoring": { "inventory_weight": 0.9 } }"#).unwrap_err();
        assert!(matches!(err, WmsError::InvalidConfig(_)));

        let err = EngineConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, WmsError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::default()
            .with_max_wave_size(5)
            .with_carrier_timeout(Duration::from_millis(250))
            .with_scoring(
                ScoringConfig::default()
                    .with_free_shipping_threshold(Money::from_major(50))
                    .with_average_km_per_day(800.0),
            );

        assert_eq!(config.waving.max_wave_size, 5);
        assert_eq!(config.shipping.carrier_timeout_ms, 250);
        assert_eq!(config.scoring.free_shipping_threshold, Money::from_major(50));
        assert!(config.validate().is_ok());
        assert!(EngineConfig::default().with_max_wave_size(0).validate().is_err());
    }
}
