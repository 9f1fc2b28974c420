//! 運送報價模型

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Dimensions, GeoPoint, Money};

/// 服務等級
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceLevel {
    Standard,
    Express,
}

impl fmt::Display for ServiceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceLevel::Standard => f.write_str("standard"),
            ServiceLevel::Express => f.write_str("express"),
        }
    }
}

/// 貨件物理參數
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShipmentSpec {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub weight_grams: u64,
    pub dimensions: Dimensions,
}

/// 正規化後的運費報價
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    /// 承運商
    pub carrier: String,

    /// 服務等級
    pub service: ServiceLevel,

    /// 運費
    pub cost: Money,

    /// 預估運輸天數
    pub estimated_days: u32,

    /// 是否提供追蹤
    pub tracking: bool,
}

/// 託運標籤
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingLabel {
    pub carrier: String,
    pub service: ServiceLevel,
    pub tracking_number: String,
    pub label_url: String,
}
