//! 倉庫與區域模型

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::GeoPoint;

/// 區域類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    Receiving,
    Storage,
    Picking,
    Packing,
    Shipping,
    Returns,
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ZoneType::Receiving => "receiving",
            ZoneType::Storage => "storage",
            ZoneType::Picking => "picking",
            ZoneType::Packing => "packing",
            ZoneType::Shipping => "shipping",
            ZoneType::Returns => "returns",
        };
        f.write_str(s)
    }
}

/// 區域
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// 區域代碼（倉內唯一）
    pub code: String,

    /// 區域類型
    pub zone_type: ZoneType,

    /// 容量
    pub capacity: u32,

    /// 目前負載
    pub current_load: u32,
}

impl Zone {
    pub fn new(code: impl Into<String>, zone_type: ZoneType, capacity: u32) -> Self {
        Self {
            code: code.into(),
            zone_type,
            capacity,
            current_load: 0,
        }
    }

    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 1.0;
        }
        self.current_load as f64 / self.capacity as f64
    }
}

/// 倉庫
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    /// 倉庫ID
    pub id: String,

    /// 名稱
    pub name: String,

    /// 座標
    pub location: GeoPoint,

    /// 總容量
    pub capacity: u32,

    /// 已使用容量
    pub utilized: u32,

    /// 區域（有序）
    pub zones: Vec<Zone>,

    /// 是否參與派倉
    pub active: bool,
}

impl Warehouse {
    /// 創建新的倉庫
    pub fn new(id: impl Into<String>, location: GeoPoint, capacity: u32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            location,
            capacity,
            utilized: 0,
            zones: Vec::new(),
            active: true,
        }
    }

    /// 建構器模式：設置名稱
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 建構器模式：設置已使用容量
    pub fn with_utilized(mut self, utilized: u32) -> Self {
        self.utilized = utilized;
        self
    }

    /// 建構器模式：加入區域
    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zones.push(zone);
        self
    }

    /// 建構器模式：停用
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// 使用率回報
    pub fn report_utilization(&mut self, utilized: u32) {
        self.utilized = utilized;
    }

    /// 容量使用率（容量為 0 視為滿載）
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 1.0;
        }
        self.utilized as f64 / self.capacity as f64
    }

    pub fn zone(&self, code: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.code == code)
    }

    pub fn zones_of_type(&self, zone_type: ZoneType) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(move |z| z.zone_type == zone_type)
    }
}
