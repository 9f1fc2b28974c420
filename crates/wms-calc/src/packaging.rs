//! 包材決策表

use wms_core::{Dimensions, PackagingType, PackingConfig};

/// 計重用明細
#[derive(Debug, Clone, Copy)]
pub struct WeighedLine {
    pub quantity: i64,
    /// 商品目錄提供的單件重量（公克）
    pub unit_weight_grams: Option<u32>,
}

/// 包材計算器
pub struct PackagingCalculator;

impl PackagingCalculator {
    /// 估算總重：有真實重量時使用真實重量，否則以平均單件重量估算
    pub fn estimate_weight_grams(lines: &[WeighedLine], config: &PackingConfig) -> u64 {
        lines
            .iter()
            .map(|line| {
                let unit = line.unit_weight_grams.unwrap_or(config.default_unit_weight_grams);
                line.quantity.max(0) as u64 * unit as u64
            })
            .sum()
    }

    /// 依（件數, 總重）選擇包材
    ///
    /// 單件且輕量 → 信封；其餘依重量級距選小/中/大箱或棧板。
    pub fn select_packaging(item_count: i64, weight_grams: u64, config: &PackingConfig) -> PackagingType {
        if item_count == 1 && weight_grams <= config.envelope_max_grams {
            PackagingType::Envelope
        } else if weight_grams <= config.small_box_max_grams {
            PackagingType::SmallBox
        } else if weight_grams <= config.medium_box_max_grams {
            PackagingType::MediumBox
        } else if weight_grams <= config.large_box_max_grams {
            PackagingType::LargeBox
        } else {
            PackagingType::Pallet
        }
    }

    /// 依件數級距查外箱尺寸
    pub fn dimensions_for(item_count: i64) -> Dimensions {
        match item_count {
            i64::MIN..=1 => Dimensions::new(30, 20, 5),
            2..=3 => Dimensions::new(30, 25, 15),
            4..=10 => Dimensions::new(45, 35, 30),
            _ => Dimensions::new(60, 45, 40),
        }
    }
}
