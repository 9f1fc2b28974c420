//! 波次規劃
//!
//! 待履約訂單依優先級（高到低）與派倉時間（先進先出）排序後切成固定上限的波次，
//! 切分邊界遵守優先級分組，一個波次不會混合兩種優先級。
//! 揀貨單依（區域, 儲位）排序：每個區域只走一次，區域內儲位遞增，避免走回頭路。

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use wms_core::{BinLocation, PickListLine, PickingWave, Priority, ReservedLine};

/// 可排入波次的訂單
#[derive(Debug, Clone)]
pub struct WaveCandidate {
    pub order_id: String,
    pub priority: Priority,
    pub routed_at: DateTime<Utc>,
    /// 待揀明細（已保留的數量）
    pub lines: Vec<ReservedLine>,
}

/// 波次規劃器
pub struct WavePlanner;

impl WavePlanner {
    /// 規劃波次
    pub fn plan(
        warehouse_id: &str,
        mut candidates: Vec<WaveCandidate>,
        max_wave_size: usize,
        locations: &HashMap<String, BinLocation>,
    ) -> Vec<PickingWave> {
        if candidates.is_empty() || max_wave_size == 0 {
            return Vec::new();
        }

        Self::sort_candidates(&mut candidates);

        let mut waves = Vec::new();
        for group in Self::group_by_priority(candidates) {
            for chunk in group.chunks(max_wave_size) {
                let priority = chunk[0].priority;
                let order_ids = chunk.iter().map(|c| c.order_id.clone()).collect();
                let pick_list =
                    Self::build_pick_list(chunk.iter().flat_map(|c| c.lines.iter()), locations);

                waves.push(PickingWave::new(
                    warehouse_id.to_string(),
                    priority,
                    order_ids,
                    pick_list,
                ));
            }
        }

        tracing::debug!("倉庫 {} 規劃波次 {} 個", warehouse_id, waves.len());
        waves
    }

    /// 排序：優先級由高到低，同級依派倉時間先進先出，再依訂單ID
    pub fn sort_candidates(candidates: &mut [WaveCandidate]) {
        candidates.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.routed_at.cmp(&b.routed_at))
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
    }

    /// 按優先級分組（輸入需已排序）
    fn group_by_priority(candidates: Vec<WaveCandidate>) -> Vec<Vec<WaveCandidate>> {
        let mut groups: Vec<Vec<WaveCandidate>> = Vec::new();
        for candidate in candidates {
            match groups.last_mut() {
                Some(group) if group[0].priority == candidate.priority => group.push(candidate),
                _ => groups.push(vec![candidate]),
            }
        }
        groups
    }

    /// 彙總揀貨單：同物料數量加總，依（區域, 儲位）遞增排序，無儲位者排最後
    pub fn build_pick_list<'a>(
        lines: impl IntoIterator<Item = &'a ReservedLine>,
        locations: &HashMap<String, BinLocation>,
    ) -> Vec<PickListLine> {
        let mut totals: BTreeMap<&str, i64> = BTreeMap::new();
        for line in lines {
            *totals.entry(line.product_id.as_str()).or_insert(0) += line.quantity;
        }

        let mut pick_list: Vec<PickListLine> = totals
            .into_iter()
            .filter(|(_, quantity)| *quantity > 0)
            .map(|(product_id, quantity)| PickListLine {
                product_id: product_id.to_string(),
                quantity,
                location: locations.get(product_id).cloned(),
            })
            .collect();

        pick_list.sort_by(|a, b| {
            a.location
                .is_none()
                .cmp(&b.location.is_none())
                .then_with(|| a.location.cmp(&b.location))
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        pick_list
    }
}
