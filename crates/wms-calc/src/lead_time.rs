//! 交期計算

use chrono::{DateTime, Days, NaiveDate, Utc};

/// 交期計算器
pub struct LeadTimeCalculator;

impl LeadTimeCalculator {
    /// 運輸天數 = ceil(距離 / 平均每日距離)
    pub fn transit_days(distance_km: f64, average_km_per_day: f64) -> u32 {
        if distance_km <= 0.0 || average_km_per_day <= 0.0 {
            return 0;
        }
        (distance_km / average_km_per_day).ceil() as u32
    }

    /// 出貨日：派倉時間的隔天
    pub fn ship_date(routed_at: DateTime<Utc>) -> NaiveDate {
        let today = routed_at.date_naive();
        today.checked_add_days(Days::new(1)).unwrap_or(today)
    }

    /// 到貨日：出貨日 + 運輸天數
    pub fn delivery_date(ship_date: NaiveDate, transit_days: u32) -> NaiveDate {
        ship_date
            .checked_add_days(Days::new(transit_days as u64))
            .unwrap_or(ship_date)
    }
}
