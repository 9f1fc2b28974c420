//! 金額模型
//!
//! 內部一律以最小貨幣單位（分）的整數保存，只有在呈現時才轉成 `Decimal`。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

/// 金額（最小貨幣單位）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// 以最小單位建立（2500 = 25.00）
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// 以主單位建立（25 = 25.00）
    pub const fn from_major(major: i64) -> Self {
        Self(major * 100)
    }

    /// 最小單位數值
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// 轉為兩位小數的 Decimal（呈現用）
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// 乘以比例 `numerator / denominator`，半分四捨五入（遠離零）
    pub fn mul_ratio(self, numerator: i64, denominator: i64) -> Self {
        if denominator == 0 {
            return Self::ZERO;
        }
        let product = self.0 as i128 * numerator as i128;
        let den = denominator as i128;
        let quotient = product / den;
        let remainder = product % den;
        let rounded = if remainder.abs() * 2 >= den.abs() {
            if (product < 0) != (den < 0) {
                quotient - 1
            } else {
                quotient + 1
            }
        } else {
            quotient
        };
        Self(rounded as i64)
    }

    /// 乘以浮點係數（距離等連續量），四捨五入到最小單位
    pub fn mul_f64(self, factor: f64) -> Self {
        Self((self.0 as f64 * factor).round() as i64)
    }

    /// 加法，溢位時回傳 None
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// 乘以數量，溢位時回傳 None
    pub fn checked_mul(self, rhs: i64) -> Option<Money> {
        self.0.checked_mul(rhs).map(Money)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, rhs: i64) -> Money {
        Money(self.0.saturating_mul(rhs))
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.to_decimal())
    }
}
