//! 수수료 계산 모델
//!
//! 수수료 설정 스냅샷, 주문 금액, 계산 결과를 정의합니다.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::CommissionError;

/// 최소 수수료 상한
const MAX_MIN_AMOUNT: Decimal = Decimal::ONE_HUNDRED;
/// 고정 수수료 상한
const MAX_FIXED_FEE: i64 = 50;

/// 수수료 설정 스냅샷
///
/// 하나의 계산에 쓰이는 다섯 개 설정 값을 한 번에 묶어 전달합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionConfig {
    /// 수수료율 (퍼센트)
    pub rate_percent: Decimal,
    /// 배송비에도 수수료 적용 여부
    pub applies_to_shipping: bool,
    /// 최소 수수료
    pub min_amount: Decimal,
    /// 최대 수수료 (0 = 상한 없음)
    pub max_amount: Decimal,
    /// 주문당 고정 수수료
    pub fixed_fee: Decimal,
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self {
            rate_percent: Decimal::TEN,
            applies_to_shipping: false,
            min_amount: Decimal::ZERO,
            max_amount: Decimal::ZERO,
            fixed_fee: Decimal::ZERO,
        }
    }
}

impl CommissionConfig {
    /// 저장을 막아야 하는 범위 위반 검사
    pub fn validate(&self) -> Result<(), CommissionError> {
        if self.rate_percent < Decimal::ZERO || self.rate_percent > Decimal::ONE_HUNDRED {
            return Err(CommissionError::RateOutOfRange(self.rate_percent));
        }
        for (field, value) in [
            ("commission_min_amount", self.min_amount),
            ("commission_max_amount", self.max_amount),
            ("commission_fixed_fee", self.fixed_fee),
        ] {
            if value < Decimal::ZERO {
                return Err(CommissionError::NegativeAmount { field, value });
            }
        }
        if self.min_amount > MAX_MIN_AMOUNT {
            return Err(CommissionError::MinAboveLimit(self.min_amount));
        }
        if self.fixed_fee > Decimal::from(MAX_FIXED_FEE) {
            return Err(CommissionError::FixedFeeAboveLimit(self.fixed_fee));
        }
        Ok(())
    }

    /// 저장은 허용하되 관리자에게 알려야 하는 경고 목록
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.max_amount > Decimal::ZERO && self.min_amount >= self.max_amount {
            warnings.push(ConfigWarning::MinNotBelowMax {
                min_amount: self.min_amount,
                max_amount: self.max_amount,
            });
        }
        warnings
    }
}

/// 설정 경고
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigWarning {
    /// 최대 수수료가 최소 수수료보다 크지 않음
    MinNotBelowMax {
        min_amount: Decimal,
        max_amount: Decimal,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::MinNotBelowMax { min_amount, max_amount } => write!(
                f,
                "최대 수수료({})는 최소 수수료({})보다 커야 합니다",
                max_amount, min_amount
            ),
        }
    }
}

/// 주문 금액
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAmounts {
    /// 상품 합계
    pub product_total: Decimal,
    /// 배송비 합계
    pub shipping_total: Decimal,
}

impl OrderAmounts {
    pub fn new(product_total: Decimal, shipping_total: Decimal) -> Self {
        Self { product_total, shipping_total }
    }

    /// 상품 + 배송비
    pub fn gross(&self) -> Result<Decimal, CommissionError> {
        self.product_total
            .checked_add(self.shipping_total)
            .ok_or(CommissionError::AmountOverflow)
    }
}

/// 적용된 상/하한
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clamp {
    None,
    Min,
    Max,
}

impl Clamp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Clamp::None => "none",
            Clamp::Min => "min",
            Clamp::Max => "max",
        }
    }
}

impl FromStr for Clamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Clamp::None),
            "min" => Ok(Clamp::Min),
            "max" => Ok(Clamp::Max),
            other => Err(format!("알 수 없는 상/하한: {}", other)),
        }
    }
}

/// 수수료 계산 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionBreakdown {
    /// 수수료율이 적용된 기준 금액
    pub base: Decimal,
    /// 상/하한 적용 후 비율 수수료
    pub percentage_fee: Decimal,
    /// 고정 수수료
    pub fixed_fee: Decimal,
    /// 총 수수료
    pub commission: Decimal,
    /// 판매자 정산액
    pub seller_receives: Decimal,
    /// 적용된 상/하한
    pub clamp: Clamp,
}

impl CommissionBreakdown {
    /// 표시용으로 소수점 둘째 자리 반올림한 사본
    pub fn rounded(&self) -> Self {
        let r = |v: Decimal| v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Self {
            base: r(self.base),
            percentage_fee: r(self.percentage_fee),
            fixed_fee: r(self.fixed_fee),
            commission: r(self.commission),
            seller_receives: r(self.seller_receives),
            clamp: self.clamp,
        }
    }
}
