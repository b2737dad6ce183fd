//! 시스템 설정
//!
//! 관리자 콘솔이 소유하는 키/값 설정을 읽어 타입이 있는 설정 객체로 변환합니다.
//! 계산기는 설정을 직접 읽지 않고, 여기서 만든 스냅샷을 인자로 받습니다.

pub mod service;

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::commission::model::CommissionConfig;
use crate::error::SettingsError;

pub use service::{SettingUpdate, SettingsService};

/// 설정 키
pub mod keys {
    pub const GLOBAL_COMMISSION_RATE: &str = "global_commission_rate";
    pub const COMMISSION_APPLIES_TO_SHIPPING: &str = "commission_applies_to_shipping";
    pub const COMMISSION_MIN_AMOUNT: &str = "commission_min_amount";
    pub const COMMISSION_MAX_AMOUNT: &str = "commission_max_amount";
    pub const COMMISSION_FIXED_FEE: &str = "commission_fixed_fee";

    pub const SELLER_MONTHLY_CREDIT_PRICE: &str = "seller_monthly_credit_price";
    pub const SELLER_CREDIT_GRACE_PERIOD_DAYS: &str = "seller_credit_grace_period_days";
    pub const SELLER_MIN_CREDIT_PURCHASE: &str = "seller_min_credit_purchase";
    pub const SELLER_MAX_CREDIT_PURCHASE: &str = "seller_max_credit_purchase";
    pub const SELLER_LOW_CREDIT_WARNING_THRESHOLD: &str = "seller_low_credit_warning_threshold";

    pub const PAYOUT_MINIMUM_AMOUNT: &str = "payout_minimum_amount";

    pub const COMMISSION_KEYS: [&str; 5] = [
        GLOBAL_COMMISSION_RATE,
        COMMISSION_APPLIES_TO_SHIPPING,
        COMMISSION_MIN_AMOUNT,
        COMMISSION_MAX_AMOUNT,
        COMMISSION_FIXED_FEE,
    ];

    pub const CREDIT_KEYS: [&str; 5] = [
        SELLER_MONTHLY_CREDIT_PRICE,
        SELLER_CREDIT_GRACE_PERIOD_DAYS,
        SELLER_MIN_CREDIT_PURCHASE,
        SELLER_MAX_CREDIT_PURCHASE,
        SELLER_LOW_CREDIT_WARNING_THRESHOLD,
    ];

    pub const PAYOUT_KEYS: [&str; 1] = [PAYOUT_MINIMUM_AMOUNT];
}

/// 한 번의 조회로 읽은 설정 값 묶음
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsSnapshot {
    values: HashMap<String, Value>,
}

impl SettingsSnapshot {
    pub fn new(values: HashMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// 값 하나를 바꾼 사본 (저장 전 검증용)
    pub fn with_value(&self, key: &str, value: Value) -> Self {
        let mut values = self.values.clone();
        values.insert(key.to_string(), value);
        Self { values }
    }

    /// 숫자 또는 숫자 문자열을 Decimal로 읽기
    pub fn decimal(&self, key: &str, default: Decimal) -> Result<Decimal, SettingsError> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => parse_decimal(key, value),
        }
    }

    /// bool 또는 "true"/"false" 문자열 읽기
    pub fn boolean(&self, key: &str, default: bool) -> Result<bool, SettingsError> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(invalid(key, "불리언 값이 아닙니다")),
            },
            Some(_) => Err(invalid(key, "불리언 값이 아닙니다")),
        }
    }

    /// 정수 읽기
    pub fn integer(&self, key: &str, default: i64) -> Result<i64, SettingsError> {
        let value = self.decimal(key, Decimal::from(default))?;
        if !value.fract().is_zero() {
            return Err(invalid(key, "정수 값이 아닙니다"));
        }
        value.to_i64().ok_or_else(|| invalid(key, "정수 범위를 벗어났습니다"))
    }
}

fn parse_decimal(key: &str, value: &Value) -> Result<Decimal, SettingsError> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(invalid(key, "숫자 값이 아닙니다")),
    };
    text.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| invalid(key, "숫자 값이 아닙니다"))
}

fn invalid(key: &str, reason: &str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

impl CommissionConfig {
    /// 설정 스냅샷에서 수수료 설정 구성 (없는 키는 기본값)
    pub fn from_snapshot(snapshot: &SettingsSnapshot) -> Result<Self, SettingsError> {
        let defaults = CommissionConfig::default();
        Ok(Self {
            rate_percent: snapshot.decimal(keys::GLOBAL_COMMISSION_RATE, defaults.rate_percent)?,
            applies_to_shipping: snapshot
                .boolean(keys::COMMISSION_APPLIES_TO_SHIPPING, defaults.applies_to_shipping)?,
            min_amount: snapshot.decimal(keys::COMMISSION_MIN_AMOUNT, defaults.min_amount)?,
            max_amount: snapshot.decimal(keys::COMMISSION_MAX_AMOUNT, defaults.max_amount)?,
            fixed_fee: snapshot.decimal(keys::COMMISSION_FIXED_FEE, defaults.fixed_fee)?,
        })
    }
}

/// 유예 기간 상한 (일)
pub const MAX_GRACE_PERIOD_DAYS: i64 = 365;

/// 판매 크레딧 관련 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditSettings {
    /// 1개월 크레딧 가격 (USD)
    pub price_per_month: Decimal,
    pub grace_period_days: i64,
    pub min_purchase_months: i64,
    pub max_purchase_months: i64,
    pub low_credit_threshold: i64,
}

impl Default for CreditSettings {
    fn default() -> Self {
        Self {
            price_per_month: Decimal::new(2999, 2),
            grace_period_days: 3,
            min_purchase_months: 1,
            max_purchase_months: 12,
            low_credit_threshold: 2,
        }
    }
}

impl CreditSettings {
    pub fn from_snapshot(snapshot: &SettingsSnapshot) -> Result<Self, SettingsError> {
        let defaults = CreditSettings::default();
        Ok(Self {
            price_per_month: snapshot.decimal(keys::SELLER_MONTHLY_CREDIT_PRICE, defaults.price_per_month)?,
            grace_period_days: snapshot.integer(keys::SELLER_CREDIT_GRACE_PERIOD_DAYS, defaults.grace_period_days)?,
            min_purchase_months: snapshot.integer(keys::SELLER_MIN_CREDIT_PURCHASE, defaults.min_purchase_months)?,
            max_purchase_months: snapshot.integer(keys::SELLER_MAX_CREDIT_PURCHASE, defaults.max_purchase_months)?,
            low_credit_threshold: snapshot
                .integer(keys::SELLER_LOW_CREDIT_WARNING_THRESHOLD, defaults.low_credit_threshold)?,
        })
    }

    /// 저장 전 범위 검사
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.price_per_month <= Decimal::ZERO {
            return Err(invalid(keys::SELLER_MONTHLY_CREDIT_PRICE, "가격은 0보다 커야 합니다"));
        }
        if !(0..=MAX_GRACE_PERIOD_DAYS).contains(&self.grace_period_days) {
            return Err(invalid(
                keys::SELLER_CREDIT_GRACE_PERIOD_DAYS,
                "유예 기간은 0일 이상 365일 이하여야 합니다",
            ));
        }
        if self.min_purchase_months < 1 {
            return Err(invalid(keys::SELLER_MIN_CREDIT_PURCHASE, "최소 구매 개월 수는 1 이상이어야 합니다"));
        }
        if self.max_purchase_months < self.min_purchase_months {
            return Err(invalid(
                keys::SELLER_MAX_CREDIT_PURCHASE,
                "최대 구매 개월 수는 최소 구매 개월 수 이상이어야 합니다",
            ));
        }
        if self.low_credit_threshold < 0 {
            return Err(invalid(keys::SELLER_LOW_CREDIT_WARNING_THRESHOLD, "임계값은 음수일 수 없습니다"));
        }
        Ok(())
    }
}

/// 판매자 정산 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutSettings {
    /// 이 금액보다 작은 정산 묶음은 만들지 않음
    pub minimum_amount: Decimal,
}

impl Default for PayoutSettings {
    fn default() -> Self {
        Self {
            minimum_amount: Decimal::new(50, 0),
        }
    }
}

impl PayoutSettings {
    pub fn from_snapshot(snapshot: &SettingsSnapshot) -> Result<Self, SettingsError> {
        let defaults = PayoutSettings::default();
        Ok(Self {
            minimum_amount: snapshot.decimal(keys::PAYOUT_MINIMUM_AMOUNT, defaults.minimum_amount)?,
        })
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.minimum_amount < Decimal::ZERO {
            return Err(invalid(keys::PAYOUT_MINIMUM_AMOUNT, "최소 정산 금액은 음수일 수 없습니다"));
        }
        Ok(())
    }
}
