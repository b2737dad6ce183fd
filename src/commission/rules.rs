//! 수수료 규칙 선택
//!
//! 판매자 오버라이드 > 일반 규칙(판매자/카테고리/기본) 순으로
//! 적용할 규칙 하나를 고릅니다.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::model::CommissionConfig;
use crate::error::CommissionError;

/// 규칙 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    /// 비율 수수료
    Percentage,
    /// 주문당 고정 금액
    Fixed,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Percentage => "PERCENTAGE",
            RuleType::Fixed => "FIXED",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = CommissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PERCENTAGE" => Ok(RuleType::Percentage),
            "FIXED" => Ok(RuleType::Fixed),
            other => Err(CommissionError::InvalidRule(format!("알 수 없는 규칙 타입: {}", other))),
        }
    }
}

/// 수수료 규칙
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRule {
    pub id: String,
    pub seller_id: Option<String>,
    pub category_id: Option<String>,
    pub rule_type: RuleType,
    pub value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_order_value: Option<Decimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub priority: i64,
    pub is_active: bool,
    /// 판매자 전용 오버라이드 여부
    pub is_override: bool,
    pub created_at: DateTime<Utc>,
}

impl CommissionRule {
    /// 활성 상태, 유효 기간, 주문 금액 범위 검사
    fn is_applicable(&self, order_amount: Decimal, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.valid_from.map_or(true, |from| from <= now)
            && self.valid_until.map_or(true, |until| until >= now)
            && self.min_order_value.map_or(true, |min| min <= order_amount)
            && self.max_order_value.map_or(true, |max| max >= order_amount)
    }

    /// 규칙 값 검증
    pub fn validate(&self) -> Result<(), CommissionError> {
        if self.value < Decimal::ZERO {
            return Err(CommissionError::InvalidRule("규칙 값은 음수일 수 없습니다".into()));
        }
        if self.rule_type == RuleType::Percentage && self.value > Decimal::ONE_HUNDRED {
            return Err(CommissionError::RateOutOfRange(self.value));
        }
        if let (Some(min), Some(max)) = (self.min_order_value, self.max_order_value) {
            if min > max {
                return Err(CommissionError::InvalidRule(
                    "최소 주문 금액이 최대 주문 금액보다 큽니다".into(),
                ));
            }
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until) {
            if from > until {
                return Err(CommissionError::InvalidRule("유효 기간이 잘못되었습니다".into()));
            }
        }
        if self.is_override && self.seller_id.is_none() {
            return Err(CommissionError::InvalidRule("오버라이드에는 판매자 ID가 필요합니다".into()));
        }
        Ok(())
    }
}

/// 규칙 선택 대상
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub seller_id: &'a str,
    pub category_id: Option<&'a str>,
    pub order_amount: Decimal,
}

/// 적용할 규칙 선택
///
/// 오버라이드는 같은 판매자이면서 카테고리가 일치하거나 비어 있을 때 적용되고,
/// 우선순위가 높은 것부터 고릅니다. 일반 규칙은 판매자, 카테고리, 기본 규칙
/// (둘 다 없음) 중 하나에 해당하면 후보가 되며 우선순위 내림차순, 생성 시각
/// 내림차순으로 정렬합니다.
pub fn resolve_rule<'r>(
    rules: &'r [CommissionRule],
    ctx: &RuleContext<'_>,
    now: DateTime<Utc>,
) -> Option<&'r CommissionRule> {
    let seller_matches = |rule: &CommissionRule| rule.seller_id.as_deref() == Some(ctx.seller_id);
    let category_matches =
        |rule: &CommissionRule| rule.category_id.is_some() && rule.category_id.as_deref() == ctx.category_id;

    let override_rule = rules
        .iter()
        .filter(|r| r.is_override && r.is_applicable(ctx.order_amount, now))
        .filter(|r| seller_matches(*r) && (r.category_id.is_none() || category_matches(*r)))
        .max_by_key(|r| r.priority);

    if override_rule.is_some() {
        return override_rule;
    }

    rules
        .iter()
        .filter(|r| !r.is_override && r.is_applicable(ctx.order_amount, now))
        .filter(|r| {
            seller_matches(*r) || category_matches(*r) || (r.seller_id.is_none() && r.category_id.is_none())
        })
        .max_by(|a, b| a.priority.cmp(&b.priority).then(a.created_at.cmp(&b.created_at)))
}

impl CommissionConfig {
    /// 규칙을 반영한 설정 사본
    ///
    /// 고정 규칙은 주문당 정액 수수료가 되도록 비율과 상/하한을 0으로 둡니다.
    pub fn with_rule(&self, rule: &CommissionRule) -> CommissionConfig {
        match rule.rule_type {
            RuleType::Percentage => CommissionConfig {
                rate_percent: rule.value,
                ..self.clone()
            },
            RuleType::Fixed => CommissionConfig {
                rate_percent: Decimal::ZERO,
                applies_to_shipping: self.applies_to_shipping,
                min_amount: Decimal::ZERO,
                max_amount: Decimal::ZERO,
                fixed_fee: rule.value,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commission::evaluator::compute_commission;
    use crate::commission::model::OrderAmounts;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn rule(id: &str, seller: Option<&str>, category: Option<&str>, value: Decimal, priority: i64) -> CommissionRule {
        CommissionRule {
            id: id.to_string(),
            seller_id: seller.map(str::to_string),
            category_id: category.map(str::to_string),
            rule_type: RuleType::Percentage,
            value,
            min_order_value: None,
            max_order_value: None,
            valid_from: None,
            valid_until: None,
            priority,
            is_active: true,
            is_override: false,
            created_at: Utc::now(),
        }
    }

    fn ctx<'a>(seller: &'a str, category: Option<&'a str>, amount: Decimal) -> RuleContext<'a> {
        RuleContext {
            seller_id: seller,
            category_id: category,
            order_amount: amount,
        }
    }

    #[test]
    fn test_override_beats_higher_priority_rules() {
        let mut ov = rule("override", Some("seller-1"), None, dec!(3), 1);
        ov.is_override = true;
        let rules = vec![rule("category", None, Some("shoes"), dec!(8), 500), ov];

        let picked = resolve_rule(&rules, &ctx("seller-1", Some("shoes"), dec!(100)), Utc::now());
        assert_eq!(picked.map(|r| r.id.as_str()), Some("override"));
    }

    #[test]
    fn test_override_for_other_category_is_skipped() {
        let mut ov = rule("override", Some("seller-1"), Some("bags"), dec!(3), 100);
        ov.is_override = true;
        let rules = vec![ov, rule("default", None, None, dec!(12), 0)];

        let picked = resolve_rule(&rules, &ctx("seller-1", Some("shoes"), dec!(100)), Utc::now());
        assert_eq!(picked.map(|r| r.id.as_str()), Some("default"));
    }

    #[test]
    fn test_priority_then_newest() {
        let now = Utc::now();
        let mut older = rule("older", None, None, dec!(10), 5);
        older.created_at = now - Duration::days(2);
        let mut newer = rule("newer", None, None, dec!(9), 5);
        newer.created_at = now - Duration::days(1);
        let low = rule("seller-low", Some("seller-1"), None, dec!(1), 1);

        let rules = vec![older, newer, low];
        let picked = resolve_rule(&rules, &ctx("seller-1", None, dec!(50)), now);
        assert_eq!(picked.map(|r| r.id.as_str()), Some("newer"));
    }

    #[test]
    fn test_other_seller_rule_ignored() {
        let rules = vec![rule("seller-2", Some("seller-2"), None, dec!(1), 10)];
        assert!(resolve_rule(&rules, &ctx("seller-1", None, dec!(10)), Utc::now()).is_none());
    }

    #[test]
    fn test_validity_window_and_order_range() {
        let now = Utc::now();
        let mut expired = rule("expired", None, None, dec!(1), 10);
        expired.valid_until = Some(now - Duration::hours(1));
        let mut big_orders = rule("big", None, None, dec!(2), 9);
        big_orders.min_order_value = Some(dec!(500));
        let mut inactive = rule("inactive", None, None, dec!(3), 8);
        inactive.is_active = false;
        let fallback = rule("fallback", None, None, dec!(4), 0);

        let rules = vec![expired, big_orders, inactive, fallback];
        let small = resolve_rule(&rules, &ctx("s", None, dec!(100)), now);
        assert_eq!(small.map(|r| r.id.as_str()), Some("fallback"));

        let large = resolve_rule(&rules, &ctx("s", None, dec!(500)), now);
        assert_eq!(large.map(|r| r.id.as_str()), Some("big"));
    }

    #[test]
    fn test_fixed_rule_becomes_flat_fee() {
        let base = CommissionConfig {
            rate_percent: dec!(10),
            applies_to_shipping: true,
            min_amount: dec!(1),
            max_amount: dec!(30),
            fixed_fee: dec!(0.3),
        };
        let mut fixed = rule("fixed", None, None, dec!(7), 0);
        fixed.rule_type = RuleType::Fixed;

        let cfg = base.with_rule(&fixed);
        let result = compute_commission(&OrderAmounts::new(dec!(1000), dec!(40)), &cfg).unwrap();
        assert_eq!(result.commission, dec!(7));
        assert_eq!(result.seller_receives, dec!(1033));
    }

    #[test]
    fn test_percentage_rule_keeps_caps() {
        let base = CommissionConfig {
            max_amount: dec!(30),
            ..CommissionConfig::default()
        };
        let cfg = base.with_rule(&rule("pct", None, None, dec!(5), 0));
        let result = compute_commission(&OrderAmounts::new(dec!(1000), dec!(0)), &cfg).unwrap();
        assert_eq!(result.commission, dec!(30));
    }

    #[test]
    fn test_rule_validation() {
        let mut r = rule("bad", None, None, dec!(150), 0);
        assert!(r.validate().is_err());
        r.value = dec!(10);
        r.min_order_value = Some(dec!(100));
        r.max_order_value = Some(dec!(10));
        assert!(r.validate().is_err());
        r.max_order_value = None;
        assert!(r.validate().is_ok());
        r.is_override = true;
        assert!(r.validate().is_err());
    }
}
