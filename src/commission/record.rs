//! 주문 수수료 기록
//!
//! 결제가 끝난 주문 항목마다 수수료 계산 결과를 한 건씩 남깁니다.
//! 판매자 요약과 관리자 통계는 이 기록을 상태별로 합산해 만듭니다.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::model::Clamp;
use crate::error::CommissionError;

/// 수수료 기록 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionStatus {
    /// 결제 확정 전
    Pending,
    /// 결제 확정, 정산 대상
    Confirmed,
    /// 판매자에게 지급 완료
    Paid,
    /// 주문 취소
    Cancelled,
}

impl CommissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "PENDING",
            CommissionStatus::Confirmed => "CONFIRMED",
            CommissionStatus::Paid => "PAID",
            CommissionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for CommissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(CommissionStatus::Pending),
            "CONFIRMED" => Ok(CommissionStatus::Confirmed),
            "PAID" => Ok(CommissionStatus::Paid),
            "CANCELLED" => Ok(CommissionStatus::Cancelled),
            other => Err(format!("알 수 없는 수수료 상태: {}", other)),
        }
    }
}

/// 정산할 주문 항목
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementItem {
    pub order_item_id: String,
    pub seller_id: String,
    pub store_id: String,
    pub category_id: Option<String>,
    pub product_total: Decimal,
    #[serde(default)]
    pub shipping_total: Decimal,
}

fn default_captured() -> bool {
    true
}

/// 주문 정산 요청
#[derive(Debug, Clone, Deserialize)]
pub struct OrderSettlement {
    pub order_id: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// 결제가 이미 확정됐으면 `CONFIRMED`, 아니면 `PENDING`으로 기록
    #[serde(default = "default_captured")]
    pub payment_captured: bool,
    pub items: Vec<SettlementItem>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// 주문 항목 하나의 수수료 기록
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionEntry {
    pub id: String,
    pub order_id: String,
    pub order_item_id: String,
    pub seller_id: String,
    pub store_id: String,
    pub rule_id: Option<String>,
    pub order_amount: Decimal,
    pub shipping_amount: Decimal,
    pub commission_amount: Decimal,
    pub seller_receives: Decimal,
    pub clamp: Clamp,
    pub currency: String,
    pub status: CommissionStatus,
    pub payout_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CommissionEntry {
    /// 정산 묶음에 넣을 수 있는 기록
    pub fn is_payable(&self) -> bool {
        self.status == CommissionStatus::Confirmed && self.payout_id.is_none()
    }
}

/// 상태별 합계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTotal {
    pub count: i64,
    pub commission_amount: Decimal,
    pub seller_receives: Decimal,
}

impl StatusTotal {
    fn add(&mut self, entry: &CommissionEntry) -> Result<(), CommissionError> {
        self.count += 1;
        self.commission_amount = self
            .commission_amount
            .checked_add(entry.commission_amount)
            .ok_or(CommissionError::AmountOverflow)?;
        self.seller_receives = self
            .seller_receives
            .checked_add(entry.seller_receives)
            .ok_or(CommissionError::AmountOverflow)?;
        Ok(())
    }
}

/// 판매자 수수료 요약
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SellerCommissionSummary {
    pub seller_id: String,
    pub total: StatusTotal,
    pub pending: StatusTotal,
    pub confirmed: StatusTotal,
    pub paid: StatusTotal,
    pub cancelled: StatusTotal,
    /// 아직 정산 묶음에 들어가지 않은 확정 금액
    pub available_for_payout: Decimal,
}

/// 관리자용 수수료 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommissionStatistics {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub total: StatusTotal,
    pub total_order_amount: Decimal,
    pub pending: StatusTotal,
    pub confirmed: StatusTotal,
    pub paid: StatusTotal,
    pub cancelled: StatusTotal,
}

/// 판매자 기록을 상태별로 합산
///
/// 취소된 기록은 `total`에 넣지 않습니다.
pub fn summarize_seller(seller_id: &str, entries: &[CommissionEntry]) -> Result<SellerCommissionSummary, CommissionError> {
    let mut summary = SellerCommissionSummary {
        seller_id: seller_id.to_string(),
        ..Default::default()
    };

    for entry in entries {
        match entry.status {
            CommissionStatus::Pending => summary.pending.add(entry)?,
            CommissionStatus::Confirmed => summary.confirmed.add(entry)?,
            CommissionStatus::Paid => summary.paid.add(entry)?,
            CommissionStatus::Cancelled => {
                summary.cancelled.add(entry)?;
                continue;
            }
        }
        summary.total.add(entry)?;
        if entry.is_payable() {
            summary.available_for_payout = summary
                .available_for_payout
                .checked_add(entry.seller_receives)
                .ok_or(CommissionError::AmountOverflow)?;
        }
    }

    Ok(summary)
}

/// 기간 내 기록 전체 통계
pub fn statistics(
    entries: &[CommissionEntry],
    from: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> Result<CommissionStatistics, CommissionError> {
    let mut stats = CommissionStatistics {
        from,
        until,
        ..Default::default()
    };

    for entry in entries {
        match entry.status {
            CommissionStatus::Pending => stats.pending.add(entry)?,
            CommissionStatus::Confirmed => stats.confirmed.add(entry)?,
            CommissionStatus::Paid => stats.paid.add(entry)?,
            CommissionStatus::Cancelled => {
                stats.cancelled.add(entry)?;
                continue;
            }
        }
        stats.total.add(entry)?;
        stats.total_order_amount = stats
            .total_order_amount
            .checked_add(entry.order_amount)
            .and_then(|v| v.checked_add(entry.shipping_amount))
            .ok_or(CommissionError::AmountOverflow)?;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn entry(id: &str, status: CommissionStatus, commission: Decimal, receives: Decimal) -> CommissionEntry {
        CommissionEntry {
            id: id.to_string(),
            order_id: "order-1".into(),
            order_item_id: format!("item-{}", id),
            seller_id: "seller-1".into(),
            store_id: "store-1".into(),
            rule_id: None,
            order_amount: commission + receives,
            shipping_amount: dec!(0),
            commission_amount: commission,
            seller_receives: receives,
            clamp: Clamp::None,
            currency: "USD".into(),
            status,
            payout_id: None,
            paid_at: None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            CommissionStatus::Pending,
            CommissionStatus::Confirmed,
            CommissionStatus::Paid,
            CommissionStatus::Cancelled,
        ] {
            assert_eq!(CommissionStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(CommissionStatus::from_str("REFUNDED").is_err());
    }

    #[test]
    fn test_seller_summary_excludes_cancelled_from_total() {
        let mut linked = entry("c", CommissionStatus::Confirmed, dec!(3), dec!(27));
        linked.payout_id = Some("payout-1".into());

        let entries = vec![
            entry("a", CommissionStatus::Pending, dec!(1), dec!(9)),
            entry("b", CommissionStatus::Confirmed, dec!(2), dec!(18)),
            linked,
            entry("d", CommissionStatus::Paid, dec!(4), dec!(36)),
            entry("e", CommissionStatus::Cancelled, dec!(5), dec!(45)),
        ];

        let summary = summarize_seller("seller-1", &entries).unwrap();
        assert_eq!(summary.total.count, 4);
        assert_eq!(summary.total.commission_amount, dec!(10));
        assert_eq!(summary.confirmed.count, 2);
        assert_eq!(summary.cancelled.commission_amount, dec!(5));
        assert_eq!(summary.available_for_payout, dec!(18));
    }

    #[test]
    fn test_statistics_sum_order_amounts() {
        let mut shipped = entry("a", CommissionStatus::Paid, dec!(10), dec!(95));
        shipped.shipping_amount = dec!(5);
        shipped.order_amount = dec!(100);

        let entries = vec![shipped, entry("b", CommissionStatus::Cancelled, dec!(1), dec!(9))];
        let stats = statistics(&entries, None, None).unwrap();
        assert_eq!(stats.total.count, 1);
        assert_eq!(stats.total_order_amount, dec!(105));
        assert_eq!(stats.paid.seller_receives, dec!(95));
        assert_eq!(stats.cancelled.count, 1);
    }

    #[test]
    fn test_summary_overflow_is_reported() {
        let entries = vec![
            entry("a", CommissionStatus::Confirmed, Decimal::MAX, dec!(0)),
            entry("b", CommissionStatus::Confirmed, Decimal::MAX, dec!(0)),
        ];
        assert_eq!(
            summarize_seller("seller-1", &entries),
            Err(CommissionError::AmountOverflow)
        );
    }
}
