use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::commission::record::CommissionEntry;

/// 정산 상태
///
/// `PENDING → PROCESSING → COMPLETED`가 정상 흐름이고,
/// 완료 전에는 `FAILED` 또는 `CANCELLED`로 끝날 수 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "PENDING",
            PayoutStatus::Processing => "PROCESSING",
            PayoutStatus::Completed => "COMPLETED",
            PayoutStatus::Failed => "FAILED",
            PayoutStatus::Cancelled => "CANCELLED",
        }
    }

    /// 더 이상 바뀌지 않는 상태
    pub fn is_terminal(&self) -> bool {
        matches!(self, PayoutStatus::Completed | PayoutStatus::Failed | PayoutStatus::Cancelled)
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PayoutStatus::Pending),
            "PROCESSING" => Ok(PayoutStatus::Processing),
            "COMPLETED" => Ok(PayoutStatus::Completed),
            "FAILED" => Ok(PayoutStatus::Failed),
            "CANCELLED" => Ok(PayoutStatus::Cancelled),
            other => Err(format!("알 수 없는 정산 상태: {}", other)),
        }
    }
}

/// 정산 상태 전이
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutAction {
    Process,
    Complete,
    Fail,
    Cancel,
}

impl PayoutAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutAction::Process => "process",
            PayoutAction::Complete => "complete",
            PayoutAction::Fail => "fail",
            PayoutAction::Cancel => "cancel",
        }
    }

    /// 현재 상태에서의 다음 상태 (`None`이면 허용되지 않는 전이)
    pub fn next(&self, from: PayoutStatus) -> Option<PayoutStatus> {
        match (self, from) {
            (PayoutAction::Process, PayoutStatus::Pending) => Some(PayoutStatus::Processing),
            (PayoutAction::Complete, PayoutStatus::Pending | PayoutStatus::Processing) => Some(PayoutStatus::Completed),
            (PayoutAction::Fail, PayoutStatus::Pending | PayoutStatus::Processing) => Some(PayoutStatus::Failed),
            (PayoutAction::Cancel, PayoutStatus::Pending | PayoutStatus::Processing) => Some(PayoutStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for PayoutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 정산 묶음
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub id: String,
    pub seller_id: String,
    pub store_id: String,
    /// 묶인 수수료 기록의 판매자 정산액 합계
    pub amount: Decimal,
    pub currency: String,
    pub commission_count: i64,
    pub payment_method: String,
    pub payment_reference: Option<String>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub notes: Option<String>,
    pub status: PayoutStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// 새 정산 요청
#[derive(Debug, Clone, Deserialize)]
pub struct PayoutDraft {
    pub seller_id: String,
    pub store_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub payment_method: String,
    pub notes: Option<String>,
}

/// 정산과 묶인 수수료 기록
#[derive(Debug, Clone, Serialize)]
pub struct PayoutDetails {
    pub payout: Payout,
    pub commissions: Vec<CommissionEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use PayoutAction::*;
        use PayoutStatus::*;

        assert_eq!(Process.next(Pending), Some(Processing));
        assert_eq!(Process.next(Processing), None);
        assert_eq!(Complete.next(Pending), Some(Completed));
        assert_eq!(Complete.next(Processing), Some(Completed));
        assert_eq!(Fail.next(Processing), Some(Failed));
        assert_eq!(Cancel.next(Pending), Some(Cancelled));

        for terminal in [Completed, Failed, Cancelled] {
            assert!(terminal.is_terminal());
            for action in [Process, Complete, Fail, Cancel] {
                assert_eq!(action.next(terminal), None, "{} from {}", action, terminal);
            }
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(PayoutStatus::from_str("processing").unwrap(), PayoutStatus::Processing);
        assert!(PayoutStatus::from_str("PAID").is_err());
    }
}
