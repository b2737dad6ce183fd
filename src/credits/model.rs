//! 판매 크레딧 모델
//!
//! 크레딧 잔액, 거래 기록, 변경 요청, 스토어 상태를 정의합니다.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 크레딧 거래 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditTransactionType {
    /// 결제를 통한 구매
    Purchase,
    /// 월별 차감 또는 만료 차감
    Deduction,
    /// 환불
    Refund,
    /// 관리자 수동 조정
    Adjustment,
    /// 보너스 지급
    Bonus,
}

impl CreditTransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditTransactionType::Purchase => "PURCHASE",
            CreditTransactionType::Deduction => "DEDUCTION",
            CreditTransactionType::Refund => "REFUND",
            CreditTransactionType::Adjustment => "ADJUSTMENT",
            CreditTransactionType::Bonus => "BONUS",
        }
    }
}

impl fmt::Display for CreditTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreditTransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PURCHASE" => Ok(CreditTransactionType::Purchase),
            "DEDUCTION" => Ok(CreditTransactionType::Deduction),
            "REFUND" => Ok(CreditTransactionType::Refund),
            "ADJUSTMENT" => Ok(CreditTransactionType::Adjustment),
            "BONUS" => Ok(CreditTransactionType::Bonus),
            other => Err(format!("알 수 없는 거래 타입: {}", other)),
        }
    }
}

/// 스토어 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreStatus {
    /// 승인 대기
    Pending,
    /// 승인됨
    Active,
    /// 정지됨
    Suspended,
}

impl StoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreStatus::Pending => "PENDING",
            StoreStatus::Active => "ACTIVE",
            StoreStatus::Suspended => "SUSPENDED",
        }
    }
}

impl FromStr for StoreStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(StoreStatus::Pending),
            "ACTIVE" => Ok(StoreStatus::Active),
            "SUSPENDED" => Ok(StoreStatus::Suspended),
            other => Err(format!("알 수 없는 스토어 상태: {}", other)),
        }
    }
}

/// 크레딧 잔액 상태
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreditBalance {
    /// 남은 개월 수
    pub balance: i64,
    /// 미사용 크레딧 만료 시각
    pub expires_at: Option<DateTime<Utc>>,
    /// 마지막 월별 차감 시각
    pub last_deducted_at: Option<DateTime<Utc>>,
    /// 유예 기간 종료 시각
    pub grace_ends_at: Option<DateTime<Utc>>,
}

impl CreditBalance {
    /// 잔액 0이면서 유예 기간 안인지 여부
    pub fn in_grace(&self, now: DateTime<Utc>) -> bool {
        self.balance == 0 && self.grace_ends_at.map_or(false, |ends| now < ends)
    }

    /// 유예 기간까지 끝났는지 여부
    pub fn grace_expired(&self, now: DateTime<Utc>) -> bool {
        self.balance == 0 && self.grace_ends_at.map_or(false, |ends| ends <= now)
    }

    /// 만료 시각이 지났는지 여부
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expires| expires <= now)
    }

    /// 상품 게시 가능 여부
    pub fn can_publish(&self, store_status: StoreStatus, now: DateTime<Utc>) -> bool {
        store_status == StoreStatus::Active && (self.balance > 0 || self.in_grace(now))
    }
}

/// 변경 주체
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Actor {
    /// 스케줄러, 웹훅 등 시스템 처리
    System,
    /// 판매자 본인
    Seller(String),
    /// 관리자
    Admin(String),
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin(_))
    }

    pub fn performed_by(&self) -> Option<String> {
        match self {
            Actor::System => None,
            Actor::Seller(id) | Actor::Admin(id) => Some(id.clone()),
        }
    }
}

/// 결제 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub session_id: String,
    pub payment_reference: Option<String>,
    pub amount_paid: Decimal,
    pub currency: String,
}

/// 원장 변경 요청
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditMutation {
    pub transaction_type: CreditTransactionType,
    /// 부호 있는 수량 (개월)
    pub amount: i64,
    pub description: String,
    pub notes: Option<String>,
    pub actor: Actor,
    pub payment: Option<PaymentDetails>,
    /// 월별 차감으로 기록할지 여부
    pub monthly: bool,
}

impl CreditMutation {
    /// 결제 완료된 구매
    pub fn purchase(months: i64, payment: PaymentDetails) -> Self {
        Self {
            transaction_type: CreditTransactionType::Purchase,
            amount: months,
            description: format!(
                "Purchased {} month{} of selling credits",
                months,
                if months > 1 { "s" } else { "" }
            ),
            notes: None,
            actor: Actor::System,
            payment: Some(payment),
            monthly: false,
        }
    }

    /// 월별 1개월 차감
    pub fn monthly_deduction(now: DateTime<Utc>) -> Self {
        Self {
            transaction_type: CreditTransactionType::Deduction,
            amount: -1,
            description: format!("Monthly credit deduction - {}", now.format("%B %Y")),
            notes: None,
            actor: Actor::System,
            payment: None,
            monthly: true,
        }
    }

    /// 만료로 인한 잔액 소멸
    pub fn expiry(balance: i64, expired_at: DateTime<Utc>) -> Self {
        Self {
            transaction_type: CreditTransactionType::Deduction,
            amount: -balance,
            description: format!(
                "Unused credits expired on {}",
                expired_at.format("%Y-%m-%d")
            ),
            notes: None,
            actor: Actor::System,
            payment: None,
            monthly: false,
        }
    }

    /// 관리자 수동 변경 (보너스, 환불, 조정)
    pub fn admin(
        transaction_type: CreditTransactionType,
        amount: i64,
        admin_id: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            transaction_type,
            amount,
            description: format!("Manual {} by admin", transaction_type.as_str().to_lowercase()),
            notes: Some(notes.into()),
            actor: Actor::Admin(admin_id.into()),
            payment: None,
            monthly: false,
        }
    }
}

/// 크레딧 거래 기록 (추가 전용)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: String,
    pub store_id: String,
    /// 스토어별 1부터 증가하는 순번
    pub sequence: i64,
    pub transaction_type: CreditTransactionType,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub amount_paid: Option<Decimal>,
    pub currency: Option<String>,
    pub payment_session_id: Option<String>,
    pub payment_reference: Option<String>,
    pub description: String,
    pub notes: Option<String>,
    pub performed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 스토어 크레딧 현황
#[derive(Debug, Clone, Serialize)]
pub struct CreditStatus {
    pub store_id: String,
    pub store_name: String,
    pub store_status: StoreStatus,
    pub credits_balance: i64,
    pub last_deducted_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub grace_ends_at: Option<DateTime<Utc>>,
    pub in_grace_period: bool,
    pub can_publish: bool,
    pub can_purchase: bool,
    pub listings_suspended: bool,
}
