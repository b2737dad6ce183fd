//! 에러 타입 정의
//!
//! 모듈별 에러와 이를 묶는 `AppError`를 정의합니다.
//! HTTP 상태 코드 매핑은 `api` 모듈에서 처리합니다.

use rust_decimal::Decimal;

use crate::credits::model::CreditTransactionType;
use crate::payout::model::{PayoutAction, PayoutStatus};

/// 설정 저장소 에러
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("설정을 찾을 수 없음: {0}")]
    NotFound(String),
    #[error("수정할 수 없는 설정: {0}")]
    NotEditable(String),
    #[error("잘못된 설정 값 ({key}): {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("데이터베이스 오류: {0}")]
    Database(#[from] sqlx::Error),
}

/// 수수료 설정 검증 에러 (저장 차단 대상)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommissionError {
    #[error("수수료율은 0 이상 100 이하여야 합니다: {0}")]
    RateOutOfRange(Decimal),
    #[error("{field} 값은 음수일 수 없습니다: {value}")]
    NegativeAmount { field: &'static str, value: Decimal },
    #[error("최소 수수료는 100을 넘을 수 없습니다: {0}")]
    MinAboveLimit(Decimal),
    #[error("고정 수수료는 50을 넘을 수 없습니다: {0}")]
    FixedFeeAboveLimit(Decimal),
    #[error("잘못된 수수료 규칙: {0}")]
    InvalidRule(String),
    #[error("주문 금액이 계산 가능한 범위를 넘었습니다")]
    AmountOverflow,
    #[error("손상된 수수료 기록: {0}")]
    CorruptRecord(String),
}

/// 판매 크레딧 원장 에러
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("크레딧 변경 수량은 0일 수 없습니다")]
    ZeroAmount,
    #[error("{transaction_type} 거래에 허용되지 않는 수량: {amount}")]
    InvalidSign {
        transaction_type: CreditTransactionType,
        amount: i64,
    },
    #[error("크레딧 잔액 부족: 잔액 {balance}, 요청 {amount}")]
    InsufficientCredits { balance: i64, amount: i64 },
    #[error("관리자 조정에는 사유(notes)가 필요합니다")]
    NotesRequired,
    #[error("적용할 변경 사항이 없습니다 (잔액 {balance})")]
    NoChange { balance: i64 },
    #[error("크레딧 수량 범위 초과")]
    AmountOverflow,
    #[error("스토어를 찾을 수 없음: {0}")]
    StoreNotFound(String),
    #[error("승인되지 않은 스토어: {0}")]
    StoreNotActive(String),
    #[error("동시 수정 감지: {0}")]
    ConcurrentModification(String),
    #[error("원장 체인 불일치: 직전 거래 잔액 {expected}, 현재 잔액 {found}")]
    ChainMismatch { expected: i64, found: i64 },
    #[error("손상된 원장 레코드: {0}")]
    CorruptRecord(String),
    #[error("데이터베이스 오류: {0}")]
    Database(#[from] sqlx::Error),
}

/// 판매자 정산 에러
#[derive(Debug, thiserror::Error)]
pub enum PayoutError {
    #[error("정산을 찾을 수 없음: {0}")]
    NotFound(String),
    #[error("{status} 상태의 정산은 {action}할 수 없습니다")]
    InvalidTransition { status: PayoutStatus, action: PayoutAction },
    #[error("정산 기간에 확정된 수수료 기록이 없습니다")]
    NoEligibleCommissions,
    #[error("정산 금액 {amount}이 최소 정산 금액 {minimum}보다 작습니다")]
    BelowMinimum { amount: Decimal, minimum: Decimal },
    #[error("잘못된 정산 요청: {0}")]
    InvalidRequest(String),
    #[error("동시 수정 감지: {0}")]
    ConcurrentModification(String),
    #[error("손상된 정산 레코드: {0}")]
    CorruptRecord(String),
    #[error("데이터베이스 오류: {0}")]
    Database(#[from] sqlx::Error),
}

/// 결제 게이트웨이 에러
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("결제 게이트웨이 오류: {0}")]
    Upstream(String),
    #[error("결제 세션을 찾을 수 없음: {0}")]
    SessionNotFound(String),
    #[error("결제가 완료되지 않았습니다: {0}")]
    NotPaid(String),
    #[error("잘못된 세션 메타데이터: {0}")]
    InvalidMetadata(String),
}

/// 배송사 API 에러
#[derive(Debug, thiserror::Error)]
pub enum CarrierError {
    #[error("배송사 API 오류 ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("배송사 연결 실패: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("배송사 응답 해석 실패: {0}")]
    InvalidResponse(String),
    #[error("배송사가 설정되지 않았습니다")]
    NotConfigured,
}

/// 애플리케이션 공통 에러
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Commission(#[from] CommissionError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Payout(#[from] PayoutError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Carrier(#[from] CarrierError),
    #[error("잘못된 요청: {0}")]
    Validation(String),
    #[error("찾을 수 없음: {0}")]
    NotFound(String),
    #[error("데이터베이스 오류: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    /// API 응답에 실리는 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Settings(e) => match e {
                SettingsError::NotFound(_) => "SETTING_NOT_FOUND",
                SettingsError::NotEditable(_) => "SETTING_NOT_EDITABLE",
                SettingsError::InvalidValue { .. } => "INVALID_SETTING_VALUE",
                SettingsError::Database(_) => "DATABASE_ERROR",
            },
            AppError::Commission(e) => match e {
                CommissionError::AmountOverflow => "AMOUNT_OVERFLOW",
                CommissionError::CorruptRecord(_) => "COMMISSION_RECORD_CORRUPTED",
                _ => "INVALID_COMMISSION_CONFIG",
            },
            AppError::Ledger(e) => match e {
                LedgerError::ZeroAmount | LedgerError::InvalidSign { .. } => "INVALID_AMOUNT",
                LedgerError::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
                LedgerError::NotesRequired => "NOTES_REQUIRED",
                LedgerError::NoChange { .. } => "NO_CHANGE",
                LedgerError::AmountOverflow => "INVALID_AMOUNT",
                LedgerError::StoreNotFound(_) => "STORE_NOT_FOUND",
                LedgerError::StoreNotActive(_) => "STORE_NOT_ACTIVE",
                LedgerError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
                LedgerError::ChainMismatch { .. } | LedgerError::CorruptRecord(_) => "LEDGER_CORRUPTED",
                LedgerError::Database(_) => "DATABASE_ERROR",
            },
            AppError::Payout(e) => match e {
                PayoutError::NotFound(_) => "PAYOUT_NOT_FOUND",
                PayoutError::InvalidTransition { .. } => "INVALID_PAYOUT_STATE",
                PayoutError::NoEligibleCommissions => "NO_ELIGIBLE_COMMISSIONS",
                PayoutError::BelowMinimum { .. } => "BELOW_MINIMUM_PAYOUT",
                PayoutError::InvalidRequest(_) => "VALIDATION_ERROR",
                PayoutError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
                PayoutError::CorruptRecord(_) => "PAYOUT_RECORD_CORRUPTED",
                PayoutError::Database(_) => "DATABASE_ERROR",
            },
            AppError::Gateway(e) => match e {
                GatewayError::Upstream(_) => "PAYMENT_GATEWAY_ERROR",
                GatewayError::SessionNotFound(_) => "SESSION_NOT_FOUND",
                GatewayError::NotPaid(_) => "PAYMENT_NOT_COMPLETED",
                GatewayError::InvalidMetadata(_) => "INVALID_SESSION_METADATA",
            },
            AppError::Carrier(e) => match e {
                CarrierError::NotConfigured => "CARRIER_NOT_CONFIGURED",
                _ => "CARRIER_ERROR",
            },
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Database(_) => "DATABASE_ERROR",
        }
    }
}
