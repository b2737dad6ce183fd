use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::commission::model::ConfigWarning;
use crate::commission::record::CommissionStatus;
use crate::db::models::SettingRecord;
use crate::error::{AppError, CarrierError, CommissionError, GatewayError, LedgerError, PayoutError, SettingsError};

/// 에러 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// 핸들러 에러 타입
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// 핸들러 반환 타입
pub type ApiResult<T> = Result<Json<T>, ApiError>;

impl From<AppError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: AppError) -> Self {
        let status = status_of(&err);
        if status.is_server_error() {
            error!("❌ 요청 처리 실패 ({}): {}", err.code(), err);
        }
        (
            status,
            Json(ErrorResponse {
                error: err.code().to_string(),
                message: err.to_string(),
            }),
        )
    }
}

fn status_of(err: &AppError) -> StatusCode {
    match err {
        AppError::Settings(e) => match e {
            SettingsError::NotFound(_) => StatusCode::NOT_FOUND,
            SettingsError::NotEditable(_) => StatusCode::FORBIDDEN,
            SettingsError::InvalidValue { .. } => StatusCode::BAD_REQUEST,
            SettingsError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        AppError::Commission(e) => match e {
            CommissionError::CorruptRecord(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        },
        AppError::Ledger(e) => match e {
            LedgerError::ZeroAmount
            | LedgerError::InvalidSign { .. }
            | LedgerError::NotesRequired
            | LedgerError::AmountOverflow => StatusCode::BAD_REQUEST,
            LedgerError::InsufficientCredits { .. }
            | LedgerError::NoChange { .. }
            | LedgerError::ConcurrentModification(_) => StatusCode::CONFLICT,
            LedgerError::StoreNotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::StoreNotActive(_) => StatusCode::FORBIDDEN,
            LedgerError::ChainMismatch { .. } | LedgerError::CorruptRecord(_) | LedgerError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
        AppError::Payout(e) => match e {
            PayoutError::NotFound(_) => StatusCode::NOT_FOUND,
            PayoutError::InvalidTransition { .. } | PayoutError::ConcurrentModification(_) => StatusCode::CONFLICT,
            PayoutError::NoEligibleCommissions | PayoutError::BelowMinimum { .. } | PayoutError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            PayoutError::CorruptRecord(_) | PayoutError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        AppError::Gateway(e) => match e {
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::NotPaid(_) | GatewayError::InvalidMetadata(_) => StatusCode::BAD_REQUEST,
        },
        AppError::Carrier(e) => match e {
            CarrierError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        },
        AppError::Validation(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// 헬스 체크 응답
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// 설정 응답 (값은 JSON 그대로)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingResponse {
    pub key: String,
    pub category: String,
    pub value: Value,
    pub is_editable: bool,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<SettingRecord> for SettingResponse {
    fn from(record: SettingRecord) -> Self {
        let value = serde_json::from_str(&record.value).unwrap_or(Value::String(record.value));
        Self {
            key: record.key,
            category: record.category,
            value,
            is_editable: record.is_editable,
            updated_by: record.updated_by,
            updated_at: record.updated_at,
        }
    }
}

/// 설정 목록 조회 파라미터
#[derive(Debug, Deserialize)]
pub struct SettingsQuery {
    pub category: String,
}

/// 설정 변경 요청
#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    pub value: Value,
    pub changed_by: String,
    pub reason: Option<String>,
}

/// 설정 변경 응답
#[derive(Debug, Serialize)]
pub struct UpdateSettingResponse {
    pub setting: SettingResponse,
    pub warnings: Vec<ConfigWarning>,
}

/// 설정 잠금 변경 요청
#[derive(Debug, Deserialize)]
pub struct SettingLockRequest {
    pub is_editable: bool,
}

/// 페이지 조회 파라미터
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// 감사 로그 조회 파라미터
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

/// 스토어 등록 요청
#[derive(Debug, Deserialize)]
pub struct RegisterStoreRequest {
    pub owner_id: String,
    pub name: String,
}

/// 크레딧 체크아웃 요청
#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub months: i64,
    pub customer_email: Option<String>,
}

/// 결제 웹훅 요청
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub session_id: String,
}

/// 정기 작업 실행 요청
#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceRequest {
    /// 비어 있으면 매월 1일에만 차감
    pub monthly_deduction: Option<bool>,
}

/// 원장 검증 응답
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub store_id: String,
    pub valid: bool,
}

/// 판매자 수수료 기록 조회 파라미터
#[derive(Debug, Deserialize)]
pub struct SellerCommissionsQuery {
    pub status: Option<CommissionStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// 수수료 통계 기간 (RFC 3339)
#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

/// 주문 기록 상태 변경 응답
#[derive(Debug, Serialize)]
pub struct OrderCommissionUpdate {
    pub order_id: String,
    pub updated: u64,
}

/// 정산 처리 시작 요청
#[derive(Debug, Default, Deserialize)]
pub struct ProcessPayoutRequest {
    pub payment_reference: Option<String>,
}

/// 정산 실패 요청
#[derive(Debug, Default, Deserialize)]
pub struct FailPayoutRequest {
    pub reason: Option<String>,
}
