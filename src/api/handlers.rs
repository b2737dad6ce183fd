use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;

use crate::api::models::*;
use crate::commission::{
    CommissionEntry, CommissionPage, CommissionQuote, CommissionRule, CommissionStatistics, OrderSettlement,
    QuoteRequest, RuleDraft, SellerCommissionSummary, SettlementResult,
};
use crate::credits::{
    run_maintenance, AdjustmentRequest, CheckoutInfo, CreditStatus, CreditTransaction, HistoryPage,
    MaintenanceOptions, MaintenanceReport, PurchaseResult, StoreStatus,
};
use crate::db::models::{SettingsAuditRecord, ShipmentRecord, StoreRecord};
use crate::error::AppError;
use crate::payout::{Payout, PayoutDetails, PayoutDraft};
use crate::server::ServerState;
use crate::shipping::{Package, RateQuote, ShipmentRequest};

/// 헬스 체크
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// 수수료 견적
pub async fn quote_commission(
    State(state): State<ServerState>,
    Json(payload): Json<QuoteRequest>,
) -> ApiResult<CommissionQuote> {
    let quote = state.commission.quote(&payload, Utc::now()).await?;
    Ok(Json(quote))
}

/// 수수료 규칙 목록
pub async fn list_commission_rules(State(state): State<ServerState>) -> ApiResult<Vec<CommissionRule>> {
    Ok(Json(state.commission.list_rules().await?))
}

/// 수수료 규칙 생성
pub async fn create_commission_rule(
    State(state): State<ServerState>,
    Json(payload): Json<RuleDraft>,
) -> Result<(StatusCode, Json<CommissionRule>), ApiError> {
    let rule = state.commission.create_rule(payload, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

/// 수수료 규칙 비활성화
pub async fn deactivate_commission_rule(
    State(state): State<ServerState>,
    Path(rule_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.commission.deactivate_rule(&rule_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 결제된 주문의 수수료 기록
pub async fn record_order_commissions(
    State(state): State<ServerState>,
    Json(payload): Json<OrderSettlement>,
) -> Result<(StatusCode, Json<SettlementResult>), ApiError> {
    let result = state.commission.record_order(&payload, Utc::now()).await?;
    let status = if result.already_recorded {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(result)))
}

/// 주문별 수수료 기록
pub async fn get_order_commissions(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
) -> ApiResult<Vec<CommissionEntry>> {
    Ok(Json(state.commission.order_commissions(&order_id).await?))
}

/// 주문 결제 확정
pub async fn confirm_order_commissions(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
) -> ApiResult<OrderCommissionUpdate> {
    let updated = state.commission.confirm_order(&order_id).await?;
    Ok(Json(OrderCommissionUpdate { order_id, updated }))
}

/// 주문 취소
pub async fn cancel_order_commissions(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
) -> ApiResult<OrderCommissionUpdate> {
    let updated = state.commission.cancel_order(&order_id).await?;
    Ok(Json(OrderCommissionUpdate { order_id, updated }))
}

/// 판매자 수수료 요약
pub async fn get_seller_commission_summary(
    State(state): State<ServerState>,
    Path(seller_id): Path<String>,
) -> ApiResult<SellerCommissionSummary> {
    Ok(Json(state.commission.seller_summary(&seller_id).await?))
}

/// 판매자 수수료 기록
pub async fn get_seller_commissions(
    State(state): State<ServerState>,
    Path(seller_id): Path<String>,
    Query(params): Query<SellerCommissionsQuery>,
) -> ApiResult<CommissionPage> {
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(20);
    Ok(Json(
        state
            .commission
            .seller_commissions(&seller_id, params.status, page, limit)
            .await?,
    ))
}

/// 수수료 통계 (관리자)
pub async fn get_commission_statistics(
    State(state): State<ServerState>,
    Query(params): Query<StatisticsQuery>,
) -> ApiResult<CommissionStatistics> {
    Ok(Json(state.commission.statistics(params.from, params.until).await?))
}

/// 정산 생성 (관리자)
pub async fn create_payout(
    State(state): State<ServerState>,
    Json(payload): Json<PayoutDraft>,
) -> Result<(StatusCode, Json<Payout>), ApiError> {
    let payout = state.payouts.create_payout(&payload, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(payout)))
}

/// 정산 상세
pub async fn get_payout(
    State(state): State<ServerState>,
    Path(payout_id): Path<String>,
) -> ApiResult<PayoutDetails> {
    Ok(Json(state.payouts.details(&payout_id).await?))
}

/// 판매자 정산 목록
pub async fn get_seller_payouts(
    State(state): State<ServerState>,
    Path(seller_id): Path<String>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Vec<Payout>> {
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(20);
    Ok(Json(state.payouts.seller_payouts(&seller_id, page, limit).await?))
}

/// 정산 처리 시작
pub async fn process_payout(
    State(state): State<ServerState>,
    Path(payout_id): Path<String>,
    payload: Option<Json<ProcessPayoutRequest>>,
) -> ApiResult<Payout> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    Ok(Json(
        state
            .payouts
            .process(&payout_id, request.payment_reference.as_deref())
            .await?,
    ))
}

/// 정산 완료
pub async fn complete_payout(
    State(state): State<ServerState>,
    Path(payout_id): Path<String>,
) -> ApiResult<Payout> {
    Ok(Json(state.payouts.complete(&payout_id, Utc::now()).await?))
}

/// 정산 실패
pub async fn fail_payout(
    State(state): State<ServerState>,
    Path(payout_id): Path<String>,
    payload: Option<Json<FailPayoutRequest>>,
) -> ApiResult<Payout> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    Ok(Json(state.payouts.fail(&payout_id, request.reason.as_deref()).await?))
}

/// 정산 취소
pub async fn cancel_payout(
    State(state): State<ServerState>,
    Path(payout_id): Path<String>,
) -> ApiResult<Payout> {
    Ok(Json(state.payouts.cancel(&payout_id).await?))
}

/// 카테고리별 설정 목록
pub async fn list_settings(
    State(state): State<ServerState>,
    Query(params): Query<SettingsQuery>,
) -> ApiResult<Vec<SettingResponse>> {
    let records = state.settings.list(&params.category).await.map_err(AppError::from)?;
    Ok(Json(records.into_iter().map(SettingResponse::from).collect()))
}

/// 설정 조회
pub async fn get_setting(
    State(state): State<ServerState>,
    Path(key): Path<String>,
) -> ApiResult<SettingResponse> {
    let record = state.settings.get(&key).await.map_err(AppError::from)?;
    Ok(Json(record.into()))
}

/// 설정 변경
pub async fn update_setting(
    State(state): State<ServerState>,
    Path(key): Path<String>,
    Json(payload): Json<UpdateSettingRequest>,
) -> ApiResult<UpdateSettingResponse> {
    let update = state
        .settings
        .update(&key, payload.value, &payload.changed_by, payload.reason.as_deref(), Utc::now())
        .await?;

    Ok(Json(UpdateSettingResponse {
        setting: update.setting.into(),
        warnings: update.warnings,
    }))
}

/// 설정 잠금/해제 (관리자)
pub async fn set_setting_editable(
    State(state): State<ServerState>,
    Path(key): Path<String>,
    Json(payload): Json<SettingLockRequest>,
) -> ApiResult<SettingResponse> {
    let record = state
        .settings
        .set_editable(&key, payload.is_editable)
        .await
        .map_err(AppError::from)?;
    Ok(Json(record.into()))
}

/// 설정 변경 이력
pub async fn get_setting_audit(
    State(state): State<ServerState>,
    Path(key): Path<String>,
    Query(params): Query<AuditQuery>,
) -> ApiResult<Vec<SettingsAuditRecord>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let log = state
        .settings
        .audit_log(&key, limit)
        .await
        .map_err(AppError::from)?;
    Ok(Json(log))
}

/// 스토어 등록
pub async fn register_store(
    State(state): State<ServerState>,
    Json(payload): Json<RegisterStoreRequest>,
) -> Result<(StatusCode, Json<StoreRecord>), ApiError> {
    let store = state
        .credits
        .register_store(&payload.owner_id, &payload.name, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(store)))
}

/// 스토어 승인
pub async fn approve_store(
    State(state): State<ServerState>,
    Path(store_id): Path<String>,
) -> ApiResult<StoreRecord> {
    Ok(Json(state.credits.set_store_status(&store_id, StoreStatus::Active).await?))
}

/// 스토어 정지
pub async fn suspend_store(
    State(state): State<ServerState>,
    Path(store_id): Path<String>,
) -> ApiResult<StoreRecord> {
    Ok(Json(state.credits.set_store_status(&store_id, StoreStatus::Suspended).await?))
}

/// 크레딧 현황
pub async fn get_credit_status(
    State(state): State<ServerState>,
    Path(store_id): Path<String>,
) -> ApiResult<CreditStatus> {
    Ok(Json(state.credits.status(&store_id, Utc::now()).await?))
}

/// 크레딧 거래 내역
pub async fn get_credit_history(
    State(state): State<ServerState>,
    Path(store_id): Path<String>,
    Query(params): Query<PageQuery>,
) -> ApiResult<HistoryPage> {
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(20);
    Ok(Json(state.credits.history(&store_id, page, limit).await?))
}

/// 크레딧 구매 체크아웃
pub async fn create_credit_checkout(
    State(state): State<ServerState>,
    Path(store_id): Path<String>,
    Json(payload): Json<CheckoutBody>,
) -> ApiResult<CheckoutInfo> {
    let checkout = state
        .credits
        .create_checkout(&store_id, payload.months, payload.customer_email)
        .await?;
    Ok(Json(checkout))
}

/// 결제 완료 웹훅
pub async fn credit_webhook(
    State(state): State<ServerState>,
    Json(payload): Json<WebhookRequest>,
) -> ApiResult<PurchaseResult> {
    Ok(Json(state.credits.process_purchase(&payload.session_id, Utc::now()).await?))
}

/// 관리자 크레딧 조정
pub async fn adjust_credits(
    State(state): State<ServerState>,
    Path(store_id): Path<String>,
    Json(payload): Json<AdjustmentRequest>,
) -> ApiResult<CreditTransaction> {
    Ok(Json(state.credits.adjust(&store_id, payload, Utc::now()).await?))
}

/// 원장 체인 검증
pub async fn verify_credit_ledger(
    State(state): State<ServerState>,
    Path(store_id): Path<String>,
) -> ApiResult<VerifyResponse> {
    state.credits.verify_ledger(&store_id).await?;
    Ok(Json(VerifyResponse { store_id, valid: true }))
}

/// 정기 작업 수동 실행
pub async fn run_credit_maintenance(
    State(state): State<ServerState>,
    payload: Option<Json<MaintenanceRequest>>,
) -> ApiResult<MaintenanceReport> {
    let now = Utc::now();
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    let options = match request.monthly_deduction {
        Some(monthly_deduction) => MaintenanceOptions { monthly_deduction },
        None => MaintenanceOptions::for_time(now),
    };
    Ok(Json(run_maintenance(&state.credits, options, now).await?))
}

/// 배송비 견적
pub async fn quote_shipping(
    State(state): State<ServerState>,
    Json(payload): Json<Package>,
) -> ApiResult<RateQuote> {
    Ok(Json(state.shipping.quote(&payload).await?))
}

/// 송장 생성
pub async fn create_shipment(
    State(state): State<ServerState>,
    Json(payload): Json<ShipmentRequest>,
) -> Result<(StatusCode, Json<ShipmentRecord>), ApiError> {
    let shipment = state.shipping.create_shipment(&payload, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(shipment)))
}

/// 주문별 송장 조회
pub async fn get_order_shipments(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
) -> ApiResult<Vec<ShipmentRecord>> {
    Ok(Json(state.shipping.shipments_for_order(&order_id).await?))
}
