use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ledger::{self, LedgerPolicy};
use super::model::{CreditMutation, CreditStatus, CreditTransaction, CreditTransactionType, PaymentDetails, StoreStatus};
use crate::db::models::StoreRecord;
use crate::db::CreditRepository;
use crate::error::{AppError, GatewayError, LedgerError, SettingsError};
use crate::payment::{
    CheckoutRequest, PaymentGateway, PaymentStatus, CREDIT_PURCHASE_TYPE, METADATA_MONTHS, METADATA_STORE_ID,
    METADATA_TYPE,
};
use crate::settings::{keys, CreditSettings, SettingsService};

/// 거래 내역 최대 페이지 크기
pub const MAX_PAGE_SIZE: i64 = 100;

/// 체크아웃 결과
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutInfo {
    pub session_id: String,
    pub url: String,
    pub months: i64,
    pub price_per_month: Decimal,
    pub total: Decimal,
    pub currency: String,
}

/// 결제 반영 결과
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseResult {
    /// 같은 세션이 이미 반영돼 있었는지 여부
    pub already_processed: bool,
    pub transaction: CreditTransaction,
}

/// 관리자 크레딧 조정 요청
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustmentRequest {
    pub amount: i64,
    #[serde(rename = "type")]
    pub transaction_type: CreditTransactionType,
    pub admin_id: String,
    pub notes: String,
}

/// 거래 내역 페이지
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub transactions: Vec<CreditTransaction>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// 판매 크레딧 서비스
///
/// 스토어 등록/승인, 크레딧 구매, 관리자 조정, 정기 차감을 담당합니다.
/// 잔액 변경은 모두 `CreditRepository::append`를 거칩니다.
#[derive(Clone)]
pub struct CreditService {
    repo: CreditRepository,
    settings: SettingsService,
    gateway: Arc<dyn PaymentGateway>,
    frontend_url: String,
}

impl CreditService {
    pub fn new(
        repo: CreditRepository,
        settings: SettingsService,
        gateway: Arc<dyn PaymentGateway>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            settings,
            gateway,
            frontend_url: frontend_url.into(),
        }
    }

    pub async fn credit_settings(&self) -> Result<CreditSettings, AppError> {
        Ok(self.settings.credit_settings().await?)
    }

    async fn policy(&self) -> Result<LedgerPolicy, AppError> {
        let settings = self.credit_settings().await?;
        LedgerPolicy::with_grace_days(settings.grace_period_days).ok_or_else(|| {
            SettingsError::InvalidValue {
                key: keys::SELLER_CREDIT_GRACE_PERIOD_DAYS.to_string(),
                reason: format!("유예 기간 범위 초과: {}", settings.grace_period_days),
            }
            .into()
        })
    }

    async fn find_store(&self, store_id: &str) -> Result<StoreRecord, AppError> {
        self.repo
            .find_store(store_id)
            .await?
            .ok_or_else(|| LedgerError::StoreNotFound(store_id.to_string()).into())
    }

    /// 스토어 등록 (승인 대기)
    pub async fn register_store(&self, owner_id: &str, name: &str, now: DateTime<Utc>) -> Result<StoreRecord, AppError> {
        if owner_id.trim().is_empty() || name.trim().is_empty() {
            return Err(AppError::Validation("owner_id와 name은 필수입니다".into()));
        }
        if self.repo.find_store_by_owner(owner_id).await?.is_some() {
            return Err(AppError::Validation(format!("이미 스토어가 있는 사용자: {}", owner_id)));
        }

        let store = StoreRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: name.trim().to_string(),
            status: StoreStatus::Pending.as_str().to_string(),
            credits_balance: 0,
            credits_expires_at: None,
            credits_last_deducted_at: None,
            credits_grace_ends_at: None,
            listings_suspended: false,
            created_at: now,
        };
        self.repo.create_store(&store).await?;
        info!("🏪 스토어 등록: {} ({})", store.id, store.name);

        Ok(store)
    }

    /// 스토어 상태 변경 (승인, 정지)
    pub async fn set_store_status(&self, store_id: &str, status: StoreStatus) -> Result<StoreRecord, AppError> {
        if self.repo.update_status(store_id, status).await? == 0 {
            return Err(LedgerError::StoreNotFound(store_id.to_string()).into());
        }
        info!("🏪 스토어 상태 변경: {} → {}", store_id, status.as_str());
        self.find_store(store_id).await
    }

    /// 전체 스토어
    pub async fn stores(&self) -> Result<Vec<StoreRecord>, AppError> {
        Ok(self.repo.find_all_stores().await?)
    }

    /// 크레딧 현황
    pub async fn status(&self, store_id: &str, now: DateTime<Utc>) -> Result<CreditStatus, AppError> {
        let store = self.find_store(store_id).await?;
        let store_status = store.store_status()?;
        let balance = store.credit_balance();

        Ok(CreditStatus {
            store_id: store.id,
            store_name: store.name,
            store_status,
            credits_balance: balance.balance,
            last_deducted_at: balance.last_deducted_at,
            expires_at: balance.expires_at,
            grace_ends_at: balance.grace_ends_at,
            in_grace_period: balance.in_grace(now),
            can_publish: balance.can_publish(store_status, now) && !store.listings_suspended,
            can_purchase: store_status == StoreStatus::Active,
            listings_suspended: store.listings_suspended,
        })
    }

    /// 거래 내역 (최신순)
    pub async fn history(&self, store_id: &str, page: i64, limit: i64) -> Result<HistoryPage, AppError> {
        if page < 1 {
            return Err(AppError::Validation("page는 1 이상이어야 합니다".into()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(AppError::Validation(format!("limit은 1~{} 범위여야 합니다", MAX_PAGE_SIZE)));
        }
        self.find_store(store_id).await?;

        let offset = (page - 1).saturating_mul(limit);
        let records = self.repo.history(store_id, limit, offset).await?;
        let total = self.repo.count_transactions(store_id).await?;
        let transactions = records
            .into_iter()
            .map(CreditTransaction::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HistoryPage {
            transactions,
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        })
    }

    /// 크레딧 구매용 체크아웃 세션 생성
    pub async fn create_checkout(&self, store_id: &str, months: i64, customer_email: Option<String>) -> Result<CheckoutInfo, AppError> {
        let settings = self.credit_settings().await?;
        if months < settings.min_purchase_months || months > settings.max_purchase_months {
            return Err(AppError::Validation(format!(
                "구매 개월 수는 {}~{} 범위여야 합니다",
                settings.min_purchase_months, settings.max_purchase_months
            )));
        }

        let store = self.find_store(store_id).await?;
        if store.store_status()? != StoreStatus::Active {
            return Err(LedgerError::StoreNotActive(store_id.to_string()).into());
        }

        let unit_amount_cents = (settings.price_per_month * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .ok_or_else(|| AppError::Validation("크레딧 가격 범위 초과".into()))?;
        let total = settings.price_per_month * Decimal::from(months);

        let mut metadata = HashMap::new();
        metadata.insert(METADATA_STORE_ID.to_string(), store.id.clone());
        metadata.insert(METADATA_MONTHS.to_string(), months.to_string());
        metadata.insert(METADATA_TYPE.to_string(), CREDIT_PURCHASE_TYPE.to_string());
        metadata.insert("price_per_month".to_string(), settings.price_per_month.to_string());

        let request = CheckoutRequest {
            product_name: "Selling Credits".to_string(),
            description: format!("{} month{} of selling credits", months, if months > 1 { "s" } else { "" }),
            unit_amount_cents,
            quantity: months,
            currency: "usd".to_string(),
            success_url: format!(
                "{}/seller/credits?success=true&session_id={{CHECKOUT_SESSION_ID}}",
                self.frontend_url
            ),
            cancel_url: format!("{}/seller/credits?canceled=true", self.frontend_url),
            customer_email,
            metadata,
        };
        let session = self.gateway.create_checkout_session(request).await?;
        info!("💳 크레딧 체크아웃: 스토어 {} {}개월 ({})", store.id, months, session.session_id);

        Ok(CheckoutInfo {
            session_id: session.session_id,
            url: session.url,
            months,
            price_per_month: settings.price_per_month,
            total,
            currency: "USD".to_string(),
        })
    }

    /// 결제 완료된 세션을 원장에 반영
    ///
    /// 세션 ID 기준으로 한 번만 반영되며, 두 번째 호출은 기존 거래를 돌려줍니다.
    pub async fn process_purchase(&self, session_id: &str, now: DateTime<Utc>) -> Result<PurchaseResult, AppError> {
        if let Some(existing) = self.already_processed(session_id).await? {
            return Ok(existing);
        }

        let session = self.gateway.retrieve_session(session_id).await?;
        if session.payment_status != PaymentStatus::Paid {
            return Err(GatewayError::NotPaid(session_id.to_string()).into());
        }
        if session.metadata.get(METADATA_TYPE).map(String::as_str) != Some(CREDIT_PURCHASE_TYPE) {
            return Err(GatewayError::InvalidMetadata(format!("{}: 크레딧 구매 세션이 아닙니다", session_id)).into());
        }
        let store_id = session
            .metadata
            .get(METADATA_STORE_ID)
            .cloned()
            .ok_or_else(|| GatewayError::InvalidMetadata(format!("{}: store_id 없음", session_id)))?;
        let months = session
            .metadata
            .get(METADATA_MONTHS)
            .and_then(|m| i64::from_str(m).ok())
            .filter(|m| *m > 0)
            .ok_or_else(|| GatewayError::InvalidMetadata(format!("{}: 개월 수 오류", session_id)))?;

        let payment = PaymentDetails {
            session_id: session.id.clone(),
            payment_reference: session.payment_reference.clone(),
            amount_paid: Decimal::new(session.amount_total_cents, 2),
            currency: session.currency.to_uppercase(),
        };

        let policy = self.policy().await?;
        let written = self
            .repo
            .append_mutation(&store_id, CreditMutation::purchase(months, payment), &policy, now)
            .await;

        match written {
            Ok(entry) => {
                info!(
                    "✅ 크레딧 구매 반영: 스토어 {} +{} (잔액 {})",
                    store_id, months, entry.transaction.balance_after
                );
                Ok(PurchaseResult {
                    already_processed: false,
                    transaction: entry.transaction,
                })
            }
            // 같은 세션이 동시에 들어온 경우
            Err(LedgerError::ConcurrentModification(_)) => match self.already_processed(session_id).await? {
                Some(existing) => Ok(existing),
                None => Err(LedgerError::ConcurrentModification(store_id).into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn already_processed(&self, session_id: &str) -> Result<Option<PurchaseResult>, AppError> {
        match self.repo.find_by_session(session_id).await? {
            Some(record) => {
                info!("ℹ️ 이미 반영된 결제 세션: {}", session_id);
                Ok(Some(PurchaseResult {
                    already_processed: true,
                    transaction: CreditTransaction::try_from(record)?,
                }))
            }
            None => Ok(None),
        }
    }

    /// 관리자 수동 조정 (ADJUSTMENT, BONUS, REFUND)
    pub async fn adjust(
        &self,
        store_id: &str,
        request: AdjustmentRequest,
        now: DateTime<Utc>,
    ) -> Result<CreditTransaction, AppError> {
        match request.transaction_type {
            CreditTransactionType::Adjustment | CreditTransactionType::Bonus | CreditTransactionType::Refund => {}
            other => {
                return Err(AppError::Validation(format!("관리자가 직접 기록할 수 없는 거래 타입: {}", other)));
            }
        }
        if request.admin_id.trim().is_empty() {
            return Err(AppError::Validation("admin_id는 필수입니다".into()));
        }

        let mutation = CreditMutation::admin(request.transaction_type, request.amount, request.admin_id, request.notes);
        let policy = self.policy().await?;
        let entry = self.repo.append_mutation(store_id, mutation, &policy, now).await?;

        info!(
            "🛠️ 관리자 크레딧 조정: 스토어 {} {} {:+} (잔액 {})",
            store_id, entry.transaction.transaction_type, entry.transaction.amount, entry.transaction.balance_after
        );
        Ok(entry.transaction)
    }

    /// 이번 달 월별 차감 (승인된 스토어만)
    pub async fn deduct_monthly(&self, store_id: &str, now: DateTime<Utc>) -> Result<Option<CreditTransaction>, AppError> {
        let policy = self.policy().await?;
        let entry = self
            .repo
            .append(store_id, &policy, now, |store, current| {
                if store.store_status()? != StoreStatus::Active {
                    return Ok(None);
                }
                Ok(ledger::monthly_deduction(current, now))
            })
            .await?;
        Ok(entry.map(|e| e.transaction))
    }

    /// 만료된 크레딧 소멸
    pub async fn expire_credits(&self, store_id: &str, now: DateTime<Utc>) -> Result<Option<CreditTransaction>, AppError> {
        let policy = self.policy().await?;
        let entry = self
            .repo
            .append(store_id, &policy, now, |_, current| Ok(ledger::expiry_deduction(current, now)))
            .await?;
        if let Some(entry) = &entry {
            warn!("⌛ 크레딧 만료: 스토어 {} {}개월 소멸", store_id, -entry.transaction.amount);
        }
        Ok(entry.map(|e| e.transaction))
    }

    /// 유예 기간이 끝난 스토어 게시 중단
    pub async fn enforce_grace(&self, store_id: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        let store = self.find_store(store_id).await?;
        if store.listings_suspended || !store.credit_balance().grace_expired(now) {
            return Ok(false);
        }
        let suspended = self.repo.suspend_listings(store_id).await?;
        if suspended {
            warn!("🚫 유예 기간 종료로 상품 게시 중단: 스토어 {}", store_id);
        }
        Ok(suspended)
    }

    /// 저장된 거래 체인 검증
    pub async fn verify_ledger(&self, store_id: &str) -> Result<(), AppError> {
        let store = self.find_store(store_id).await?;
        let transactions = self
            .repo
            .all_transactions(store_id)
            .await?
            .into_iter()
            .map(CreditTransaction::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        ledger::verify_chain(&transactions)?;
        let last = transactions.last().map_or(0, |tx| tx.balance_after);
        if last != store.credits_balance {
            return Err(LedgerError::ChainMismatch {
                expected: last,
                found: store.credits_balance,
            }
            .into());
        }
        Ok(())
    }
}
