use chrono::{DateTime, Utc};
use log::{info, warn};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::model::{Payout, PayoutAction, PayoutDetails, PayoutDraft, PayoutStatus};
use crate::commission::record::CommissionEntry;
use crate::db::models::PayoutRecord;
use crate::db::payout_repository::{LinkedCommissions, PayoutChanges};
use crate::db::{CommissionEntryRepository, PayoutRepository};
use crate::error::{AppError, PayoutError};
use crate::settings::SettingsService;

/// 정산 목록 최대 페이지 크기
pub const MAX_PAGE_SIZE: i64 = 100;

/// 판매자 정산 서비스
///
/// 확정된 수수료 기록을 판매자/스토어 단위로 묶어 지급 흐름을 관리합니다.
#[derive(Clone)]
pub struct PayoutService {
    payouts: PayoutRepository,
    commissions: CommissionEntryRepository,
    settings: SettingsService,
}

impl PayoutService {
    pub fn new(payouts: PayoutRepository, commissions: CommissionEntryRepository, settings: SettingsService) -> Self {
        Self {
            payouts,
            commissions,
            settings,
        }
    }

    /// 정산 생성
    ///
    /// 기간 안에 만들어졌고 아직 묶이지 않은 `CONFIRMED` 기록을 모읍니다.
    /// 합계가 최소 정산 금액보다 작으면 만들지 않습니다.
    pub async fn create_payout(&self, draft: &PayoutDraft, now: DateTime<Utc>) -> Result<Payout, AppError> {
        if draft.period_start > draft.period_end {
            return Err(PayoutError::InvalidRequest("정산 시작일이 종료일보다 늦습니다".into()).into());
        }
        if draft.payment_method.trim().is_empty() {
            return Err(PayoutError::InvalidRequest("payment_method는 비워둘 수 없습니다".into()).into());
        }

        let mut selected = Vec::new();
        for record in self.commissions.find_payable(&draft.seller_id, &draft.store_id).await? {
            let entry = CommissionEntry::try_from(record)?;
            if entry.created_at >= draft.period_start && entry.created_at <= draft.period_end {
                selected.push(entry);
            }
        }
        if selected.is_empty() {
            return Err(PayoutError::NoEligibleCommissions.into());
        }

        let currency = selected[0].currency.clone();
        if selected.iter().any(|e| e.currency != currency) {
            return Err(PayoutError::InvalidRequest("통화가 다른 수수료 기록은 한 정산에 묶을 수 없습니다".into()).into());
        }

        let amount = selected
            .iter()
            .try_fold(Decimal::ZERO, |sum, e| sum.checked_add(e.seller_receives))
            .ok_or_else(|| PayoutError::InvalidRequest("정산 금액 범위 초과".into()))?;

        let minimum = self.settings.payout_settings().await?.minimum_amount;
        if amount < minimum {
            return Err(PayoutError::BelowMinimum { amount, minimum }.into());
        }

        let payout = Payout {
            id: Uuid::new_v4().to_string(),
            seller_id: draft.seller_id.clone(),
            store_id: draft.store_id.clone(),
            amount,
            currency,
            commission_count: selected.len() as i64,
            payment_method: draft.payment_method.clone(),
            payment_reference: None,
            period_start: draft.period_start,
            period_end: draft.period_end,
            notes: draft.notes.clone(),
            status: PayoutStatus::Pending,
            processed_at: None,
            created_at: now,
        };

        let ids: Vec<String> = selected.iter().map(|e| e.id.clone()).collect();
        self.payouts.create(&PayoutRecord::from(&payout), &ids).await?;

        info!(
            "💸 정산 생성: {} 판매자 {} {} {} ({}건)",
            payout.id, payout.seller_id, payout.amount, payout.currency, payout.commission_count
        );
        Ok(payout)
    }

    pub async fn get(&self, id: &str) -> Result<Payout, AppError> {
        let record = self
            .payouts
            .find(id)
            .await?
            .ok_or_else(|| PayoutError::NotFound(id.to_string()))?;
        Ok(Payout::try_from(record)?)
    }

    /// 정산과 묶인 수수료 기록
    pub async fn details(&self, id: &str) -> Result<PayoutDetails, AppError> {
        let payout = self.get(id).await?;
        let commissions = self
            .commissions
            .find_by_payout(id)
            .await?
            .into_iter()
            .map(CommissionEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PayoutDetails { payout, commissions })
    }

    /// 판매자 정산 목록 (최신순)
    pub async fn seller_payouts(&self, seller_id: &str, page: i64, limit: i64) -> Result<Vec<Payout>, AppError> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(limit);

        let payouts = self
            .payouts
            .find_by_seller(seller_id, limit, offset)
            .await?
            .into_iter()
            .map(Payout::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(payouts)
    }

    /// 지급 진행 중으로 변경
    pub async fn process(&self, id: &str, payment_reference: Option<&str>) -> Result<Payout, AppError> {
        let changes = PayoutChanges {
            payment_reference,
            ..Default::default()
        };
        let payout = self
            .transition(id, PayoutAction::Process, &changes, LinkedCommissions::Keep)
            .await?;
        info!("⏳ 정산 처리 시작: {}", id);
        Ok(payout)
    }

    /// 지급 완료: 묶인 수수료 기록을 `PAID`로
    pub async fn complete(&self, id: &str, now: DateTime<Utc>) -> Result<Payout, AppError> {
        let changes = PayoutChanges {
            processed_at: Some(now),
            ..Default::default()
        };
        let payout = self
            .transition(id, PayoutAction::Complete, &changes, LinkedCommissions::MarkPaid(now))
            .await?;
        info!("✅ 정산 완료: {} ({}건 지급)", id, payout.commission_count);
        Ok(payout)
    }

    /// 지급 실패: 수수료 기록을 풀어 다음 정산에 다시 넣을 수 있게 함
    pub async fn fail(&self, id: &str, reason: Option<&str>) -> Result<Payout, AppError> {
        let current = self.get(id).await?;
        let notes = reason.map(|reason| match current.notes.as_deref() {
            Some(existing) if !existing.is_empty() => format!("{}\n실패 사유: {}", existing, reason),
            _ => format!("실패 사유: {}", reason),
        });
        let changes = PayoutChanges {
            notes: notes.as_deref(),
            ..Default::default()
        };
        let payout = self
            .transition(id, PayoutAction::Fail, &changes, LinkedCommissions::Release)
            .await?;
        warn!("❌ 정산 실패: {} ({})", id, reason.unwrap_or("사유 없음"));
        Ok(payout)
    }

    /// 정산 취소: 수수료 기록을 풀어 줌
    pub async fn cancel(&self, id: &str) -> Result<Payout, AppError> {
        let payout = self
            .transition(id, PayoutAction::Cancel, &PayoutChanges::default(), LinkedCommissions::Release)
            .await?;
        info!("🚫 정산 취소: {}", id);
        Ok(payout)
    }

    async fn transition(
        &self,
        id: &str,
        action: PayoutAction,
        changes: &PayoutChanges<'_>,
        linked: LinkedCommissions,
    ) -> Result<Payout, AppError> {
        let current = self.get(id).await?;
        let next = action.next(current.status).ok_or(PayoutError::InvalidTransition {
            status: current.status,
            action,
        })?;

        self.payouts
            .transition(id, current.status, next, changes, linked)
            .await?;
        self.get(id).await
    }
}
