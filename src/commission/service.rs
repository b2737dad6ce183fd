use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::evaluator::compute_commission;
use super::model::{CommissionBreakdown, CommissionConfig, ConfigWarning, OrderAmounts};
use super::record::{
    self, CommissionEntry, CommissionStatistics, CommissionStatus, OrderSettlement, SellerCommissionSummary,
};
use super::rules::{resolve_rule, CommissionRule, RuleContext, RuleType};
use crate::db::models::{CommissionRecord, CommissionRuleRecord};
use crate::db::{CommissionEntryRepository, CommissionRuleRepository};
use crate::error::{AppError, CommissionError};
use crate::settings::SettingsService;

/// 수수료 견적 요청
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub seller_id: Option<String>,
    pub category_id: Option<String>,
    pub product_total: Decimal,
    #[serde(default)]
    pub shipping_total: Decimal,
}

/// 수수료 견적
#[derive(Debug, Clone, Serialize)]
pub struct CommissionQuote {
    /// 계산에 사용한 설정 (규칙 반영 후)
    pub config: CommissionConfig,
    pub rule_id: Option<String>,
    pub breakdown: CommissionBreakdown,
    pub warnings: Vec<ConfigWarning>,
}

/// 새 수수료 규칙
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDraft {
    pub seller_id: Option<String>,
    pub category_id: Option<String>,
    pub rule_type: RuleType,
    pub value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_order_value: Option<Decimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub is_override: bool,
}

/// 주문 정산 결과
#[derive(Debug, Clone, Serialize)]
pub struct SettlementResult {
    pub order_id: String,
    /// 이미 기록된 주문이면 새로 쓰지 않음
    pub already_recorded: bool,
    pub entries: Vec<CommissionEntry>,
}

/// 판매자 수수료 기록 페이지
#[derive(Debug, Clone, Serialize)]
pub struct CommissionPage {
    pub entries: Vec<CommissionEntry>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

/// 수수료 서비스
#[derive(Clone)]
pub struct CommissionService {
    settings: SettingsService,
    rules: CommissionRuleRepository,
    records: CommissionEntryRepository,
}

impl CommissionService {
    pub fn new(settings: SettingsService, rules: CommissionRuleRepository, records: CommissionEntryRepository) -> Self {
        Self { settings, rules, records }
    }

    /// 주문 금액에 대한 수수료 계산
    ///
    /// 설정은 요청마다 한 번 스냅샷으로 읽습니다. 판매자가 주어지면 적용 가능한
    /// 규칙을 골라 설정에 반영합니다.
    pub async fn quote(&self, request: &QuoteRequest, now: DateTime<Utc>) -> Result<CommissionQuote, AppError> {
        let base = self.settings.commission_config().await?;
        self.evaluate(base, request, now).await
    }

    async fn evaluate(
        &self,
        base: CommissionConfig,
        request: &QuoteRequest,
        now: DateTime<Utc>,
    ) -> Result<CommissionQuote, AppError> {
        if request.product_total < Decimal::ZERO {
            return Err(CommissionError::NegativeAmount {
                field: "product_total",
                value: request.product_total,
            }
            .into());
        }
        if request.shipping_total < Decimal::ZERO {
            return Err(CommissionError::NegativeAmount {
                field: "shipping_total",
                value: request.shipping_total,
            }
            .into());
        }

        let order = OrderAmounts::new(request.product_total, request.shipping_total);

        let mut rule_id = None;
        let config = match request.seller_id.as_deref() {
            Some(seller_id) => {
                let rules = self.load_candidates(seller_id).await?;
                let ctx = RuleContext {
                    seller_id,
                    category_id: request.category_id.as_deref(),
                    order_amount: order.gross()?,
                };
                match resolve_rule(&rules, &ctx, now) {
                    Some(rule) => {
                        rule_id = Some(rule.id.clone());
                        base.with_rule(rule)
                    }
                    None => base,
                }
            }
            None => base,
        };

        let breakdown = compute_commission(&order, &config)?.rounded();
        let warnings = config.warnings();

        Ok(CommissionQuote {
            config,
            rule_id,
            breakdown,
            warnings,
        })
    }

    /// 결제된 주문의 항목별 수수료 기록
    ///
    /// 한 주문의 모든 항목은 같은 설정 스냅샷으로 계산하고 한 트랜잭션으로 저장합니다.
    /// 같은 주문을 다시 받으면 기존 기록을 그대로 돌려줍니다.
    pub async fn record_order(
        &self,
        settlement: &OrderSettlement,
        now: DateTime<Utc>,
    ) -> Result<SettlementResult, AppError> {
        validate_settlement(settlement)?;

        let existing = self.order_commissions(&settlement.order_id).await?;
        if !existing.is_empty() {
            info!("🔁 이미 기록된 주문: {}", settlement.order_id);
            return Ok(SettlementResult {
                order_id: settlement.order_id.clone(),
                already_recorded: true,
                entries: existing,
            });
        }

        let base = self.settings.commission_config().await?;
        let status = if settlement.payment_captured {
            CommissionStatus::Confirmed
        } else {
            CommissionStatus::Pending
        };

        let mut entries = Vec::with_capacity(settlement.items.len());
        for item in &settlement.items {
            let request = QuoteRequest {
                seller_id: Some(item.seller_id.clone()),
                category_id: item.category_id.clone(),
                product_total: item.product_total,
                shipping_total: item.shipping_total,
            };
            let quote = self.evaluate(base.clone(), &request, now).await?;

            entries.push(CommissionEntry {
                id: Uuid::new_v4().to_string(),
                order_id: settlement.order_id.clone(),
                order_item_id: item.order_item_id.clone(),
                seller_id: item.seller_id.clone(),
                store_id: item.store_id.clone(),
                rule_id: quote.rule_id,
                order_amount: item.product_total,
                shipping_amount: item.shipping_total,
                commission_amount: quote.breakdown.commission,
                seller_receives: quote.breakdown.seller_receives,
                clamp: quote.breakdown.clamp,
                currency: settlement.currency.clone(),
                status,
                payout_id: None,
                paid_at: None,
                created_at: now,
            });
        }

        let records: Vec<CommissionRecord> = entries.iter().map(CommissionRecord::from).collect();
        if !self.records.insert_order(&records).await? {
            return Err(AppError::Validation(format!(
                "주문 {}의 항목 중 이미 다른 주문으로 기록된 항목이 있습니다",
                settlement.order_id
            )));
        }

        info!(
            "🧾 주문 수수료 기록: {} ({}건, {})",
            settlement.order_id,
            entries.len(),
            status
        );
        Ok(SettlementResult {
            order_id: settlement.order_id.clone(),
            already_recorded: false,
            entries,
        })
    }

    /// 주문별 수수료 기록
    pub async fn order_commissions(&self, order_id: &str) -> Result<Vec<CommissionEntry>, AppError> {
        let records = self.records.find_by_order(order_id).await?;
        to_entries(records)
    }

    /// 결제 확정: `PENDING` 기록을 `CONFIRMED`로
    pub async fn confirm_order(&self, order_id: &str) -> Result<u64, AppError> {
        let updated = self
            .records
            .update_status_for_order(order_id, &[CommissionStatus::Pending], CommissionStatus::Confirmed)
            .await?;
        info!("✅ 주문 수수료 확정: {} ({}건)", order_id, updated);
        Ok(updated)
    }

    /// 주문 취소: 아직 정산되지 않은 기록을 `CANCELLED`로
    ///
    /// 정산 묶음에 들어간 기록은 바꾸지 않습니다. 해당 정산을 먼저 취소해야 합니다.
    pub async fn cancel_order(&self, order_id: &str) -> Result<u64, AppError> {
        let updated = self
            .records
            .update_status_for_order(
                order_id,
                &[CommissionStatus::Pending, CommissionStatus::Confirmed],
                CommissionStatus::Cancelled,
            )
            .await?;

        let locked = self
            .order_commissions(order_id)
            .await?
            .into_iter()
            .filter(|e| e.payout_id.is_some() && e.status == CommissionStatus::Confirmed)
            .count();
        if locked > 0 {
            warn!("⚠️ 정산 진행 중인 수수료 기록은 취소하지 않음: 주문 {} ({}건)", order_id, locked);
        }

        info!("🚫 주문 수수료 취소: {} ({}건)", order_id, updated);
        Ok(updated)
    }

    /// 판매자 수수료 요약
    pub async fn seller_summary(&self, seller_id: &str) -> Result<SellerCommissionSummary, AppError> {
        let entries = to_entries(self.records.find_by_seller(seller_id).await?)?;
        Ok(record::summarize_seller(seller_id, &entries)?)
    }

    /// 판매자 수수료 기록 (최신순)
    pub async fn seller_commissions(
        &self,
        seller_id: &str,
        status: Option<CommissionStatus>,
        page: i64,
        limit: i64,
    ) -> Result<CommissionPage, AppError> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(limit);

        let records = self.records.page_by_seller(seller_id, status, limit, offset).await?;
        let total = self.records.count_by_seller(seller_id, status).await?;

        Ok(CommissionPage {
            entries: to_entries(records)?,
            page,
            limit,
            total,
        })
    }

    /// 기간별 수수료 통계 (경계 포함)
    pub async fn statistics(
        &self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<CommissionStatistics, AppError> {
        if let (Some(from), Some(until)) = (from, until) {
            if from > until {
                return Err(AppError::Validation("조회 시작 시각이 종료 시각보다 늦습니다".into()));
            }
        }

        let entries: Vec<CommissionEntry> = to_entries(self.records.find_all().await?)?
            .into_iter()
            .filter(|e| from.map_or(true, |f| e.created_at >= f) && until.map_or(true, |u| e.created_at <= u))
            .collect();

        Ok(record::statistics(&entries, from, until)?)
    }

    async fn load_candidates(&self, seller_id: &str) -> Result<Vec<CommissionRule>, AppError> {
        let records = self.rules.find_candidates(seller_id).await?;
        let mut rules = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id.clone();
            match CommissionRule::try_from(record) {
                Ok(rule) => rules.push(rule),
                Err(e) => warn!("⚠️ 읽을 수 없는 수수료 규칙 건너뜀: {} ({})", id, e),
            }
        }
        Ok(rules)
    }

    /// 규칙 생성
    pub async fn create_rule(&self, draft: RuleDraft, now: DateTime<Utc>) -> Result<CommissionRule, AppError> {
        let rule = CommissionRule {
            id: Uuid::new_v4().to_string(),
            seller_id: draft.seller_id,
            category_id: draft.category_id,
            rule_type: draft.rule_type,
            value: draft.value,
            min_order_value: draft.min_order_value,
            max_order_value: draft.max_order_value,
            valid_from: draft.valid_from,
            valid_until: draft.valid_until,
            priority: draft.priority,
            is_active: true,
            is_override: draft.is_override,
            created_at: now,
        };
        rule.validate()?;

        self.rules.save(&CommissionRuleRecord::from(&rule)).await?;
        info!("📐 수수료 규칙 생성: {} ({} {})", rule.id, rule.rule_type, rule.value);

        Ok(rule)
    }

    /// 전체 규칙 목록
    pub async fn list_rules(&self) -> Result<Vec<CommissionRule>, AppError> {
        let records = self.rules.find_all().await?;
        let rules = records
            .into_iter()
            .map(CommissionRule::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    /// 규칙 비활성화
    pub async fn deactivate_rule(&self, id: &str) -> Result<(), AppError> {
        if self.rules.deactivate(id).await? == 0 {
            return Err(AppError::NotFound(format!("수수료 규칙 {}", id)));
        }
        info!("📐 수수료 규칙 비활성화: {}", id);
        Ok(())
    }
}

/// 수수료 기록 페이지 최대 크기
pub const MAX_PAGE_SIZE: i64 = 100;

fn to_entries(records: Vec<CommissionRecord>) -> Result<Vec<CommissionEntry>, AppError> {
    let entries = records
        .into_iter()
        .map(CommissionEntry::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

fn validate_settlement(settlement: &OrderSettlement) -> Result<(), AppError> {
    if settlement.order_id.trim().is_empty() {
        return Err(AppError::Validation("order_id는 필수입니다".into()));
    }
    if settlement.items.is_empty() {
        return Err(AppError::Validation("정산할 주문 항목이 없습니다".into()));
    }

    let mut seen = HashSet::new();
    for item in &settlement.items {
        if item.order_item_id.trim().is_empty() || item.seller_id.trim().is_empty() || item.store_id.trim().is_empty() {
            return Err(AppError::Validation(
                "order_item_id, seller_id, store_id는 비워둘 수 없습니다".into(),
            ));
        }
        if !seen.insert(item.order_item_id.as_str()) {
            return Err(AppError::Validation(format!("중복된 주문 항목: {}", item.order_item_id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commission::record::SettlementItem;
    use crate::db::{init_database, SettingsRepository};
    use rust_decimal_macros::dec;

    fn item(id: &str, seller: &str, product_total: Decimal) -> SettlementItem {
        SettlementItem {
            order_item_id: id.to_string(),
            seller_id: seller.to_string(),
            store_id: format!("store-{}", seller),
            category_id: None,
            product_total,
            shipping_total: dec!(0),
        }
    }

    fn settlement(order_id: &str, captured: bool, items: Vec<SettlementItem>) -> OrderSettlement {
        OrderSettlement {
            order_id: order_id.to_string(),
            currency: "USD".to_string(),
            payment_captured: captured,
            items,
        }
    }

    fn quote_request(seller: Option<&str>, product_total: Decimal, shipping_total: Decimal) -> QuoteRequest {
        QuoteRequest {
            seller_id: seller.map(str::to_string),
            category_id: None,
            product_total,
            shipping_total,
        }
    }

    async fn service() -> CommissionService {
        let pool = init_database("sqlite::memory:", 1).await.unwrap();
        CommissionService::new(
            SettingsService::new(SettingsRepository::new(pool.clone())),
            CommissionRuleRepository::new(pool.clone()),
            CommissionEntryRepository::new(pool),
        )
    }

    fn draft(seller: Option<&str>, rule_type: RuleType, value: Decimal) -> RuleDraft {
        RuleDraft {
            seller_id: seller.map(str::to_string),
            category_id: None,
            rule_type,
            value,
            min_order_value: None,
            max_order_value: None,
            valid_from: None,
            valid_until: None,
            priority: 0,
            is_override: false,
        }
    }

    #[tokio::test]
    async fn test_quote_uses_global_settings() {
        let svc = service().await;
        let quote = svc.quote(&quote_request(None, dec!(1000), dec!(0)), Utc::now()).await.unwrap();
        assert_eq!(quote.breakdown.commission, dec!(100));
        assert_eq!(quote.breakdown.seller_receives, dec!(900));
        assert!(quote.rule_id.is_none());
    }

    #[tokio::test]
    async fn test_quote_applies_seller_rule() {
        let svc = service().await;
        let rule = svc
            .create_rule(draft(Some("seller-1"), RuleType::Percentage, dec!(5)), Utc::now())
            .await
            .unwrap();

        let quote = svc
            .quote(&quote_request(Some("seller-1"), dec!(200), dec!(0)), Utc::now())
            .await
            .unwrap();
        assert_eq!(quote.rule_id.as_deref(), Some(rule.id.as_str()));
        assert_eq!(quote.breakdown.commission, dec!(10));

        let other = svc
            .quote(&quote_request(Some("seller-2"), dec!(200), dec!(0)), Utc::now())
            .await
            .unwrap();
        assert_eq!(other.breakdown.commission, dec!(20));
    }

    #[tokio::test]
    async fn test_negative_amount_rejected() {
        let svc = service().await;
        let err = svc
            .quote(&quote_request(None, dec!(-1), dec!(0)), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_COMMISSION_CONFIG");
    }

    #[tokio::test]
    async fn test_out_of_range_amount_rejected() {
        let svc = service().await;
        let huge = "70000000000000000000000000000".parse::<Decimal>().unwrap();

        let err = svc
            .quote(&quote_request(None, huge, dec!(0)), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AMOUNT_OVERFLOW");

        let err = svc
            .quote(&quote_request(Some("seller-1"), huge, huge), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AMOUNT_OVERFLOW");
    }

    #[tokio::test]
    async fn test_invalid_rule_not_saved() {
        let svc = service().await;
        assert!(svc
            .create_rule(draft(None, RuleType::Percentage, dec!(101)), Utc::now())
            .await
            .is_err());
        assert!(svc.list_rules().await.unwrap().is_empty());

        let fixed = svc
            .create_rule(draft(None, RuleType::Fixed, dec!(2.5)), Utc::now())
            .await
            .unwrap();
        svc.deactivate_rule(&fixed.id).await.unwrap();
        let rules = svc.list_rules().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert!(!rules[0].is_active);
    }

    #[tokio::test]
    async fn test_record_order_per_item_and_replay() {
        let svc = service().await;
        svc.create_rule(draft(Some("seller-b"), RuleType::Percentage, dec!(5)), Utc::now())
            .await
            .unwrap();

        let order = settlement(
            "order-1",
            true,
            vec![item("item-1", "seller-a", dec!(100)), item("item-2", "seller-b", dec!(200))],
        );
        let result = svc.record_order(&order, Utc::now()).await.unwrap();
        assert!(!result.already_recorded);
        assert_eq!(result.entries.len(), 2);

        let a = &result.entries[0];
        assert_eq!(a.commission_amount, dec!(10));
        assert_eq!(a.seller_receives, dec!(90));
        assert_eq!(a.status, CommissionStatus::Confirmed);
        let b = &result.entries[1];
        assert_eq!(b.commission_amount, dec!(10));
        assert!(b.rule_id.is_some());

        let replay = svc.record_order(&order, Utc::now()).await.unwrap();
        assert!(replay.already_recorded);
        assert_eq!(replay.entries.len(), 2);
        assert_eq!(svc.order_commissions("order-1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_record_order_rejects_bad_input_without_writing() {
        let svc = service().await;

        let err = svc.record_order(&settlement("order-1", true, vec![]), Utc::now()).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let dup = settlement(
            "order-1",
            true,
            vec![item("item-1", "seller-a", dec!(1)), item("item-1", "seller-a", dec!(2))],
        );
        assert!(svc.record_order(&dup, Utc::now()).await.is_err());

        let negative = settlement(
            "order-1",
            true,
            vec![item("item-1", "seller-a", dec!(10)), item("item-2", "seller-a", dec!(-1))],
        );
        let err = svc.record_order(&negative, Utc::now()).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_COMMISSION_CONFIG");
        assert!(svc.order_commissions("order-1").await.unwrap().is_empty());

        svc.record_order(&settlement("order-1", true, vec![item("item-1", "seller-a", dec!(10))]), Utc::now())
            .await
            .unwrap();
        let reused = settlement("order-2", true, vec![item("item-1", "seller-a", dec!(10))]);
        let err = svc.record_order(&reused, Utc::now()).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(svc.order_commissions("order-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_cancel_and_summary() {
        let svc = service().await;
        svc.record_order(&settlement("order-1", false, vec![item("item-1", "seller-a", dec!(100))]), Utc::now())
            .await
            .unwrap();
        svc.record_order(&settlement("order-2", true, vec![item("item-2", "seller-a", dec!(50))]), Utc::now())
            .await
            .unwrap();

        let summary = svc.seller_summary("seller-a").await.unwrap();
        assert_eq!(summary.pending.count, 1);
        assert_eq!(summary.confirmed.count, 1);
        assert_eq!(summary.available_for_payout, dec!(45));

        assert_eq!(svc.confirm_order("order-1").await.unwrap(), 1);
        assert_eq!(svc.confirm_order("order-1").await.unwrap(), 0);
        assert_eq!(svc.cancel_order("order-2").await.unwrap(), 1);
        assert_eq!(svc.cancel_order("order-2").await.unwrap(), 0);

        let summary = svc.seller_summary("seller-a").await.unwrap();
        assert_eq!(summary.confirmed.count, 1);
        assert_eq!(summary.cancelled.count, 1);
        assert_eq!(summary.total.count, 1);
        assert_eq!(summary.total.commission_amount, dec!(10));
        assert_eq!(summary.available_for_payout, dec!(90));

        let page = svc
            .seller_commissions("seller-a", Some(CommissionStatus::Cancelled), 1, 10)
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.entries[0].order_id, "order-2");

        let stats = svc.statistics(None, None).await.unwrap();
        assert_eq!(stats.total.count, 1);
        assert_eq!(stats.total_order_amount, dec!(100));
        assert_eq!(stats.cancelled.commission_amount, dec!(5));

        let later = Utc::now() + chrono::Duration::hours(1);
        let empty = svc.statistics(Some(later), None).await.unwrap();
        assert_eq!(empty.total.count, 0);
        assert!(svc.statistics(Some(later), Some(Utc::now())).await.is_err());
    }
}
