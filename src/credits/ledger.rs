//! 판매 크레딧 원장 계산
//!
//! 잔액 상태와 변경 요청으로부터 새 잔액과 거래 기록을 만듭니다.
//! 저장소 트랜잭션(`db::credit_repository::CreditRepository`)과
//! 메모리 원장(`CreditLedger`)이 같은 계산을 공유합니다.

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use log::{debug, warn};
use uuid::Uuid;

use super::model::{CreditBalance, CreditMutation, CreditTransaction, CreditTransactionType};
use crate::error::LedgerError;

/// 원장 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// 잔액 소진 후 유예 기간
    pub grace_period: Duration,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            grace_period: Duration::days(3),
        }
    }
}

impl LedgerPolicy {
    /// `chrono::Duration` 범위를 넘는 일 수는 `None`
    pub fn with_grace_days(days: i64) -> Option<Self> {
        Duration::try_days(days).map(|grace_period| Self { grace_period })
    }
}

/// 원장 반영 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub balance: CreditBalance,
    pub transaction: CreditTransaction,
}

/// 변경 요청 적용
///
/// `balance_after = balance_before + amount`를 항상 유지합니다.
/// 잔액이 음수가 되는 요청은 거부하되, 관리자 조정(ADJUSTMENT)만 0에서 멈추고
/// 실제 적용된 수량을 기록합니다.
pub fn apply(
    store_id: &str,
    sequence: i64,
    current: &CreditBalance,
    mutation: &CreditMutation,
    policy: &LedgerPolicy,
    now: DateTime<Utc>,
) -> Result<LedgerEntry, LedgerError> {
    validate_sign(mutation)?;

    let administrative = mutation.actor.is_admin();
    if administrative && mutation.notes.as_deref().map_or(true, |n| n.trim().is_empty()) {
        return Err(LedgerError::NotesRequired);
    }

    let before = current.balance;
    let mut applied = mutation.amount;
    let mut after = before.checked_add(applied).ok_or(LedgerError::AmountOverflow)?;

    if after < 0 {
        if administrative && mutation.transaction_type == CreditTransactionType::Adjustment {
            warn!(
                "⚠️ 관리자 조정이 잔액 아래로 내려가 0에서 멈춤: 스토어 {} (요청 {}, 잔액 {})",
                store_id, mutation.amount, before
            );
            applied = -before;
            after = 0;
        } else {
            return Err(LedgerError::InsufficientCredits {
                balance: before,
                amount: mutation.amount,
            });
        }
    }

    if applied == 0 {
        return Err(LedgerError::NoChange { balance: before });
    }

    let mut next = current.clone();
    next.balance = after;

    let extends_expiry = matches!(
        mutation.transaction_type,
        CreditTransactionType::Purchase | CreditTransactionType::Bonus | CreditTransactionType::Adjustment
    );
    if applied > 0 && extends_expiry {
        next.expires_at = Some(extend_expiry(current.expires_at, applied, now)?);
    }

    if after > 0 {
        next.grace_ends_at = None;
    } else if before > 0 {
        next.grace_ends_at = Some(
            now.checked_add_signed(policy.grace_period)
                .ok_or(LedgerError::AmountOverflow)?,
        );
    }

    if mutation.monthly {
        next.last_deducted_at = Some(now);
    }

    let payment = mutation.payment.as_ref();
    let transaction = CreditTransaction {
        id: Uuid::new_v4().to_string(),
        store_id: store_id.to_string(),
        sequence,
        transaction_type: mutation.transaction_type,
        amount: applied,
        balance_before: before,
        balance_after: after,
        amount_paid: payment.map(|p| p.amount_paid),
        currency: payment.map(|p| p.currency.clone()),
        payment_session_id: payment.map(|p| p.session_id.clone()),
        payment_reference: payment.and_then(|p| p.payment_reference.clone()),
        description: mutation.description.clone(),
        notes: mutation.notes.clone(),
        performed_by: mutation.actor.performed_by(),
        created_at: now,
    };

    debug!(
        "원장 반영: 스토어 {} #{} {} {:+} ({} → {})",
        store_id, sequence, transaction.transaction_type, applied, before, after
    );

    Ok(LedgerEntry {
        balance: next,
        transaction,
    })
}

/// 거래 타입별 부호 검사
fn validate_sign(mutation: &CreditMutation) -> Result<(), LedgerError> {
    if mutation.amount == 0 {
        return Err(LedgerError::ZeroAmount);
    }
    let valid = match mutation.transaction_type {
        CreditTransactionType::Purchase | CreditTransactionType::Bonus => mutation.amount > 0,
        CreditTransactionType::Deduction => mutation.amount < 0,
        CreditTransactionType::Adjustment | CreditTransactionType::Refund => true,
    };
    if valid {
        Ok(())
    } else {
        Err(LedgerError::InvalidSign {
            transaction_type: mutation.transaction_type,
            amount: mutation.amount,
        })
    }
}

/// 만료 시각 연장
///
/// 아직 만료 전이면 기존 만료 시각에서, 아니면 현재 시각에서 개월 수를 더합니다.
fn extend_expiry(
    current: Option<DateTime<Utc>>,
    months: i64,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, LedgerError> {
    let start = match current {
        Some(expires) if expires > now => expires,
        _ => now,
    };
    let months = u32::try_from(months).map_err(|_| LedgerError::AmountOverflow)?;
    start
        .checked_add_months(Months::new(months))
        .ok_or(LedgerError::AmountOverflow)
}

/// 이번 달 월별 차감 요청
///
/// 같은 달에 이미 차감했거나 잔액이 없으면 `None`입니다.
pub fn monthly_deduction(current: &CreditBalance, now: DateTime<Utc>) -> Option<CreditMutation> {
    if let Some(last) = current.last_deducted_at {
        if last.year() == now.year() && last.month() == now.month() {
            return None;
        }
    }
    if current.balance <= 0 {
        return None;
    }
    Some(CreditMutation::monthly_deduction(now))
}

/// 만료된 잔액 소멸 요청
pub fn expiry_deduction(current: &CreditBalance, now: DateTime<Utc>) -> Option<CreditMutation> {
    match current.expires_at {
        Some(expires) if expires <= now && current.balance > 0 => {
            Some(CreditMutation::expiry(current.balance, expires))
        }
        _ => None,
    }
}

/// 메모리 원장
///
/// 한 스토어의 잔액과 거래 목록을 함께 보관합니다.
#[derive(Debug, Clone, Default)]
pub struct CreditLedger {
    store_id: String,
    balance: CreditBalance,
    transactions: Vec<CreditTransaction>,
}

impl CreditLedger {
    pub fn new(store_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            ..Default::default()
        }
    }

    pub fn balance(&self) -> &CreditBalance {
        &self.balance
    }

    pub fn transactions(&self) -> &[CreditTransaction] {
        &self.transactions
    }

    /// 변경 요청 반영 (실패 시 상태 변화 없음)
    pub fn apply(
        &mut self,
        mutation: &CreditMutation,
        policy: &LedgerPolicy,
        now: DateTime<Utc>,
    ) -> Result<&CreditTransaction, LedgerError> {
        let sequence = self.transactions.len() as i64 + 1;
        let entry = apply(&self.store_id, sequence, &self.balance, mutation, policy, now)?;
        self.balance = entry.balance;
        self.transactions.push(entry.transaction);
        Ok(&self.transactions[self.transactions.len() - 1])
    }

    /// 거래 체인 검증
    pub fn verify(&self) -> Result<(), LedgerError> {
        verify_chain(&self.transactions)
    }
}

/// 연속된 거래의 잔액과 순번이 이어지는지 검증
pub fn verify_chain(transactions: &[CreditTransaction]) -> Result<(), LedgerError> {
    for tx in transactions {
        if tx.balance_before + tx.amount != tx.balance_after {
            return Err(LedgerError::CorruptRecord(format!(
                "거래 {}: {} + {} != {}",
                tx.id, tx.balance_before, tx.amount, tx.balance_after
            )));
        }
    }
    for pair in transactions.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if prev.balance_after != next.balance_before {
            return Err(LedgerError::ChainMismatch {
                expected: prev.balance_after,
                found: next.balance_before,
            });
        }
        if prev.sequence + 1 != next.sequence {
            return Err(LedgerError::CorruptRecord(format!(
                "순번 불연속: {} → {}",
                prev.sequence, next.sequence
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credits::model::PaymentDetails;
    use chrono::TimeZone;
    use rand::Rng;
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn payment(session: &str) -> PaymentDetails {
        PaymentDetails {
            session_id: session.to_string(),
            payment_reference: None,
            amount_paid: dec!(29.99),
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn test_purchase_sets_expiry_and_clears_grace() {
        let policy = LedgerPolicy::default();
        let now = at(2026, 1, 15);
        let current = CreditBalance {
            balance: 0,
            grace_ends_at: Some(now + Duration::days(1)),
            ..Default::default()
        };

        let entry = apply("store-1", 1, &current, &CreditMutation::purchase(3, payment("cs_1")), &policy, now).unwrap();

        assert_eq!(entry.balance.balance, 3);
        assert_eq!(entry.balance.expires_at, Some(at(2026, 4, 15)));
        assert_eq!(entry.balance.grace_ends_at, None);
        assert_eq!(entry.transaction.balance_before, 0);
        assert_eq!(entry.transaction.balance_after, 3);
        assert_eq!(entry.transaction.payment_session_id.as_deref(), Some("cs_1"));
    }

    #[test]
    fn test_purchase_extends_future_expiry() {
        let now = at(2026, 1, 15);
        let current = CreditBalance {
            balance: 2,
            expires_at: Some(at(2026, 3, 1)),
            ..Default::default()
        };
        let entry = apply("s", 1, &current, &CreditMutation::purchase(2, payment("cs")), &LedgerPolicy::default(), now).unwrap();
        assert_eq!(entry.balance.expires_at, Some(at(2026, 5, 1)));
    }

    #[test]
    fn test_deduction_to_zero_starts_grace() {
        let policy = LedgerPolicy::with_grace_days(5).unwrap();
        let now = at(2026, 2, 1);
        let current = CreditBalance {
            balance: 1,
            ..Default::default()
        };

        let entry = apply("s", 2, &current, &CreditMutation::monthly_deduction(now), &policy, now).unwrap();

        assert_eq!(entry.balance.balance, 0);
        assert_eq!(entry.balance.grace_ends_at, Some(now + Duration::days(5)));
        assert_eq!(entry.balance.last_deducted_at, Some(now));
        assert!(entry.balance.in_grace(now));
    }

    #[test]
    fn test_grace_past_calendar_range_is_rejected() {
        assert!(LedgerPolicy::with_grace_days(i64::MAX).is_none());
        assert!(LedgerPolicy::with_grace_days(365).is_some());

        let policy = LedgerPolicy {
            grace_period: Duration::MAX,
        };
        let now = at(2026, 2, 1);
        let current = CreditBalance {
            balance: 1,
            ..Default::default()
        };

        let result = apply("s", 2, &current, &CreditMutation::monthly_deduction(now), &policy, now);
        assert!(matches!(result, Err(LedgerError::AmountOverflow)));
    }

    #[test]
    fn test_deduction_below_zero_rejected() {
        let current = CreditBalance::default();
        let err = apply("s", 1, &current, &CreditMutation::monthly_deduction(Utc::now()), &LedgerPolicy::default(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientCredits { balance: 0, amount: -1 }));
    }

    #[test]
    fn test_admin_refund_cannot_go_negative() {
        let current = CreditBalance {
            balance: 1,
            ..Default::default()
        };
        let refund = CreditMutation::admin(CreditTransactionType::Refund, -3, "admin-1", "chargeback");
        let err = apply("s", 1, &current, &refund, &LedgerPolicy::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientCredits { .. }));
    }

    #[test]
    fn test_positive_refund_keeps_expiry() {
        let expires = at(2026, 8, 1);
        let current = CreditBalance {
            balance: 1,
            expires_at: Some(expires),
            ..Default::default()
        };
        let refund = CreditMutation::admin(CreditTransactionType::Refund, 2, "admin-1", "reversed deduction");
        let entry = apply("s", 1, &current, &refund, &LedgerPolicy::default(), at(2026, 7, 1)).unwrap();
        assert_eq!(entry.balance.balance, 3);
        assert_eq!(entry.balance.expires_at, Some(expires));
    }

    #[test]
    fn test_admin_adjustment_clamps_at_zero() {
        let now = Utc::now();
        let current = CreditBalance {
            balance: 2,
            ..Default::default()
        };
        let adjust = CreditMutation::admin(CreditTransactionType::Adjustment, -5, "admin-1", "duplicate purchase");

        let entry = apply("s", 4, &current, &adjust, &LedgerPolicy::default(), now).unwrap();

        assert_eq!(entry.transaction.amount, -2);
        assert_eq!(entry.transaction.balance_after, 0);
        assert_eq!(entry.transaction.performed_by.as_deref(), Some("admin-1"));
        assert!(entry.balance.grace_ends_at.is_some());
    }

    #[test]
    fn test_admin_adjustment_at_zero_is_no_change() {
        let adjust = CreditMutation::admin(CreditTransactionType::Adjustment, -1, "admin-1", "cleanup");
        let err = apply("s", 1, &CreditBalance::default(), &adjust, &LedgerPolicy::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::NoChange { balance: 0 }));
    }

    #[test]
    fn test_admin_requires_notes() {
        let bonus = CreditMutation::admin(CreditTransactionType::Bonus, 1, "admin-1", "  ");
        let err = apply("s", 1, &CreditBalance::default(), &bonus, &LedgerPolicy::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::NotesRequired));
    }

    #[test]
    fn test_sign_rules() {
        let policy = LedgerPolicy::default();
        let now = Utc::now();
        let current = CreditBalance {
            balance: 5,
            ..Default::default()
        };

        let negative_bonus = CreditMutation::admin(CreditTransactionType::Bonus, -1, "a", "n");
        assert!(matches!(
            apply("s", 1, &current, &negative_bonus, &policy, now),
            Err(LedgerError::InvalidSign { .. })
        ));

        let mut positive_deduction = CreditMutation::monthly_deduction(now);
        positive_deduction.amount = 1;
        assert!(matches!(
            apply("s", 1, &current, &positive_deduction, &policy, now),
            Err(LedgerError::InvalidSign { .. })
        ));

        let zero = CreditMutation::admin(CreditTransactionType::Adjustment, 0, "a", "n");
        assert!(matches!(apply("s", 1, &current, &zero, &policy, now), Err(LedgerError::ZeroAmount)));
    }

    #[test]
    fn test_monthly_deduction_once_per_month() {
        let now = at(2026, 3, 1);
        let mut current = CreditBalance {
            balance: 3,
            last_deducted_at: Some(at(2026, 2, 1)),
            ..Default::default()
        };
        assert!(monthly_deduction(&current, now).is_some());

        current.last_deducted_at = Some(at(2026, 3, 1));
        assert!(monthly_deduction(&current, at(2026, 3, 20)).is_none());

        current.last_deducted_at = Some(at(2025, 3, 1));
        assert!(monthly_deduction(&current, now).is_some());

        current.balance = 0;
        assert!(monthly_deduction(&current, now).is_none());
    }

    #[test]
    fn test_expiry_drains_balance() {
        let policy = LedgerPolicy::default();
        let now = at(2026, 6, 2);
        let current = CreditBalance {
            balance: 4,
            expires_at: Some(at(2026, 6, 1)),
            ..Default::default()
        };

        let mutation = expiry_deduction(&current, now).unwrap();
        assert_eq!(mutation.transaction_type, CreditTransactionType::Deduction);
        assert!(mutation.description.contains("expired"));

        let entry = apply("s", 1, &current, &mutation, &policy, now).unwrap();
        assert_eq!(entry.balance.balance, 0);
        assert!(expiry_deduction(&entry.balance, now).is_none());
    }

    #[test]
    fn test_failed_write_leaves_ledger_untouched() {
        let mut ledger = CreditLedger::new("store-1");
        let policy = LedgerPolicy::default();
        let now = Utc::now();

        ledger
            .apply(&CreditMutation::admin(CreditTransactionType::Bonus, 1, "admin", "welcome"), &policy, now)
            .unwrap();
        let before = ledger.balance().clone();

        let mut big = CreditMutation::monthly_deduction(now);
        big.amount = -2;
        assert!(ledger.apply(&big, &policy, now).is_err());

        assert_eq!(ledger.balance(), &before);
        assert_eq!(ledger.transactions().len(), 1);
    }

    #[test]
    fn test_random_sequences_keep_chain() {
        let mut rng = rand::thread_rng();
        let policy = LedgerPolicy::default();
        let mut now = at(2026, 1, 1);

        for _ in 0..50 {
            let mut ledger = CreditLedger::new("store-r");
            for step in 0..40 {
                now += Duration::days(rng.gen_range(0..20));
                let mutation = match rng.gen_range(0..5) {
                    0 => CreditMutation::purchase(rng.gen_range(1..=12), payment(&format!("cs_{}", step))),
                    1 => CreditMutation::monthly_deduction(now),
                    2 => CreditMutation::admin(CreditTransactionType::Bonus, rng.gen_range(1..3), "a", "bonus"),
                    3 => CreditMutation::admin(CreditTransactionType::Adjustment, rng.gen_range(-6..6), "a", "fix"),
                    _ => CreditMutation::admin(CreditTransactionType::Refund, rng.gen_range(-3..3), "a", "refund"),
                };
                let before = ledger.balance().clone();
                if ledger.apply(&mutation, &policy, now).is_err() {
                    assert_eq!(ledger.balance(), &before);
                }
                assert!(ledger.balance().balance >= 0);
            }
            ledger.verify().unwrap();
        }
    }

    #[test]
    fn test_verify_chain_detects_gap() {
        let policy = LedgerPolicy::default();
        let now = Utc::now();
        let mut ledger = CreditLedger::new("s");
        ledger.apply(&CreditMutation::purchase(2, payment("a")), &policy, now).unwrap();
        ledger.apply(&CreditMutation::purchase(1, payment("b")), &policy, now).unwrap();

        let mut txs = ledger.transactions().to_vec();
        txs[1].balance_before = 5;
        txs[1].balance_after = 6;
        assert!(matches!(verify_chain(&txs), Err(LedgerError::ChainMismatch { expected: 2, found: 5 })));
    }
}
