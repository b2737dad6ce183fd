use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::commission::model::Clamp;
use crate::commission::record::{CommissionEntry, CommissionStatus};
use crate::commission::rules::{CommissionRule, RuleType};
use crate::credits::model::{CreditBalance, CreditTransaction, CreditTransactionType, StoreStatus};
use crate::error::{CommissionError, LedgerError, PayoutError};
use crate::payout::model::{Payout, PayoutStatus};

/// 시스템 설정 DB 모델 (값은 JSON 텍스트)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SettingRecord {
    pub key: String,
    pub category: String,
    pub value: String,
    pub is_editable: bool,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// 설정 변경 감사 로그 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SettingsAuditRecord {
    pub id: i64,
    pub setting_key: String,
    pub old_value: Option<String>,
    pub new_value: String,
    pub changed_by: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 스토어 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoreRecord {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub status: String,
    pub credits_balance: i64,
    pub credits_expires_at: Option<DateTime<Utc>>,
    pub credits_last_deducted_at: Option<DateTime<Utc>>,
    pub credits_grace_ends_at: Option<DateTime<Utc>>,
    pub listings_suspended: bool,
    pub created_at: DateTime<Utc>,
}

impl StoreRecord {
    pub fn store_status(&self) -> Result<StoreStatus, LedgerError> {
        StoreStatus::from_str(&self.status).map_err(LedgerError::CorruptRecord)
    }

    pub fn credit_balance(&self) -> CreditBalance {
        CreditBalance {
            balance: self.credits_balance,
            expires_at: self.credits_expires_at,
            last_deducted_at: self.credits_last_deducted_at,
            grace_ends_at: self.credits_grace_ends_at,
        }
    }
}

/// 크레딧 거래 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreditTransactionRecord {
    pub id: String,
    pub store_id: String,
    pub sequence: i64,
    pub transaction_type: String,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub amount_paid: Option<String>,
    pub currency: Option<String>,
    pub payment_session_id: Option<String>,
    pub payment_reference: Option<String>,
    pub description: String,
    pub notes: Option<String>,
    pub performed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&CreditTransaction> for CreditTransactionRecord {
    fn from(tx: &CreditTransaction) -> Self {
        Self {
            id: tx.id.clone(),
            store_id: tx.store_id.clone(),
            sequence: tx.sequence,
            transaction_type: tx.transaction_type.as_str().to_string(),
            amount: tx.amount,
            balance_before: tx.balance_before,
            balance_after: tx.balance_after,
            amount_paid: tx.amount_paid.map(|d| d.to_string()),
            currency: tx.currency.clone(),
            payment_session_id: tx.payment_session_id.clone(),
            payment_reference: tx.payment_reference.clone(),
            description: tx.description.clone(),
            notes: tx.notes.clone(),
            performed_by: tx.performed_by.clone(),
            created_at: tx.created_at,
        }
    }
}

impl TryFrom<CreditTransactionRecord> for CreditTransaction {
    type Error = LedgerError;

    fn try_from(record: CreditTransactionRecord) -> Result<Self, Self::Error> {
        let transaction_type =
            CreditTransactionType::from_str(&record.transaction_type).map_err(LedgerError::CorruptRecord)?;
        let amount_paid = record
            .amount_paid
            .as_deref()
            .map(Decimal::from_str)
            .transpose()
            .map_err(|e| LedgerError::CorruptRecord(format!("거래 {} 결제 금액: {}", record.id, e)))?;

        Ok(CreditTransaction {
            id: record.id,
            store_id: record.store_id,
            sequence: record.sequence,
            transaction_type,
            amount: record.amount,
            balance_before: record.balance_before,
            balance_after: record.balance_after,
            amount_paid,
            currency: record.currency,
            payment_session_id: record.payment_session_id,
            payment_reference: record.payment_reference,
            description: record.description,
            notes: record.notes,
            performed_by: record.performed_by,
            created_at: record.created_at,
        })
    }
}

/// 수수료 규칙 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommissionRuleRecord {
    pub id: String,
    pub seller_id: Option<String>,
    pub category_id: Option<String>,
    pub rule_type: String,
    pub value: String,
    pub min_order_value: Option<String>,
    pub max_order_value: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub priority: i64,
    pub is_active: bool,
    pub is_override: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&CommissionRule> for CommissionRuleRecord {
    fn from(rule: &CommissionRule) -> Self {
        Self {
            id: rule.id.clone(),
            seller_id: rule.seller_id.clone(),
            category_id: rule.category_id.clone(),
            rule_type: rule.rule_type.as_str().to_string(),
            value: rule.value.to_string(),
            min_order_value: rule.min_order_value.map(|d| d.to_string()),
            max_order_value: rule.max_order_value.map(|d| d.to_string()),
            valid_from: rule.valid_from,
            valid_until: rule.valid_until,
            priority: rule.priority,
            is_active: rule.is_active,
            is_override: rule.is_override,
            created_at: rule.created_at,
        }
    }
}

impl TryFrom<CommissionRuleRecord> for CommissionRule {
    type Error = CommissionError;

    fn try_from(record: CommissionRuleRecord) -> Result<Self, Self::Error> {
        let decimal = |field: &str, text: &str| {
            Decimal::from_str(text)
                .map_err(|e| CommissionError::InvalidRule(format!("규칙 {} {}: {}", record.id, field, e)))
        };

        Ok(CommissionRule {
            rule_type: RuleType::from_str(&record.rule_type)?,
            value: decimal("value", &record.value)?,
            min_order_value: record
                .min_order_value
                .as_deref()
                .map(|v| decimal("min_order_value", v))
                .transpose()?,
            max_order_value: record
                .max_order_value
                .as_deref()
                .map(|v| decimal("max_order_value", v))
                .transpose()?,
            id: record.id.clone(),
            seller_id: record.seller_id.clone(),
            category_id: record.category_id.clone(),
            valid_from: record.valid_from,
            valid_until: record.valid_until,
            priority: record.priority,
            is_active: record.is_active,
            is_override: record.is_override,
            created_at: record.created_at,
        })
    }
}

/// 배송 송장 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShipmentRecord {
    pub id: String,
    pub order_id: String,
    pub carrier: String,
    pub tracking_number: String,
    pub rate: String,
    pub currency: String,
    pub label_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 수수료 기록 DB 모델 (금액은 TEXT)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommissionRecord {
    pub id: String,
    pub order_id: String,
    pub order_item_id: String,
    pub seller_id: String,
    pub store_id: String,
    pub rule_id: Option<String>,
    pub order_amount: String,
    pub shipping_amount: String,
    pub commission_amount: String,
    pub seller_receives: String,
    pub clamp: String,
    pub currency: String,
    pub status: String,
    pub payout_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&CommissionEntry> for CommissionRecord {
    fn from(entry: &CommissionEntry) -> Self {
        Self {
            id: entry.id.clone(),
            order_id: entry.order_id.clone(),
            order_item_id: entry.order_item_id.clone(),
            seller_id: entry.seller_id.clone(),
            store_id: entry.store_id.clone(),
            rule_id: entry.rule_id.clone(),
            order_amount: entry.order_amount.to_string(),
            shipping_amount: entry.shipping_amount.to_string(),
            commission_amount: entry.commission_amount.to_string(),
            seller_receives: entry.seller_receives.to_string(),
            clamp: entry.clamp.as_str().to_string(),
            currency: entry.currency.clone(),
            status: entry.status.as_str().to_string(),
            payout_id: entry.payout_id.clone(),
            paid_at: entry.paid_at,
            created_at: entry.created_at,
        }
    }
}

impl TryFrom<CommissionRecord> for CommissionEntry {
    type Error = CommissionError;

    fn try_from(record: CommissionRecord) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, e: String| CommissionError::CorruptRecord(format!("수수료 기록 {} {}: {}", record.id, field, e));
        let decimal = |field: &str, text: &str| Decimal::from_str(text).map_err(|e| corrupt(field, e.to_string()));

        Ok(CommissionEntry {
            order_amount: decimal("order_amount", &record.order_amount)?,
            shipping_amount: decimal("shipping_amount", &record.shipping_amount)?,
            commission_amount: decimal("commission_amount", &record.commission_amount)?,
            seller_receives: decimal("seller_receives", &record.seller_receives)?,
            clamp: Clamp::from_str(&record.clamp).map_err(|e| corrupt("clamp", e))?,
            status: CommissionStatus::from_str(&record.status).map_err(|e| corrupt("status", e))?,
            id: record.id.clone(),
            order_id: record.order_id.clone(),
            order_item_id: record.order_item_id.clone(),
            seller_id: record.seller_id.clone(),
            store_id: record.store_id.clone(),
            rule_id: record.rule_id.clone(),
            currency: record.currency.clone(),
            payout_id: record.payout_id.clone(),
            paid_at: record.paid_at,
            created_at: record.created_at,
        })
    }
}

/// 정산 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PayoutRecord {
    pub id: String,
    pub seller_id: String,
    pub store_id: String,
    pub amount: String,
    pub currency: String,
    pub commission_count: i64,
    pub payment_method: String,
    pub payment_reference: Option<String>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub notes: Option<String>,
    pub status: String,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Payout> for PayoutRecord {
    fn from(payout: &Payout) -> Self {
        Self {
            id: payout.id.clone(),
            seller_id: payout.seller_id.clone(),
            store_id: payout.store_id.clone(),
            amount: payout.amount.to_string(),
            currency: payout.currency.clone(),
            commission_count: payout.commission_count,
            payment_method: payout.payment_method.clone(),
            payment_reference: payout.payment_reference.clone(),
            period_start: payout.period_start,
            period_end: payout.period_end,
            notes: payout.notes.clone(),
            status: payout.status.as_str().to_string(),
            processed_at: payout.processed_at,
            created_at: payout.created_at,
        }
    }
}

impl TryFrom<PayoutRecord> for Payout {
    type Error = PayoutError;

    fn try_from(record: PayoutRecord) -> Result<Self, Self::Error> {
        let amount = Decimal::from_str(&record.amount)
            .map_err(|e| PayoutError::CorruptRecord(format!("정산 {} 금액: {}", record.id, e)))?;
        let status = PayoutStatus::from_str(&record.status).map_err(PayoutError::CorruptRecord)?;

        Ok(Payout {
            id: record.id,
            seller_id: record.seller_id,
            store_id: record.store_id,
            amount,
            currency: record.currency,
            commission_count: record.commission_count,
            payment_method: record.payment_method,
            payment_reference: record.payment_reference,
            period_start: record.period_start,
            period_end: record.period_end,
            notes: record.notes,
            status,
            processed_at: record.processed_at,
            created_at: record.created_at,
        })
    }
}
