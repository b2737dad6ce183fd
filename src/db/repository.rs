use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::warn;
use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use sqlx::Error as SqlxError;

use super::models::{CommissionRuleRecord, SettingRecord, SettingsAuditRecord, ShipmentRecord};
use crate::settings::SettingsSnapshot;

/// 시스템 설정 저장소
#[derive(Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 키로 설정 조회
    pub async fn find(&self, key: &str) -> Result<Option<SettingRecord>, SqlxError> {
        sqlx::query_as::<_, SettingRecord>(
            "SELECT key, category, value, is_editable, updated_by, updated_at
             FROM settings
             WHERE key = ?"
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
    }

    /// 카테고리별 설정 조회
    pub async fn find_by_category(&self, category: &str) -> Result<Vec<SettingRecord>, SqlxError> {
        sqlx::query_as::<_, SettingRecord>(
            "SELECT key, category, value, is_editable, updated_by, updated_at
             FROM settings
             WHERE category = ?
             ORDER BY key ASC"
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await
    }

    /// 여러 키를 한 번의 조회로 읽어 스냅샷 생성
    pub async fn snapshot(&self, keys: &[&str]) -> Result<SettingsSnapshot, SqlxError> {
        if keys.is_empty() {
            return Ok(SettingsSnapshot::default());
        }

        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!("SELECT key, value FROM settings WHERE key IN ({})", placeholders);
        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for key in keys {
            query = query.bind(*key);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let values: HashMap<String, Value> = rows
            .into_iter()
            .map(|(key, raw)| {
                let value = serde_json::from_str(&raw).unwrap_or_else(|_| {
                    warn!("⚠️ JSON이 아닌 설정 값, 문자열로 처리: {}", key);
                    Value::String(raw)
                });
                (key, value)
            })
            .collect();

        Ok(SettingsSnapshot::new(values))
    }

    /// 설정 값 변경과 감사 로그 기록 (한 트랜잭션)
    pub async fn update_with_audit(
        &self,
        key: &str,
        old_value: Option<&str>,
        new_value: &str,
        changed_by: &str,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), SqlxError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE settings SET value = ?, updated_by = ?, updated_at = ? WHERE key = ?")
            .bind(new_value)
            .bind(changed_by)
            .bind(now)
            .bind(key)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO settings_audit_logs (setting_key, old_value, new_value, changed_by, reason, created_at)
             VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(key)
        .bind(old_value)
        .bind(new_value)
        .bind(changed_by)
        .bind(reason)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// 설정 잠금/해제
    pub async fn set_editable(&self, key: &str, is_editable: bool) -> Result<u64, SqlxError> {
        let result = sqlx::query("UPDATE settings SET is_editable = ? WHERE key = ?")
            .bind(is_editable)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// 키별 감사 로그 (최신순)
    pub async fn audit_log(&self, key: &str, limit: i64) -> Result<Vec<SettingsAuditRecord>, SqlxError> {
        sqlx::query_as::<_, SettingsAuditRecord>(
            "SELECT id, setting_key, old_value, new_value, changed_by, reason, created_at
             FROM settings_audit_logs
             WHERE setting_key = ?
             ORDER BY id DESC
             LIMIT ?"
        )
        .bind(key)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}

/// 수수료 규칙 저장소
#[derive(Clone)]
pub struct CommissionRuleRepository {
    pool: SqlitePool,
}

impl CommissionRuleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 규칙 저장
    pub async fn save(&self, rule: &CommissionRuleRecord) -> Result<(), SqlxError> {
        sqlx::query(
            "INSERT INTO commission_rules
             (id, seller_id, category_id, rule_type, value, min_order_value, max_order_value,
              valid_from, valid_until, priority, is_active, is_override, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&rule.id)
        .bind(&rule.seller_id)
        .bind(&rule.category_id)
        .bind(&rule.rule_type)
        .bind(&rule.value)
        .bind(&rule.min_order_value)
        .bind(&rule.max_order_value)
        .bind(rule.valid_from)
        .bind(rule.valid_until)
        .bind(rule.priority)
        .bind(rule.is_active)
        .bind(rule.is_override)
        .bind(rule.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 판매자 후보 규칙 조회 (판매자 전용 + 공통 규칙)
    pub async fn find_candidates(&self, seller_id: &str) -> Result<Vec<CommissionRuleRecord>, SqlxError> {
        sqlx::query_as::<_, CommissionRuleRecord>(
            "SELECT id, seller_id, category_id, rule_type, value, min_order_value, max_order_value,
                    valid_from, valid_until, priority, is_active, is_override, created_at
             FROM commission_rules
             WHERE is_active = 1 AND (seller_id IS NULL OR seller_id = ?)
             ORDER BY priority DESC, created_at DESC"
        )
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await
    }

    /// 전체 규칙 조회
    pub async fn find_all(&self) -> Result<Vec<CommissionRuleRecord>, SqlxError> {
        sqlx::query_as::<_, CommissionRuleRecord>(
            "SELECT id, seller_id, category_id, rule_type, value, min_order_value, max_order_value,
                    valid_from, valid_until, priority, is_active, is_override, created_at
             FROM commission_rules
             ORDER BY priority DESC, created_at DESC"
        )
        .fetch_all(&self.pool)
        .await
    }

    /// 규칙 비활성화
    pub async fn deactivate(&self, id: &str) -> Result<u64, SqlxError> {
        let result = sqlx::query("UPDATE commission_rules SET is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// 배송 송장 저장소
#[derive(Clone)]
pub struct ShipmentRepository {
    pool: SqlitePool,
}

impl ShipmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 송장 저장
    pub async fn save(&self, shipment: &ShipmentRecord) -> Result<(), SqlxError> {
        sqlx::query(
            "INSERT INTO shipments (id, order_id, carrier, tracking_number, rate, currency, label_url, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&shipment.id)
        .bind(&shipment.order_id)
        .bind(&shipment.carrier)
        .bind(&shipment.tracking_number)
        .bind(&shipment.rate)
        .bind(&shipment.currency)
        .bind(&shipment.label_url)
        .bind(shipment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 주문별 송장 조회
    pub async fn find_by_order(&self, order_id: &str) -> Result<Vec<ShipmentRecord>, SqlxError> {
        sqlx::query_as::<_, ShipmentRecord>(
            "SELECT id, order_id, carrier, tracking_number, rate, currency, label_url, created_at
             FROM shipments
             WHERE order_id = ?
             ORDER BY created_at DESC"
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
    }
}
