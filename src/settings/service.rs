use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use super::{keys, CreditSettings, PayoutSettings};
use crate::commission::model::{CommissionConfig, ConfigWarning};
use crate::db::models::{SettingRecord, SettingsAuditRecord};
use crate::db::SettingsRepository;
use crate::error::{AppError, SettingsError};

/// 설정 변경 결과
#[derive(Debug, Clone, Serialize)]
pub struct SettingUpdate {
    pub setting: SettingRecord,
    /// 저장은 됐지만 운영자가 알아야 할 경고
    pub warnings: Vec<ConfigWarning>,
}

/// 설정 서비스
///
/// 읽기는 스냅샷 단위로, 쓰기는 검증 후 감사 로그와 함께 저장합니다.
#[derive(Clone)]
pub struct SettingsService {
    repo: SettingsRepository,
}

impl SettingsService {
    pub fn new(repo: SettingsRepository) -> Self {
        Self { repo }
    }

    pub async fn get(&self, key: &str) -> Result<SettingRecord, SettingsError> {
        self.repo
            .find(key)
            .await?
            .ok_or_else(|| SettingsError::NotFound(key.to_string()))
    }

    pub async fn list(&self, category: &str) -> Result<Vec<SettingRecord>, SettingsError> {
        Ok(self.repo.find_by_category(category).await?)
    }

    /// 현재 수수료 설정
    pub async fn commission_config(&self) -> Result<CommissionConfig, SettingsError> {
        let snapshot = self.repo.snapshot(&keys::COMMISSION_KEYS).await?;
        CommissionConfig::from_snapshot(&snapshot)
    }

    /// 현재 크레딧 설정
    pub async fn credit_settings(&self) -> Result<CreditSettings, SettingsError> {
        let snapshot = self.repo.snapshot(&keys::CREDIT_KEYS).await?;
        CreditSettings::from_snapshot(&snapshot)
    }

    /// 현재 정산 설정
    pub async fn payout_settings(&self) -> Result<PayoutSettings, SettingsError> {
        let snapshot = self.repo.snapshot(&keys::PAYOUT_KEYS).await?;
        PayoutSettings::from_snapshot(&snapshot)
    }

    /// 설정 값 변경
    ///
    /// 수수료/크레딧 키는 바뀔 값을 반영한 전체 설정으로 검증합니다.
    /// 검증 에러는 저장을 막고, 경고는 저장 후 함께 돌려줍니다.
    pub async fn update(
        &self,
        key: &str,
        value: Value,
        changed_by: &str,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SettingUpdate, AppError> {
        if changed_by.trim().is_empty() {
            return Err(AppError::Validation("changed_by는 비워둘 수 없습니다".into()));
        }

        let current = self.get(key).await?;
        if !current.is_editable {
            return Err(SettingsError::NotEditable(key.to_string()).into());
        }
        if value.is_null() {
            return Err(SettingsError::InvalidValue {
                key: key.to_string(),
                reason: "null 값은 저장할 수 없습니다".into(),
            }
            .into());
        }

        let mut warnings = Vec::new();
        if keys::COMMISSION_KEYS.contains(&key) {
            let snapshot = self.repo.snapshot(&keys::COMMISSION_KEYS).await?;
            let config = CommissionConfig::from_snapshot(&snapshot.with_value(key, value.clone()))?;
            config.validate()?;
            warnings = config.warnings();
        } else if keys::CREDIT_KEYS.contains(&key) {
            let snapshot = self.repo.snapshot(&keys::CREDIT_KEYS).await?;
            CreditSettings::from_snapshot(&snapshot.with_value(key, value.clone()))?.validate()?;
        } else if keys::PAYOUT_KEYS.contains(&key) {
            let snapshot = self.repo.snapshot(&keys::PAYOUT_KEYS).await?;
            PayoutSettings::from_snapshot(&snapshot.with_value(key, value.clone()))?.validate()?;
        }

        let new_value = value.to_string();
        self.repo
            .update_with_audit(key, Some(&current.value), &new_value, changed_by, reason, now)
            .await?;

        info!("⚙️  설정 변경: {} = {} ({})", key, new_value, changed_by);
        for warning in &warnings {
            warn!("⚠️ 설정 경고 ({}): {}", key, warning);
        }

        let setting = self.get(key).await?;
        Ok(SettingUpdate { setting, warnings })
    }

    /// 설정 잠금/해제
    pub async fn set_editable(&self, key: &str, is_editable: bool) -> Result<SettingRecord, SettingsError> {
        if self.repo.set_editable(key, is_editable).await? == 0 {
            return Err(SettingsError::NotFound(key.to_string()));
        }
        info!("🔒 설정 잠금 변경: {} (is_editable = {})", key, is_editable);
        self.get(key).await
    }

    /// 키별 변경 이력
    pub async fn audit_log(&self, key: &str, limit: i64) -> Result<Vec<SettingsAuditRecord>, SettingsError> {
        Ok(self.repo.audit_log(key, limit).await?)
    }
}
