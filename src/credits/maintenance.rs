//! 크레딧 정기 작업
//!
//! 만료 → 월별 차감 → 유예 종료 처리 순으로 모든 스토어를 훑고,
//! 잔액이 적은 스토어와 유예 중인 스토어를 보고서로 모읍니다.
//! 한 스토어의 실패는 기록만 하고 다음 스토어로 넘어갑니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use super::model::StoreStatus;
use super::service::CreditService;
use crate::error::AppError;

/// 정기 작업 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceOptions {
    /// 월별 차감 실행 여부
    pub monthly_deduction: bool,
}

impl MaintenanceOptions {
    /// 매월 1일에만 월별 차감
    pub fn for_time(now: DateTime<Utc>) -> Self {
        Self {
            monthly_deduction: now.day() == 1,
        }
    }
}

/// 잔액이 적은 스토어
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowCreditStore {
    pub store_id: String,
    pub store_name: String,
    pub credits_balance: i64,
}

/// 실패한 작업
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceFailure {
    pub store_id: String,
    pub stage: &'static str,
    pub code: &'static str,
    pub message: String,
}

/// 정기 작업 결과
#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceReport {
    pub ran_at: DateTime<Utc>,
    pub monthly_deduction: bool,
    pub expired: Vec<String>,
    pub deducted: Vec<String>,
    /// 이번 차감으로 잔액이 0이 된 스토어
    pub depleted: Vec<String>,
    pub suspended: Vec<String>,
    pub low_credit: Vec<LowCreditStore>,
    pub in_grace: Vec<String>,
    pub failed: Vec<MaintenanceFailure>,
}

impl MaintenanceReport {
    fn new(ran_at: DateTime<Utc>, options: MaintenanceOptions) -> Self {
        Self {
            ran_at,
            monthly_deduction: options.monthly_deduction,
            expired: Vec::new(),
            deducted: Vec::new(),
            depleted: Vec::new(),
            suspended: Vec::new(),
            low_credit: Vec::new(),
            in_grace: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn fail(&mut self, store_id: &str, stage: &'static str, err: AppError) {
        warn!("⚠️ 정기 작업 실패: 스토어 {} ({}) - {}", store_id, stage, err);
        self.failed.push(MaintenanceFailure {
            store_id: store_id.to_string(),
            stage,
            code: err.code(),
            message: err.to_string(),
        });
    }
}

/// 전체 스토어 정기 작업
pub async fn run_maintenance(
    service: &CreditService,
    options: MaintenanceOptions,
    now: DateTime<Utc>,
) -> Result<MaintenanceReport, AppError> {
    let mut report = MaintenanceReport::new(now, options);

    for store in service.stores().await? {
        match service.expire_credits(&store.id, now).await {
            Ok(Some(_)) => report.expired.push(store.id.clone()),
            Ok(None) => {}
            Err(e) => {
                report.fail(&store.id, "expire", e);
                continue;
            }
        }

        if options.monthly_deduction {
            match service.deduct_monthly(&store.id, now).await {
                Ok(Some(tx)) => {
                    report.deducted.push(store.id.clone());
                    if tx.balance_after == 0 {
                        report.depleted.push(store.id.clone());
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    report.fail(&store.id, "deduct", e);
                    continue;
                }
            }
        }

        match service.enforce_grace(&store.id, now).await {
            Ok(true) => report.suspended.push(store.id.clone()),
            Ok(false) => {}
            Err(e) => report.fail(&store.id, "grace", e),
        }
    }

    let threshold = service.credit_settings().await?.low_credit_threshold;
    for store in service.stores().await? {
        if store.store_status().ok() != Some(StoreStatus::Active) {
            continue;
        }
        let balance = store.credit_balance();
        if balance.balance > 0 && balance.balance <= threshold {
            report.low_credit.push(LowCreditStore {
                store_id: store.id.clone(),
                store_name: store.name.clone(),
                credits_balance: balance.balance,
            });
        }
        if balance.in_grace(now) {
            report.in_grace.push(store.id.clone());
        }
    }

    info!(
        "🧾 크레딧 정기 작업 완료: 만료 {}, 차감 {}, 소진 {}, 게시 중단 {}, 실패 {}",
        report.expired.len(),
        report.deducted.len(),
        report.depleted.len(),
        report.suspended.len(),
        report.failed.len()
    );

    Ok(report)
}

/// 주기적 정기 작업 태스크 시작
pub fn spawn_maintenance_loop(service: Arc<CreditService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let now = Utc::now();
            if let Err(e) = run_maintenance(&service, MaintenanceOptions::for_time(now), now).await {
                error!("❌ 크레딧 정기 작업 오류: {}", e);
            }
        }
    })
}
