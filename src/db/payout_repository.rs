use chrono::{DateTime, Utc};
use log::{debug, warn};
use sqlx::sqlite::SqlitePool;
use sqlx::Error as SqlxError;

use super::models::PayoutRecord;
use crate::error::PayoutError;
use crate::payout::model::PayoutStatus;

const PAYOUT_COLUMNS: &str = "id, seller_id, store_id, amount, currency, commission_count, payment_method,
    payment_reference, period_start, period_end, notes, status, processed_at, created_at";

/// 상태 전이와 함께 연결된 수수료 기록에 적용할 변경
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkedCommissions {
    /// 그대로 둠
    Keep,
    /// 지급 완료 처리
    MarkPaid(DateTime<Utc>),
    /// 정산 묶음에서 풀어 다음 정산 대상으로 되돌림
    Release,
}

/// 정산 상태 변경 내용
#[derive(Debug, Clone, Default)]
pub struct PayoutChanges<'a> {
    pub payment_reference: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// 판매자 정산 저장소
#[derive(Clone)]
pub struct PayoutRepository {
    pool: SqlitePool,
}

impl PayoutRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 정산 생성과 수수료 기록 연결 (한 트랜잭션)
    ///
    /// 조회 이후 다른 정산에 묶이거나 취소된 기록이 있으면 `ConcurrentModification`입니다.
    pub async fn create(&self, payout: &PayoutRecord, commission_ids: &[String]) -> Result<(), PayoutError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO payouts ({})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            PAYOUT_COLUMNS
        );
        sqlx::query(&sql)
            .bind(&payout.id)
            .bind(&payout.seller_id)
            .bind(&payout.store_id)
            .bind(&payout.amount)
            .bind(&payout.currency)
            .bind(payout.commission_count)
            .bind(&payout.payment_method)
            .bind(&payout.payment_reference)
            .bind(payout.period_start)
            .bind(payout.period_end)
            .bind(&payout.notes)
            .bind(&payout.status)
            .bind(payout.processed_at)
            .bind(payout.created_at)
            .execute(&mut *tx)
            .await?;

        for commission_id in commission_ids {
            let linked = sqlx::query(
                "UPDATE commissions SET payout_id = ?
                 WHERE id = ? AND payout_id IS NULL AND status = 'CONFIRMED'"
            )
            .bind(&payout.id)
            .bind(commission_id)
            .execute(&mut *tx)
            .await?;

            if linked.rows_affected() == 0 {
                warn!("⚠️ 정산 연결 충돌: 수수료 기록 {}", commission_id);
                return Err(PayoutError::ConcurrentModification(commission_id.clone()));
            }
        }

        tx.commit().await?;
        debug!("💾 정산 저장: {} ({}건 연결)", payout.id, commission_ids.len());
        Ok(())
    }

    pub async fn find(&self, id: &str) -> Result<Option<PayoutRecord>, SqlxError> {
        let sql = format!("SELECT {} FROM payouts WHERE id = ?", PAYOUT_COLUMNS);
        sqlx::query_as::<_, PayoutRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// 판매자 정산 목록 (최신순)
    pub async fn find_by_seller(&self, seller_id: &str, limit: i64, offset: i64) -> Result<Vec<PayoutRecord>, SqlxError> {
        let sql = format!(
            "SELECT {} FROM payouts
             WHERE seller_id = ?
             ORDER BY created_at DESC, id ASC
             LIMIT ? OFFSET ?",
            PAYOUT_COLUMNS
        );
        sqlx::query_as::<_, PayoutRecord>(&sql)
            .bind(seller_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    /// 상태 전이 (한 트랜잭션)
    ///
    /// 읽은 상태(`from`)가 그대로일 때만 바꿉니다.
    pub async fn transition(
        &self,
        id: &str,
        from: PayoutStatus,
        to: PayoutStatus,
        changes: &PayoutChanges<'_>,
        linked: LinkedCommissions,
    ) -> Result<(), PayoutError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE payouts
             SET status = ?,
                 payment_reference = COALESCE(?, payment_reference),
                 notes = COALESCE(?, notes),
                 processed_at = COALESCE(?, processed_at)
             WHERE id = ? AND status = ?"
        )
        .bind(to.as_str())
        .bind(changes.payment_reference)
        .bind(changes.notes)
        .bind(changes.processed_at)
        .bind(id)
        .bind(from.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            warn!("⚠️ 정산 상태 변경 충돌: {} ({} → {})", id, from, to);
            return Err(PayoutError::ConcurrentModification(id.to_string()));
        }

        match linked {
            LinkedCommissions::Keep => {}
            LinkedCommissions::MarkPaid(paid_at) => {
                sqlx::query("UPDATE commissions SET status = 'PAID', paid_at = ? WHERE payout_id = ?")
                    .bind(paid_at)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            LinkedCommissions::Release => {
                sqlx::query("UPDATE commissions SET payout_id = NULL WHERE payout_id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        debug!("💾 정산 상태 변경: {} ({} → {})", id, from, to);
        Ok(())
    }
}
