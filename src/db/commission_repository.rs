use log::{debug, warn};
use sqlx::sqlite::SqlitePool;
use sqlx::Error as SqlxError;

use super::models::CommissionRecord;
use crate::commission::record::CommissionStatus;

const COMMISSION_COLUMNS: &str = "id, order_id, order_item_id, seller_id, store_id, rule_id, order_amount,
    shipping_amount, commission_amount, seller_receives, clamp, currency, status, payout_id, paid_at, created_at";

/// 주문 수수료 기록 저장소
#[derive(Clone)]
pub struct CommissionEntryRepository {
    pool: SqlitePool,
}

impl CommissionEntryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 주문 하나의 기록을 한 트랜잭션으로 저장
    ///
    /// 주문 항목이 이미 기록돼 있으면 아무것도 쓰지 않고 `false`를 돌려줍니다.
    pub async fn insert_order(&self, records: &[CommissionRecord]) -> Result<bool, SqlxError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "INSERT INTO commissions ({})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            COMMISSION_COLUMNS
        );

        for record in records {
            let inserted = sqlx::query(&sql)
                .bind(&record.id)
                .bind(&record.order_id)
                .bind(&record.order_item_id)
                .bind(&record.seller_id)
                .bind(&record.store_id)
                .bind(&record.rule_id)
                .bind(&record.order_amount)
                .bind(&record.shipping_amount)
                .bind(&record.commission_amount)
                .bind(&record.seller_receives)
                .bind(&record.clamp)
                .bind(&record.currency)
                .bind(&record.status)
                .bind(&record.payout_id)
                .bind(record.paid_at)
                .bind(record.created_at)
                .execute(&mut *tx)
                .await;

            if let Err(e) = inserted {
                let unique = e
                    .as_database_error()
                    .map_or(false, |db| db.is_unique_violation());
                if unique {
                    warn!("⚠️ 이미 기록된 주문 항목: {}", record.order_item_id);
                    return Ok(false);
                }
                return Err(e);
            }
        }

        tx.commit().await?;
        debug!("💾 수수료 기록 저장: {}건", records.len());
        Ok(true)
    }

    /// 주문별 기록
    pub async fn find_by_order(&self, order_id: &str) -> Result<Vec<CommissionRecord>, SqlxError> {
        let sql = format!(
            "SELECT {} FROM commissions WHERE order_id = ? ORDER BY order_item_id ASC",
            COMMISSION_COLUMNS
        );
        sqlx::query_as::<_, CommissionRecord>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await
    }

    /// 판매자 전체 기록 (요약용)
    pub async fn find_by_seller(&self, seller_id: &str) -> Result<Vec<CommissionRecord>, SqlxError> {
        let sql = format!(
            "SELECT {} FROM commissions WHERE seller_id = ? ORDER BY created_at DESC",
            COMMISSION_COLUMNS
        );
        sqlx::query_as::<_, CommissionRecord>(&sql)
            .bind(seller_id)
            .fetch_all(&self.pool)
            .await
    }

    /// 판매자 기록 (최신순, 페이지 단위, 상태 필터)
    pub async fn page_by_seller(
        &self,
        seller_id: &str,
        status: Option<CommissionStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommissionRecord>, SqlxError> {
        let sql = format!(
            "SELECT {} FROM commissions
             WHERE seller_id = ? AND (? IS NULL OR status = ?)
             ORDER BY created_at DESC, id ASC
             LIMIT ? OFFSET ?",
            COMMISSION_COLUMNS
        );
        let status = status.map(|s| s.as_str());
        sqlx::query_as::<_, CommissionRecord>(&sql)
            .bind(seller_id)
            .bind(status)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    /// 판매자 기록 수
    pub async fn count_by_seller(&self, seller_id: &str, status: Option<CommissionStatus>) -> Result<i64, SqlxError> {
        let status = status.map(|s| s.as_str());
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM commissions WHERE seller_id = ? AND (? IS NULL OR status = ?)")
                .bind(seller_id)
                .bind(status)
                .bind(status)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// 전체 기록 (통계용)
    pub async fn find_all(&self) -> Result<Vec<CommissionRecord>, SqlxError> {
        let sql = format!("SELECT {} FROM commissions ORDER BY created_at ASC", COMMISSION_COLUMNS);
        sqlx::query_as::<_, CommissionRecord>(&sql).fetch_all(&self.pool).await
    }

    /// 정산 묶음에 넣을 수 있는 확정 기록
    pub async fn find_payable(&self, seller_id: &str, store_id: &str) -> Result<Vec<CommissionRecord>, SqlxError> {
        let sql = format!(
            "SELECT {} FROM commissions
             WHERE seller_id = ? AND store_id = ? AND status = 'CONFIRMED' AND payout_id IS NULL
             ORDER BY created_at ASC",
            COMMISSION_COLUMNS
        );
        sqlx::query_as::<_, CommissionRecord>(&sql)
            .bind(seller_id)
            .bind(store_id)
            .fetch_all(&self.pool)
            .await
    }

    /// 주문 기록 상태 변경
    ///
    /// `from` 상태이면서 정산 묶음에 들어가지 않은 기록만 바꿉니다.
    pub async fn update_status_for_order(
        &self,
        order_id: &str,
        from: &[CommissionStatus],
        to: CommissionStatus,
    ) -> Result<u64, SqlxError> {
        if from.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; from.len()].join(", ");
        let sql = format!(
            "UPDATE commissions SET status = ?
             WHERE order_id = ? AND payout_id IS NULL AND status IN ({})",
            placeholders
        );
        let mut query = sqlx::query(&sql).bind(to.as_str()).bind(order_id);
        for status in from {
            query = query.bind(status.as_str());
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// 정산 묶음에 연결된 기록
    pub async fn find_by_payout(&self, payout_id: &str) -> Result<Vec<CommissionRecord>, SqlxError> {
        let sql = format!(
            "SELECT {} FROM commissions WHERE payout_id = ? ORDER BY created_at ASC",
            COMMISSION_COLUMNS
        );
        sqlx::query_as::<_, CommissionRecord>(&sql)
            .bind(payout_id)
            .fetch_all(&self.pool)
            .await
    }
}
