use chrono::{DateTime, Utc};
use log::{debug, warn};
use sqlx::sqlite::SqlitePool;
use sqlx::Error as SqlxError;

use super::models::{CreditTransactionRecord, StoreRecord};
use crate::credits::ledger::{self, LedgerEntry, LedgerPolicy};
use crate::credits::model::{CreditBalance, CreditMutation, StoreStatus};
use crate::error::LedgerError;

const STORE_COLUMNS: &str = "id, owner_id, name, status, credits_balance, credits_expires_at,
    credits_last_deducted_at, credits_grace_ends_at, listings_suspended, created_at";

const TRANSACTION_COLUMNS: &str = "id, store_id, sequence, transaction_type, amount, balance_before,
    balance_after, amount_paid, currency, payment_session_id, payment_reference, description, notes,
    performed_by, created_at";

/// 스토어 및 크레딧 원장 저장소
#[derive(Clone)]
pub struct CreditRepository {
    pool: SqlitePool,
}

impl CreditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 스토어 생성 (잔액 0)
    pub async fn create_store(&self, store: &StoreRecord) -> Result<(), SqlxError> {
        sqlx::query(
            "INSERT INTO stores (id, owner_id, name, status, credits_balance, listings_suspended, created_at)
             VALUES (?, ?, ?, ?, 0, 0, ?)"
        )
        .bind(&store.id)
        .bind(&store.owner_id)
        .bind(&store.name)
        .bind(&store.status)
        .bind(store.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 스토어 조회
    pub async fn find_store(&self, store_id: &str) -> Result<Option<StoreRecord>, SqlxError> {
        let sql = format!("SELECT {} FROM stores WHERE id = ?", STORE_COLUMNS);
        sqlx::query_as::<_, StoreRecord>(&sql)
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// 소유자 기준 스토어 조회
    pub async fn find_store_by_owner(&self, owner_id: &str) -> Result<Option<StoreRecord>, SqlxError> {
        let sql = format!("SELECT {} FROM stores WHERE owner_id = ?", STORE_COLUMNS);
        sqlx::query_as::<_, StoreRecord>(&sql)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// 전체 스토어 조회 (정기 작업용)
    pub async fn find_all_stores(&self) -> Result<Vec<StoreRecord>, SqlxError> {
        let sql = format!("SELECT {} FROM stores ORDER BY created_at ASC", STORE_COLUMNS);
        sqlx::query_as::<_, StoreRecord>(&sql).fetch_all(&self.pool).await
    }

    /// 스토어 상태 변경
    pub async fn update_status(&self, store_id: &str, status: StoreStatus) -> Result<u64, SqlxError> {
        let result = sqlx::query("UPDATE stores SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(store_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// 유예 기간이 끝난 스토어의 상품 게시 중단
    ///
    /// 그 사이 잔액이 충전됐으면 아무것도 바꾸지 않습니다.
    pub async fn suspend_listings(&self, store_id: &str) -> Result<bool, SqlxError> {
        let result = sqlx::query(
            "UPDATE stores SET listings_suspended = 1
             WHERE id = ? AND credits_balance = 0 AND listings_suspended = 0"
        )
        .bind(store_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// 결제 세션으로 거래 조회 (웹훅 중복 처리 방지)
    pub async fn find_by_session(&self, session_id: &str) -> Result<Option<CreditTransactionRecord>, SqlxError> {
        let sql = format!(
            "SELECT {} FROM credit_transactions WHERE payment_session_id = ?",
            TRANSACTION_COLUMNS
        );
        sqlx::query_as::<_, CreditTransactionRecord>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// 거래 내역 (최신순, 페이지 단위)
    pub async fn history(
        &self,
        store_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CreditTransactionRecord>, SqlxError> {
        let sql = format!(
            "SELECT {} FROM credit_transactions
             WHERE store_id = ?
             ORDER BY sequence DESC
             LIMIT ? OFFSET ?",
            TRANSACTION_COLUMNS
        );
        sqlx::query_as::<_, CreditTransactionRecord>(&sql)
            .bind(store_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    /// 스토어 거래 수
    pub async fn count_transactions(&self, store_id: &str) -> Result<i64, SqlxError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM credit_transactions WHERE store_id = ?")
            .bind(store_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// 전체 거래 (순번 오름차순, 체인 검증용)
    pub async fn all_transactions(&self, store_id: &str) -> Result<Vec<CreditTransactionRecord>, SqlxError> {
        let sql = format!(
            "SELECT {} FROM credit_transactions WHERE store_id = ? ORDER BY sequence ASC",
            TRANSACTION_COLUMNS
        );
        sqlx::query_as::<_, CreditTransactionRecord>(&sql)
            .bind(store_id)
            .fetch_all(&self.pool)
            .await
    }

    /// 원장에 거래 하나 추가
    ///
    /// 스토어 조회, 변경 요청 생성, 잔액 갱신, 거래 기록을 한 트랜잭션에서 처리합니다.
    /// `build`가 `None`을 돌려주면 아무것도 쓰지 않습니다. 잔액 갱신은 읽은 잔액이
    /// 그대로일 때만 성공하며, 그렇지 않으면 `ConcurrentModification`입니다.
    pub async fn append<F>(
        &self,
        store_id: &str,
        policy: &LedgerPolicy,
        now: DateTime<Utc>,
        build: F,
    ) -> Result<Option<LedgerEntry>, LedgerError>
    where
        F: FnOnce(&StoreRecord, &CreditBalance) -> Result<Option<CreditMutation>, LedgerError> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {} FROM stores WHERE id = ?", STORE_COLUMNS);
        let store = sqlx::query_as::<_, StoreRecord>(&sql)
            .bind(store_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| LedgerError::StoreNotFound(store_id.to_string()))?;

        let current = store.credit_balance();
        let mutation = match build(&store, &current)? {
            Some(mutation) => mutation,
            None => return Ok(None),
        };

        // 직전 거래의 잔액과 스토어 잔액이 이어져야 함
        let last: Option<(i64, i64)> = sqlx::query_as(
            "SELECT sequence, balance_after FROM credit_transactions
             WHERE store_id = ?
             ORDER BY sequence DESC
             LIMIT 1"
        )
        .bind(store_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (expected, sequence) = match last {
            Some((seq, balance_after)) => (balance_after, seq + 1),
            None => (0, 1),
        };
        if expected != current.balance {
            return Err(LedgerError::ChainMismatch {
                expected,
                found: current.balance,
            });
        }

        let entry = ledger::apply(store_id, sequence, &current, &mutation, policy, now)?;
        let next = &entry.balance;

        let updated = sqlx::query(
            "UPDATE stores
             SET credits_balance = ?,
                 credits_expires_at = ?,
                 credits_last_deducted_at = ?,
                 credits_grace_ends_at = ?,
                 listings_suspended = CASE WHEN ? > 0 THEN 0 ELSE listings_suspended END
             WHERE id = ? AND credits_balance = ?"
        )
        .bind(next.balance)
        .bind(next.expires_at)
        .bind(next.last_deducted_at)
        .bind(next.grace_ends_at)
        .bind(next.balance)
        .bind(store_id)
        .bind(current.balance)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            warn!("⚠️ 잔액 갱신 충돌: 스토어 {}", store_id);
            return Err(LedgerError::ConcurrentModification(store_id.to_string()));
        }

        let record = CreditTransactionRecord::from(&entry.transaction);
        let sql = format!(
            "INSERT INTO credit_transactions ({})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TRANSACTION_COLUMNS
        );
        let inserted = sqlx::query(&sql)
            .bind(&record.id)
            .bind(&record.store_id)
            .bind(record.sequence)
            .bind(&record.transaction_type)
            .bind(record.amount)
            .bind(record.balance_before)
            .bind(record.balance_after)
            .bind(&record.amount_paid)
            .bind(&record.currency)
            .bind(&record.payment_session_id)
            .bind(&record.payment_reference)
            .bind(&record.description)
            .bind(&record.notes)
            .bind(&record.performed_by)
            .bind(record.created_at)
            .execute(&mut *tx)
            .await;

        if let Err(e) = inserted {
            let unique = e
                .as_database_error()
                .map_or(false, |db| db.is_unique_violation());
            if unique {
                warn!("⚠️ 거래 순번 또는 결제 세션 중복: 스토어 {} #{}", store_id, sequence);
                return Err(LedgerError::ConcurrentModification(store_id.to_string()));
            }
            return Err(e.into());
        }

        tx.commit().await?;
        debug!("💾 원장 기록 저장: 스토어 {} #{}", store_id, sequence);

        Ok(Some(entry))
    }

    /// 이미 만들어진 변경 요청을 그대로 추가
    pub async fn append_mutation(
        &self,
        store_id: &str,
        mutation: CreditMutation,
        policy: &LedgerPolicy,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        self.append(store_id, policy, now, move |_, _| Ok(Some(mutation)))
            .await?
            .ok_or_else(|| LedgerError::CorruptRecord(format!("스토어 {} 거래가 기록되지 않았습니다", store_id)))
    }
}
