pub mod commission_repository;
pub mod credit_repository;
pub mod models;
pub mod payout_repository;
pub mod repository;

use log::info;
use serde_json::{json, Value};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Error as SqlxError;

use crate::settings::keys;

pub use commission_repository::CommissionEntryRepository;
pub use credit_repository::CreditRepository;
pub use payout_repository::PayoutRepository;
pub use repository::{CommissionRuleRepository, SettingsRepository, ShipmentRepository};

/// SQLite 데이터베이스 초기화 및 연결
///
/// `sqlite::memory:`는 연결마다 별도 DB가 되므로 `max_connections`를 1로 둬야 합니다.
pub async fn init_database(database_url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    info!("🗄️  SQLite 데이터베이스 초기화 중... ({})", database_url);

    // 연결 풀 생성
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    // 테이블 생성
    create_tables(&pool).await?;
    seed_default_settings(&pool).await?;

    info!("✅ 데이터베이스 초기화 완료");

    Ok(pool)
}

/// 필요한 테이블 생성
async fn create_tables(pool: &SqlitePool) -> Result<(), SqlxError> {
    // 시스템 설정 테이블 (값은 JSON 텍스트)
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            category TEXT NOT NULL,
            value TEXT NOT NULL,
            is_editable INTEGER NOT NULL DEFAULT 1,
            updated_by TEXT,
            updated_at DATETIME
        )"
    )
    .execute(pool)
    .await?;

    // 설정 변경 감사 로그
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS settings_audit_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            setting_key TEXT NOT NULL,
            old_value TEXT,
            new_value TEXT NOT NULL,
            changed_by TEXT NOT NULL,
            reason TEXT,
            created_at DATETIME NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    // 스토어 및 크레딧 잔액
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS stores (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            status TEXT NOT NULL,
            credits_balance INTEGER NOT NULL DEFAULT 0 CHECK (credits_balance >= 0),
            credits_expires_at DATETIME,
            credits_last_deducted_at DATETIME,
            credits_grace_ends_at DATETIME,
            listings_suspended INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    // 크레딧 거래 원장 (추가 전용)
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS credit_transactions (
            id TEXT PRIMARY KEY,
            store_id TEXT NOT NULL REFERENCES stores(id),
            sequence INTEGER NOT NULL,
            transaction_type TEXT NOT NULL,
            amount INTEGER NOT NULL,
            balance_before INTEGER NOT NULL,
            balance_after INTEGER NOT NULL,
            amount_paid TEXT,
            currency TEXT,
            payment_session_id TEXT UNIQUE,
            payment_reference TEXT,
            description TEXT NOT NULL,
            notes TEXT,
            performed_by TEXT,
            created_at DATETIME NOT NULL,
            UNIQUE (store_id, sequence)
        )"
    )
    .execute(pool)
    .await?;

    // 수수료 규칙
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS commission_rules (
            id TEXT PRIMARY KEY,
            seller_id TEXT,
            category_id TEXT,
            rule_type TEXT NOT NULL,
            value TEXT NOT NULL,
            min_order_value TEXT,
            max_order_value TEXT,
            valid_from DATETIME,
            valid_until DATETIME,
            priority INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_override INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    // 주문 항목별 수수료 기록
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS commissions (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL,
            order_item_id TEXT NOT NULL UNIQUE,
            seller_id TEXT NOT NULL,
            store_id TEXT NOT NULL,
            rule_id TEXT,
            order_amount TEXT NOT NULL,
            shipping_amount TEXT NOT NULL,
            commission_amount TEXT NOT NULL,
            seller_receives TEXT NOT NULL,
            clamp TEXT NOT NULL,
            currency TEXT NOT NULL,
            status TEXT NOT NULL,
            payout_id TEXT,
            paid_at DATETIME,
            created_at DATETIME NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    // 판매자 정산 묶음
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS payouts (
            id TEXT PRIMARY KEY,
            seller_id TEXT NOT NULL,
            store_id TEXT NOT NULL,
            amount TEXT NOT NULL,
            currency TEXT NOT NULL,
            commission_count INTEGER NOT NULL,
            payment_method TEXT NOT NULL,
            payment_reference TEXT,
            period_start DATETIME NOT NULL,
            period_end DATETIME NOT NULL,
            notes TEXT,
            status TEXT NOT NULL,
            processed_at DATETIME,
            created_at DATETIME NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    // 배송 송장
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS shipments (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL,
            carrier TEXT NOT NULL,
            tracking_number TEXT NOT NULL,
            rate TEXT NOT NULL,
            currency TEXT NOT NULL,
            label_url TEXT,
            created_at DATETIME NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    // 인덱스 생성
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_credit_tx_store ON credit_transactions(store_id, created_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_settings_category ON settings(category)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_setting ON settings_audit_logs(setting_key)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_shipments_order ON shipments(order_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_commissions_order ON commissions(order_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_commissions_seller ON commissions(seller_id, status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_commissions_payout ON commissions(payout_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_payouts_seller ON payouts(seller_id, created_at)")
        .execute(pool)
        .await?;

    info!("📋 테이블 생성 완료");

    Ok(())
}

/// 기본 설정 값 (키, 카테고리, 값)
fn default_settings() -> Vec<(&'static str, &'static str, Value)> {
    vec![
        (keys::GLOBAL_COMMISSION_RATE, "commission", json!(10)),
        (keys::COMMISSION_APPLIES_TO_SHIPPING, "commission", json!(false)),
        (keys::COMMISSION_MIN_AMOUNT, "commission", json!(0)),
        (keys::COMMISSION_MAX_AMOUNT, "commission", json!(0)),
        (keys::COMMISSION_FIXED_FEE, "commission", json!(0)),
        (keys::SELLER_MONTHLY_CREDIT_PRICE, "seller", json!(29.99)),
        (keys::SELLER_CREDIT_GRACE_PERIOD_DAYS, "seller", json!(3)),
        (keys::SELLER_MIN_CREDIT_PURCHASE, "seller", json!(1)),
        (keys::SELLER_MAX_CREDIT_PURCHASE, "seller", json!(12)),
        (keys::SELLER_LOW_CREDIT_WARNING_THRESHOLD, "seller", json!(2)),
        (keys::PAYOUT_MINIMUM_AMOUNT, "payout", json!(50)),
    ]
}

/// 없는 설정만 기본값으로 채움
async fn seed_default_settings(pool: &SqlitePool) -> Result<(), SqlxError> {
    for (key, category, value) in default_settings() {
        sqlx::query("INSERT OR IGNORE INTO settings (key, category, value, is_editable) VALUES (?, ?, ?, 1)")
            .bind(key)
            .bind(category)
            .bind(value.to_string())
            .execute(pool)
            .await?;
    }
    Ok(())
}
