use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use log::{info, warn};
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::create_api_router;
use crate::commission::CommissionService;
use crate::credits::{spawn_maintenance_loop, CreditService};
use crate::db::{
    init_database, CommissionEntryRepository, CommissionRuleRepository, CreditRepository, PayoutRepository,
    SettingsRepository, ShipmentRepository,
};
use crate::error::AppError;
use crate::payment::{MockPaymentGateway, PaymentGateway};
use crate::payout::PayoutService;
use crate::settings::SettingsService;
use crate::shipping::{CarrierClient, HttpCarrierClient, ShippingMode, ShippingQuoter, ShippingService};

/// 서버 설정
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub rest_port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub carrier_base_url: Option<String>,
    pub carrier_api_key: Option<String>,
    pub shipping_mode: ShippingMode,
    pub flat_shipping_rate: Decimal,
    pub frontend_url: String,
    /// 0이면 정기 작업 태스크를 띄우지 않음
    pub maintenance_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rest_port: 7000,
            database_url: "sqlite://xmarket.db?mode=rwc".into(),
            database_max_connections: 5,
            carrier_base_url: None,
            carrier_api_key: None,
            shipping_mode: ShippingMode::Manual,
            flat_shipping_rate: Decimal::new(999, 2),
            frontend_url: "http://localhost:3000".into(),
            maintenance_interval_secs: 3600,
        }
    }
}

impl ServerConfig {
    /// 환경 변수에서 설정 읽기 (없거나 잘못된 값은 기본값)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rest_port: parse_env("XMARKET_PORT", defaults.rest_port),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", defaults.database_max_connections),
            carrier_base_url: env::var("CARRIER_BASE_URL").ok().filter(|v| !v.trim().is_empty()),
            carrier_api_key: env::var("CARRIER_API_KEY").ok().filter(|v| !v.trim().is_empty()),
            shipping_mode: parse_env("SHIPPING_MODE", defaults.shipping_mode),
            flat_shipping_rate: parse_env("FLAT_SHIPPING_RATE", defaults.flat_shipping_rate),
            frontend_url: env::var("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            maintenance_interval_secs: parse_env("MAINTENANCE_INTERVAL_SECS", defaults.maintenance_interval_secs),
        }
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("⚠️ 잘못된 환경 변수 {}={}, 기본값 사용", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

/// 서버 상태
#[derive(Clone)]
pub struct ServerState {
    pub settings: Arc<SettingsService>,
    pub commission: Arc<CommissionService>,
    pub payouts: Arc<PayoutService>,
    pub credits: Arc<CreditService>,
    pub shipping: Arc<ShippingService>,
}

/// DB 풀과 외부 연동으로 서버 상태 구성
pub fn build_state(
    pool: SqlitePool,
    config: &ServerConfig,
    gateway: Arc<dyn PaymentGateway>,
    carrier: Option<Arc<dyn CarrierClient>>,
) -> ServerState {
    let settings = SettingsService::new(SettingsRepository::new(pool.clone()));
    let entries = CommissionEntryRepository::new(pool.clone());
    let commission = CommissionService::new(
        settings.clone(),
        CommissionRuleRepository::new(pool.clone()),
        entries.clone(),
    );
    let payouts = PayoutService::new(PayoutRepository::new(pool.clone()), entries, settings.clone());
    let credits = CreditService::new(
        CreditRepository::new(pool.clone()),
        settings.clone(),
        gateway,
        config.frontend_url.clone(),
    );
    let quoter = ShippingQuoter::new(config.shipping_mode, carrier.clone(), config.flat_shipping_rate);
    let shipping = ShippingService::new(quoter, carrier, ShipmentRepository::new(pool));

    ServerState {
        settings: Arc::new(settings),
        commission: Arc::new(commission),
        payouts: Arc::new(payouts),
        credits: Arc::new(credits),
        shipping: Arc::new(shipping),
    }
}

/// 라우터와 미들웨어 구성
pub fn create_app(state: ServerState) -> Router {
    create_api_router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 설정의 배송사 클라이언트 생성 (URL과 키가 모두 있을 때만)
pub fn carrier_from_config(config: &ServerConfig) -> Result<Option<Arc<dyn CarrierClient>>, AppError> {
    match (&config.carrier_base_url, &config.carrier_api_key) {
        (Some(url), Some(key)) => {
            let client: Arc<dyn CarrierClient> = Arc::new(HttpCarrierClient::new(url.clone(), key.clone())?);
            info!("🚚 배송사 API 연결: {}", url);
            Ok(Some(client))
        }
        _ => {
            if config.shipping_mode != ShippingMode::Manual {
                warn!("⚠️ 배송사 설정 없음: {} 모드는 고정 요율 또는 오류로 동작합니다", config.shipping_mode);
            }
            Ok(None)
        }
    }
}

/// 서버 시작
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("🚀 xMarket 서버 시작 중...");

    let pool = init_database(&config.database_url, config.database_max_connections).await?;
    let carrier = carrier_from_config(&config)?;
    // 실제 결제 SDK 대신 메모리 게이트웨이
    let gateway: Arc<dyn PaymentGateway> = Arc::new(MockPaymentGateway::new());
    let state = build_state(pool, &config, gateway, carrier);

    if config.maintenance_interval_secs > 0 {
        spawn_maintenance_loop(state.credits.clone(), Duration::from_secs(config.maintenance_interval_secs));
        info!("⏱️  크레딧 정기 작업 주기: {}초", config.maintenance_interval_secs);
    }

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.rest_port)).await?;

    info!("✅ 서버가 성공적으로 시작되었습니다");
    info!("🌐 REST API: http://localhost:{}", config.rest_port);
    info!("🚚 배송 모드: {}", config.shipping_mode);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("🛑 서버 중지 중...");
            }
        })
        .await?;

    info!("✅ 서버 중지 완료");
    Ok(())
}
