//! REST API 통합 테스트
//!
//! 라우터를 직접 호출(`oneshot`)해 요청/응답 형식과 에러 매핑을 확인합니다.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::routing::post;
use axum::Router;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use xmarket::db::init_database;
use xmarket::payment::{MockPaymentGateway, PaymentGateway};
use xmarket::shipping::{CarrierClient, HttpCarrierClient, ShippingMode};
use xmarket::{build_state, create_app, ServerConfig};

async fn app() -> (Router, Arc<MockPaymentGateway>) {
    app_with(&ServerConfig::default(), None).await
}

async fn app_with(config: &ServerConfig, carrier: Option<Arc<dyn CarrierClient>>) -> (Router, Arc<MockPaymentGateway>) {
    let pool = init_database("sqlite::memory:", 1).await.unwrap();
    let gateway = Arc::new(MockPaymentGateway::new());
    let dyn_gateway: Arc<dyn PaymentGateway> = gateway.clone();
    let state = build_state(pool, config, dyn_gateway, carrier);
    (create_app(state), gateway)
}

/// 로컬 포트에 띄우는 배송사 API
async fn fake_carrier() -> String {
    async fn rates(headers: HeaderMap) -> (StatusCode, axum::Json<Value>) {
        if headers.get("X-API-Key").and_then(|v| v.to_str().ok()) != Some("secret") {
            return (StatusCode::UNAUTHORIZED, axum::Json(json!({ "message": "invalid api key" })));
        }
        (
            StatusCode::OK,
            axum::Json(json!({ "service_code": "EXP", "price": "18.40", "currency": "USD", "estimated_days": 2 })),
        )
    }

    async fn shipments(headers: HeaderMap) -> (StatusCode, axum::Json<Value>) {
        if headers.get("X-API-Key").and_then(|v| v.to_str().ok()) != Some("secret") {
            return (StatusCode::UNAUTHORIZED, axum::Json(json!({ "message": "invalid api key" })));
        }
        (
            StatusCode::OK,
            axum::Json(json!({
                "tracking_number": "1Z999",
                "price": "18.40",
                "currency": "USD",
                "label_url": "https://labels.example/1Z999.pdf"
            })),
        )
    }

    let carrier = Router::new()
        .route("/rates", post(rates))
        .route("/shipments", post(shipments));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, carrier).await.unwrap();
    });
    format!("http://{}", addr)
}

fn package() -> Value {
    json!({
        "origin": { "country_code": "US", "postal_code": "10001", "city": null },
        "destination": { "country_code": "DE", "postal_code": "10115", "city": "Berlin" },
        "weight_kg": 1.5,
        "length_cm": null,
        "width_cm": null,
        "height_cm": null
    })
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app().await;
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_quote_with_default_settings() {
    let (app, _) = app().await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/commission/quote",
        Some(json!({ "product_total": "1003.00", "shipping_total": 25 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["breakdown"]["commission"]), dec!(100.30));
    assert_eq!(decimal(&body["breakdown"]["seller_receives"]), dec!(927.70));
    assert_eq!(body["breakdown"]["clamp"], "none");
    assert!(body["warnings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_quote_rejects_amounts_beyond_decimal_range() {
    let (app, _) = app().await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/commission/quote",
        Some(json!({ "product_total": "70000000000000000000000000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "AMOUNT_OVERFLOW");

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/commission/quote",
        Some(json!({
            "seller_id": "seller-1",
            "product_total": "70000000000000000000000000000",
            "shipping_total": "70000000000000000000000000000"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 서버는 계속 응답
    let (status, _) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_grace_period_setting_is_bounded() {
    let (app, _) = app().await;

    for value in [json!(9_223_372_036_854_775_807_i64), json!(366), json!(-1)] {
        let (status, body) = call(
            &app,
            "PUT",
            "/api/v1/settings/seller_credit_grace_period_days",
            Some(json!({ "value": value, "changed_by": "admin-1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_SETTING_VALUE");
    }

    let (status, body) = call(
        &app,
        "PUT",
        "/api/v1/settings/seller_credit_grace_period_days",
        Some(json!({ "value": 365, "changed_by": "admin-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["setting"]["value"], 365);
}

#[tokio::test]
async fn test_locked_setting_cannot_be_updated() {
    let (app, _) = app().await;

    let (status, body) = call(
        &app,
        "PUT",
        "/api/v1/admin/settings/global_commission_rate/lock",
        Some(json!({ "is_editable": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_editable"], false);

    let (status, body) = call(
        &app,
        "PUT",
        "/api/v1/settings/global_commission_rate",
        Some(json!({ "value": 12, "changed_by": "admin-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "SETTING_NOT_EDITABLE");

    let (status, _) = call(
        &app,
        "PUT",
        "/api/v1/admin/settings/global_commission_rate/lock",
        Some(json!({ "is_editable": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        "PUT",
        "/api/v1/settings/global_commission_rate",
        Some(json!({ "value": 12, "changed_by": "admin-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["setting"]["value"], 12);

    let (status, body) = call(
        &app,
        "PUT",
        "/api/v1/admin/settings/no_such_key/lock",
        Some(json!({ "is_editable": false })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "SETTING_NOT_FOUND");
}

#[tokio::test]
async fn test_settings_update_validation_and_warning() {
    let (app, _) = app().await;

    let (status, body) = call(
        &app,
        "PUT",
        "/api/v1/settings/global_commission_rate",
        Some(json!({ "value": 150, "changed_by": "admin-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_COMMISSION_CONFIG");

    let (status, _) = call(
        &app,
        "PUT",
        "/api/v1/settings/commission_max_amount",
        Some(json!({ "value": 1, "changed_by": "admin-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        "PUT",
        "/api/v1/settings/commission_min_amount",
        Some(json!({ "value": 2, "changed_by": "admin-1", "reason": "floor for small orders" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["setting"]["value"], 2);
    assert_eq!(body["warnings"][0]["code"], "MIN_NOT_BELOW_MAX");

    // 최소 2, 최대 1: 비율 수수료가 최소 이상이면 최대로 고정됨
    let (_, quote) = call(
        &app,
        "POST",
        "/api/v1/commission/quote",
        Some(json!({ "product_total": 50, "shipping_total": 0 })),
    )
    .await;
    assert_eq!(decimal(&quote["breakdown"]["commission"]), dec!(1));
    assert_eq!(quote["breakdown"]["clamp"], "max");
    assert_eq!(quote["warnings"].as_array().unwrap().len(), 1);

    let (_, quote) = call(
        &app,
        "POST",
        "/api/v1/commission/quote",
        Some(json!({ "product_total": 5, "shipping_total": 0 })),
    )
    .await;
    assert_eq!(decimal(&quote["breakdown"]["commission"]), dec!(2));
    assert_eq!(quote["breakdown"]["clamp"], "min");

    let (status, audit) = call(&app, "GET", "/api/v1/settings/commission_min_amount/audit", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audit[0]["reason"], "floor for small orders");

    let (status, body) = call(&app, "GET", "/api/v1/settings/no_such_key", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "SETTING_NOT_FOUND");
}

#[tokio::test]
async fn test_rules_endpoint_and_seller_quote() {
    let (app, _) = app().await;

    let (status, rule) = call(
        &app,
        "POST",
        "/api/v1/commission/rules",
        Some(json!({ "seller_id": "seller-9", "rule_type": "FIXED", "value": "4.00", "priority": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, rules) = call(&app, "GET", "/api/v1/commission/rules", None).await;
    assert_eq!(rules.as_array().unwrap().len(), 1);

    let (_, quote) = call(
        &app,
        "POST",
        "/api/v1/commission/quote",
        Some(json!({ "seller_id": "seller-9", "product_total": 300 })),
    )
    .await;
    assert_eq!(quote["rule_id"], rule["id"]);
    assert_eq!(decimal(&quote["breakdown"]["commission"]), dec!(4));
}

#[tokio::test]
async fn test_credit_lifecycle_over_http() {
    let (app, gateway) = app().await;

    let (status, store) = call(
        &app,
        "POST",
        "/api/v1/stores",
        Some(json!({ "owner_id": "user-1", "name": "Retro Records" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let store_id = store["id"].as_str().unwrap().to_string();

    // 승인 전 구매 불가
    let checkout_uri = format!("/api/v1/stores/{}/credits/checkout", store_id);
    let (status, body) = call(&app, "POST", &checkout_uri, Some(json!({ "months": 2 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "STORE_NOT_ACTIVE");

    let (status, _) = call(&app, "POST", &format!("/api/v1/admin/stores/{}/approve", store_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, checkout) = call(&app, "POST", &checkout_uri, Some(json!({ "months": 2 }))).await;
    assert_eq!(status, StatusCode::OK);
    let session_id = checkout["session_id"].as_str().unwrap().to_string();

    gateway.mark_paid(&session_id).await.unwrap();
    let (status, purchase) = call(&app, "POST", "/api/v1/credits/webhook", Some(json!({ "session_id": session_id }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(purchase["already_processed"], false);
    assert_eq!(purchase["transaction"]["balance_after"], 2);

    let (_, replay) = call(&app, "POST", "/api/v1/credits/webhook", Some(json!({ "session_id": session_id }))).await;
    assert_eq!(replay["already_processed"], true);

    let adjust_uri = format!("/api/v1/admin/stores/{}/credits/adjust", store_id);
    let (status, body) = call(
        &app,
        "POST",
        &adjust_uri,
        Some(json!({ "amount": -5, "type": "REFUND", "admin_id": "admin-1", "notes": "partial refund" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "INSUFFICIENT_CREDITS");

    let (status, tx) = call(
        &app,
        "POST",
        &adjust_uri,
        Some(json!({ "amount": 1, "type": "BONUS", "admin_id": "admin-1", "notes": "apology" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tx["balance_after"], 3);
    assert_eq!(tx["performed_by"], "admin-1");

    let (_, credit_status) = call(&app, "GET", &format!("/api/v1/stores/{}/credits", store_id), None).await;
    assert_eq!(credit_status["credits_balance"], 3);
    assert_eq!(credit_status["can_publish"], true);
    assert_eq!(credit_status["store_status"], "ACTIVE");

    let (_, history) = call(
        &app,
        "GET",
        &format!("/api/v1/stores/{}/credits/history?page=1&limit=10", store_id),
        None,
    )
    .await;
    assert_eq!(history["total"], 2);
    assert_eq!(history["transactions"][0]["transaction_type"], "BONUS");

    let (status, verify) = call(
        &app,
        "GET",
        &format!("/api/v1/admin/stores/{}/credits/verify", store_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verify["valid"], true);

    let (status, report) = call(
        &app,
        "POST",
        "/api/v1/admin/credits/maintenance",
        Some(json!({ "monthly_deduction": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(report["failed"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_store_and_session() {
    let (app, _) = app().await;

    let (status, body) = call(&app, "GET", "/api/v1/stores/missing/credits", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "STORE_NOT_FOUND");

    let (status, body) = call(&app, "POST", "/api/v1/credits/webhook", Some(json!({ "session_id": "cs_nope" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_shipping_without_carrier() {
    let (app, _) = app().await;
    let package = package();

    // 기본 설정은 고정 요율
    let (status, rate) = call(&app, "POST", "/api/v1/shipping/quote", Some(package.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rate["source"], "flat");
    assert_eq!(decimal(&rate["price"]), dec!(9.99));

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/shipments",
        Some(json!({ "order_id": "order-1", "package": package, "service_code": null })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "CARRIER_NOT_CONFIGURED");
}

#[tokio::test]
async fn test_shipment_created_through_carrier() {
    let base = fake_carrier().await;
    let carrier: Arc<dyn CarrierClient> = Arc::new(HttpCarrierClient::new(base, "secret").unwrap().with_name("ups"));
    let config = ServerConfig {
        shipping_mode: ShippingMode::Live,
        ..ServerConfig::default()
    };
    let (app, _) = app_with(&config, Some(carrier)).await;

    let (status, rate) = call(&app, "POST", "/api/v1/shipping/quote", Some(package())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rate["source"], "live");
    assert_eq!(rate["carrier"], "ups");
    assert_eq!(decimal(&rate["price"]), dec!(18.40));

    let (status, shipment) = call(
        &app,
        "POST",
        "/api/v1/shipments",
        Some(json!({ "order_id": "order-1", "package": package(), "service_code": "EXP" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(shipment["tracking_number"], "1Z999");
    assert_eq!(shipment["carrier"], "ups");
    assert_eq!(shipment["label_url"], "https://labels.example/1Z999.pdf");

    let (status, shipments) = call(&app, "GET", "/api/v1/orders/order-1/shipments", None).await;
    assert_eq!(status, StatusCode::OK);
    let shipments = shipments.as_array().unwrap();
    assert_eq!(shipments.len(), 1);
    assert_eq!(shipments[0]["id"], shipment["id"]);
    assert_eq!(decimal(&shipments[0]["rate"]), dec!(18.40));

    let (_, none) = call(&app, "GET", "/api/v1/orders/order-2/shipments", None).await;
    assert!(none.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_order_commissions_and_payout_over_http() {
    let (app, _) = app().await;

    let order = json!({
        "order_id": "order-7",
        "items": [
            { "order_item_id": "item-1", "seller_id": "seller-1", "store_id": "store-1", "product_total": "400" },
            { "order_item_id": "item-2", "seller_id": "seller-1", "store_id": "store-1", "product_total": "200", "shipping_total": "10" }
        ]
    });
    let (status, recorded) = call(&app, "POST", "/api/v1/commission/orders", Some(order.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(recorded["entries"].as_array().unwrap().len(), 2);
    assert_eq!(recorded["entries"][0]["status"], "CONFIRMED");

    let (status, replay) = call(&app, "POST", "/api/v1/commission/orders", Some(order)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["already_recorded"], true);

    let (_, summary) = call(&app, "GET", "/api/v1/sellers/seller-1/commissions/summary", None).await;
    assert_eq!(summary["confirmed"]["count"], 2);
    assert_eq!(decimal(&summary["confirmed"]["commission_amount"]), dec!(60));
    assert_eq!(decimal(&summary["available_for_payout"]), dec!(550));

    let now = chrono::Utc::now();
    let payout_body = json!({
        "seller_id": "seller-1",
        "store_id": "store-1",
        "period_start": (now - chrono::Duration::days(1)).to_rfc3339(),
        "period_end": (now + chrono::Duration::minutes(5)).to_rfc3339(),
        "payment_method": "bank_transfer"
    });
    let (status, payout) = call(&app, "POST", "/api/v1/admin/payouts", Some(payout_body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(decimal(&payout["amount"]), dec!(550));
    assert_eq!(payout["status"], "PENDING");
    let payout_id = payout["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "POST", "/api/v1/admin/payouts", Some(payout_body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "NO_ELIGIBLE_COMMISSIONS");

    let (status, body) = call(&app, "POST", "/api/v1/commission/orders/order-7/cancel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 0);

    let (status, processing) = call(
        &app,
        "POST",
        &format!("/api/v1/admin/payouts/{}/process", payout_id),
        Some(json!({ "payment_reference": "wire-001" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(processing["status"], "PROCESSING");

    let (status, completed) = call(&app, "POST", &format!("/api/v1/admin/payouts/{}/complete", payout_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "COMPLETED");

    let (status, body) = call(&app, "POST", &format!("/api/v1/admin/payouts/{}/fail", payout_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "INVALID_PAYOUT_STATE");

    let (_, details) = call(&app, "GET", &format!("/api/v1/admin/payouts/{}", payout_id), None).await;
    assert_eq!(details["commissions"].as_array().unwrap().len(), 2);
    assert_eq!(details["commissions"][0]["status"], "PAID");

    let (_, paid) = call(&app, "GET", "/api/v1/sellers/seller-1/commissions?status=PAID", None).await;
    assert_eq!(paid["total"], 2);

    let (_, payouts) = call(&app, "GET", "/api/v1/sellers/seller-1/payouts", None).await;
    assert_eq!(payouts.as_array().unwrap().len(), 1);

    let (status, stats) = call(&app, "GET", "/api/v1/admin/commission/statistics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["paid"]["count"], 2);
    assert_eq!(decimal(&stats["total_order_amount"]), dec!(610));

    let (status, body) = call(&app, "GET", "/api/v1/admin/payouts/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "PAYOUT_NOT_FOUND");
}
