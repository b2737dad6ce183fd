use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::api::handlers::*;
use crate::server::ServerState;

/// API 라우터 생성
pub fn create_api_router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))

        // 수수료 API
        .route("/api/v1/commission/quote", post(quote_commission))
        .route("/api/v1/commission/rules", get(list_commission_rules).post(create_commission_rule))
        .route("/api/v1/commission/rules/:rule_id", delete(deactivate_commission_rule))
        .route("/api/v1/commission/orders", post(record_order_commissions))
        .route("/api/v1/commission/orders/:order_id", get(get_order_commissions))
        .route("/api/v1/commission/orders/:order_id/confirm", post(confirm_order_commissions))
        .route("/api/v1/commission/orders/:order_id/cancel", post(cancel_order_commissions))
        .route("/api/v1/sellers/:seller_id/commissions", get(get_seller_commissions))
        .route("/api/v1/sellers/:seller_id/commissions/summary", get(get_seller_commission_summary))
        .route("/api/v1/sellers/:seller_id/payouts", get(get_seller_payouts))

        // 설정 API
        .route("/api/v1/settings", get(list_settings))
        .route("/api/v1/settings/:key", get(get_setting).put(update_setting))
        .route("/api/v1/settings/:key/audit", get(get_setting_audit))

        // 스토어 및 크레딧 API
        .route("/api/v1/stores", post(register_store))
        .route("/api/v1/stores/:store_id/credits", get(get_credit_status))
        .route("/api/v1/stores/:store_id/credits/history", get(get_credit_history))
        .route("/api/v1/stores/:store_id/credits/checkout", post(create_credit_checkout))
        .route("/api/v1/credits/webhook", post(credit_webhook))

        // 관리자 API
        .route("/api/v1/admin/stores/:store_id/approve", post(approve_store))
        .route("/api/v1/admin/stores/:store_id/suspend", post(suspend_store))
        .route("/api/v1/admin/stores/:store_id/credits/adjust", post(adjust_credits))
        .route("/api/v1/admin/stores/:store_id/credits/verify", get(verify_credit_ledger))
        .route("/api/v1/admin/credits/maintenance", post(run_credit_maintenance))
        .route("/api/v1/admin/settings/:key/lock", put(set_setting_editable))
        .route("/api/v1/admin/commission/statistics", get(get_commission_statistics))
        .route("/api/v1/admin/payouts", post(create_payout))
        .route("/api/v1/admin/payouts/:payout_id", get(get_payout))
        .route("/api/v1/admin/payouts/:payout_id/process", post(process_payout))
        .route("/api/v1/admin/payouts/:payout_id/complete", post(complete_payout))
        .route("/api/v1/admin/payouts/:payout_id/fail", post(fail_payout))
        .route("/api/v1/admin/payouts/:payout_id/cancel", post(cancel_payout))

        // 배송 API
        .route("/api/v1/shipping/quote", post(quote_shipping))
        .route("/api/v1/shipments", post(create_shipment))
        .route("/api/v1/orders/:order_id/shipments", get(get_order_shipments))
}
