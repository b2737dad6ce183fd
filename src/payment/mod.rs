//! 결제 게이트웨이 연동
//!
//! 크레딧 구매는 외부 체크아웃 세션으로 결제하고, 웹훅으로 받은 세션 ID를
//! 다시 조회해 결제 완료 여부와 메타데이터를 확인합니다.

pub mod mock;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

pub use mock::MockPaymentGateway;

/// 세션 메타데이터 키
pub const METADATA_STORE_ID: &str = "store_id";
pub const METADATA_MONTHS: &str = "credit_months";
pub const METADATA_TYPE: &str = "type";
pub const CREDIT_PURCHASE_TYPE: &str = "credit_purchase";

/// 결제 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

/// 체크아웃 세션 생성 요청
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub product_name: String,
    pub description: String,
    /// 단가 (센트)
    pub unit_amount_cents: i64,
    pub quantity: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl CheckoutRequest {
    pub fn total_cents(&self) -> i64 {
        self.unit_amount_cents.saturating_mul(self.quantity)
    }
}

/// 생성된 체크아웃 세션
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

/// 게이트웨이에서 조회한 세션
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySession {
    pub id: String,
    pub payment_status: PaymentStatus,
    pub amount_total_cents: i64,
    pub currency: String,
    pub payment_reference: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// 결제 게이트웨이
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, GatewayError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<GatewaySession, GatewayError>;
}
