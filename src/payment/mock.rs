use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use log::info;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CheckoutRequest, CheckoutSession, GatewaySession, PaymentGateway, PaymentStatus};
use crate::error::GatewayError;

/// 메모리 결제 게이트웨이
///
/// 세션을 메모리에 보관하고 `mark_paid`로 결제 완료를 흉내 냅니다.
/// 로컬 실행과 테스트에서 사용합니다.
#[derive(Default)]
pub struct MockPaymentGateway {
    sessions: Mutex<HashMap<String, GatewaySession>>,
    unavailable: AtomicBool,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 세션을 결제 완료 상태로 변경
    pub async fn mark_paid(&self, session_id: &str) -> Result<(), GatewayError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_string()))?;
        session.payment_status = PaymentStatus::Paid;
        session.payment_reference = Some(format!("pi_{}", Uuid::new_v4().simple()));
        Ok(())
    }

    /// 외부에서 만든 세션 등록 (메타데이터 검증 테스트용)
    pub async fn insert_session(&self, session: GatewaySession) {
        self.sessions.lock().await.insert(session.id.clone(), session);
    }

    /// 게이트웨이 장애 흉내
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Upstream("게이트웨이 응답 없음".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
        self.check_available()?;

        let session_id = format!("cs_test_{}", Uuid::new_v4().simple());
        let session = GatewaySession {
            id: session_id.clone(),
            payment_status: PaymentStatus::Unpaid,
            amount_total_cents: request.total_cents(),
            currency: request.currency.clone(),
            payment_reference: None,
            metadata: request.metadata.clone(),
        };
        self.sessions.lock().await.insert(session_id.clone(), session);

        info!("💳 체크아웃 세션 생성: {} ({} {})", session_id, request.total_cents(), request.currency);

        Ok(CheckoutSession {
            url: format!("https://checkout.example.test/pay/{}", session_id),
            session_id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<GatewaySession, GatewayError> {
        self.check_available()?;
        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_string()))
    }
}
