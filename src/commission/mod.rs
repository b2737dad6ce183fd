//! 마켓플레이스 수수료
//!
//! - `model`: 설정, 주문 금액, 계산 결과
//! - `evaluator`: 순수 계산 함수
//! - `rules`: 판매자/카테고리 규칙 선택
//! - `record`: 주문 항목별 수수료 기록과 합산
//! - `service`: 설정 스냅샷과 규칙을 묶어 견적 생성, 주문 기록

pub mod evaluator;
pub mod model;
pub mod record;
pub mod rules;
pub mod service;

pub use evaluator::compute_commission;
pub use model::{Clamp, CommissionBreakdown, CommissionConfig, ConfigWarning, OrderAmounts};
pub use rules::{resolve_rule, CommissionRule, RuleContext, RuleType};
pub use record::{
    CommissionEntry, CommissionStatistics, CommissionStatus, OrderSettlement, SellerCommissionSummary, SettlementItem,
    StatusTotal,
};
pub use service::{CommissionPage, CommissionQuote, CommissionService, QuoteRequest, RuleDraft, SettlementResult};
