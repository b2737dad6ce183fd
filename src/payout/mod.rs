//! 판매자 정산
//!
//! 확정된 주문 수수료 기록을 묶어 판매자에게 지급하는 흐름을 다룹니다.

pub mod model;
pub mod service;

pub use model::{Payout, PayoutAction, PayoutDetails, PayoutDraft, PayoutStatus};
pub use service::PayoutService;
