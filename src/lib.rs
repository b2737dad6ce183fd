//! xMarket 과금 코어
//!
//! 주문 수수료 계산과 기록, 판매자 정산, 판매 크레딧 원장, 관리자 설정을 REST API로 제공합니다.

pub mod api;
pub mod commission;
pub mod credits;
pub mod db;
pub mod error;
pub mod payment;
pub mod payout;
pub mod server;
pub mod settings;
pub mod shipping;

pub use error::AppError;
pub use server::{build_state, create_app, start_server, ServerConfig, ServerState};
