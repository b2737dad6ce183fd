//! 판매 크레딧
//!
//! 판매자는 개월 단위 크레딧을 미리 구매하고, 매월 1개월씩 차감됩니다.
//! 잔액은 추가 전용 거래 원장으로만 바뀝니다.

pub mod ledger;
pub mod maintenance;
pub mod model;
pub mod service;

pub use ledger::{apply, CreditLedger, LedgerEntry, LedgerPolicy};
pub use maintenance::{run_maintenance, spawn_maintenance_loop, MaintenanceOptions, MaintenanceReport};
pub use model::{
    Actor, CreditBalance, CreditMutation, CreditStatus, CreditTransaction, CreditTransactionType, PaymentDetails,
    StoreStatus,
};
pub use service::{AdjustmentRequest, CheckoutInfo, CreditService, HistoryPage, PurchaseResult};
