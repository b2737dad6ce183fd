//! 배송 연동
//!
//! 배송비 견적(고정/실시간/혼합)과 배송사 송장 생성을 다룹니다.

pub mod carrier;
pub mod model;
pub mod quote;
pub mod service;

pub use carrier::{CarrierClient, HttpCarrierClient};
pub use model::{Address, Package, RateQuote, RateSource, ShipmentLabel, ShipmentRequest};
pub use quote::{ShippingMode, ShippingQuoter};
pub use service::ShippingService;
