use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::carrier::CarrierClient;
use super::model::{Package, RateQuote, RateSource};
use crate::error::CarrierError;

/// 배송비 계산 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMode {
    /// 고정 요율만 사용
    Manual,
    /// 배송사 요율만 사용
    Live,
    /// 배송사 요율 우선, 실패 시 고정 요율
    Hybrid,
}

impl fmt::Display for ShippingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ShippingMode::Manual => "manual",
            ShippingMode::Live => "live",
            ShippingMode::Hybrid => "hybrid",
        };
        f.write_str(s)
    }
}

impl FromStr for ShippingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(ShippingMode::Manual),
            "live" => Ok(ShippingMode::Live),
            "hybrid" => Ok(ShippingMode::Hybrid),
            other => Err(format!("알 수 없는 배송 모드: {}", other)),
        }
    }
}

/// 배송비 견적기
#[derive(Clone)]
pub struct ShippingQuoter {
    mode: ShippingMode,
    carrier: Option<Arc<dyn CarrierClient>>,
    flat_rate: Decimal,
    currency: String,
}

impl ShippingQuoter {
    pub fn new(mode: ShippingMode, carrier: Option<Arc<dyn CarrierClient>>, flat_rate: Decimal) -> Self {
        Self {
            mode,
            carrier,
            flat_rate,
            currency: "USD".to_string(),
        }
    }

    pub fn mode(&self) -> ShippingMode {
        self.mode
    }

    fn flat(&self) -> RateQuote {
        RateQuote {
            carrier: "flat".to_string(),
            service_code: None,
            price: self.flat_rate,
            currency: self.currency.clone(),
            estimated_days: None,
            source: RateSource::Flat,
        }
    }

    pub async fn quote(&self, package: &Package) -> Result<RateQuote, CarrierError> {
        match (self.mode, self.carrier.as_ref()) {
            (ShippingMode::Manual, _) => Ok(self.flat()),
            (ShippingMode::Live, None) => Err(CarrierError::NotConfigured),
            (ShippingMode::Live, Some(carrier)) => carrier.quote(package).await,
            (ShippingMode::Hybrid, None) => Ok(self.flat()),
            (ShippingMode::Hybrid, Some(carrier)) => match carrier.quote(package).await {
                Ok(rate) => Ok(rate),
                Err(e) => {
                    warn!("⚠️ 배송사 요율 실패, 고정 요율 사용: {}", e);
                    Ok(self.flat())
                }
            },
        }
    }
}
