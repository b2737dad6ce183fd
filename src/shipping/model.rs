use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 주소 (요율 계산에 필요한 부분만)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub country_code: String,
    pub postal_code: String,
    pub city: Option<String>,
}

/// 배송 소포
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub origin: Address,
    pub destination: Address,
    pub weight_kg: Decimal,
    pub length_cm: Option<Decimal>,
    pub width_cm: Option<Decimal>,
    pub height_cm: Option<Decimal>,
}

impl Package {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.weight_kg <= Decimal::ZERO {
            return Err(AppError::Validation("weight_kg는 0보다 커야 합니다".into()));
        }
        for (name, dim) in [("length_cm", self.length_cm), ("width_cm", self.width_cm), ("height_cm", self.height_cm)] {
            if dim.map_or(false, |d| d <= Decimal::ZERO) {
                return Err(AppError::Validation(format!("{}는 0보다 커야 합니다", name)));
            }
        }
        for address in [&self.origin, &self.destination] {
            if address.country_code.len() != 2 {
                return Err(AppError::Validation(format!(
                    "국가 코드는 두 글자여야 합니다: {}",
                    address.country_code
                )));
            }
        }
        Ok(())
    }
}

/// 송장 생성 요청
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRequest {
    pub order_id: String,
    pub package: Package,
    pub service_code: Option<String>,
}

/// 요율 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    /// 배송사 실시간 요율
    Live,
    /// 설정된 고정 요율
    Flat,
}

/// 배송 요율
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    pub carrier: String,
    pub service_code: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub estimated_days: Option<i64>,
    pub source: RateSource,
}

/// 생성된 송장
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentLabel {
    pub carrier: String,
    pub tracking_number: String,
    pub rate: Decimal,
    pub currency: String,
    pub label_url: Option<String>,
}
