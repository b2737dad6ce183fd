use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::model::{Package, RateQuote, RateSource, ShipmentLabel, ShipmentRequest};
use crate::error::CarrierError;

/// 배송사 API
#[async_trait]
pub trait CarrierClient: Send + Sync {
    fn name(&self) -> &str;

    async fn quote(&self, package: &Package) -> Result<RateQuote, CarrierError>;

    async fn create_shipment(&self, request: &ShipmentRequest) -> Result<ShipmentLabel, CarrierError>;
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    service_code: Option<String>,
    price: Decimal,
    currency: String,
    estimated_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ShipmentResponse {
    tracking_number: String,
    price: Decimal,
    currency: String,
    label_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// JSON HTTP 배송사 클라이언트
///
/// `{base_url}/rates`, `{base_url}/shipments`에 POST하고 `X-API-Key` 헤더로 인증합니다.
pub struct HttpCarrierClient {
    client: Client,
    base_url: String,
    api_key: String,
    name: String,
}

impl HttpCarrierClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, CarrierError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            name: "carrier".to_string(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, CarrierError>
    where
        B: serde::Serialize + Sync,
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("🚚 배송사 요청: POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.message.or(b.error))
                .unwrap_or(text);
            warn!("⚠️ 배송사 오류 응답 ({}): {}", status.as_u16(), message);
            return Err(CarrierError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| CarrierError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CarrierClient for HttpCarrierClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn quote(&self, package: &Package) -> Result<RateQuote, CarrierError> {
        let rate: RateResponse = self.post("/rates", package).await?;
        Ok(RateQuote {
            carrier: self.name.clone(),
            service_code: rate.service_code,
            price: rate.price,
            currency: rate.currency,
            estimated_days: rate.estimated_days,
            source: RateSource::Live,
        })
    }

    async fn create_shipment(&self, request: &ShipmentRequest) -> Result<ShipmentLabel, CarrierError> {
        let shipment: ShipmentResponse = self.post("/shipments", request).await?;
        if shipment.tracking_number.trim().is_empty() {
            return Err(CarrierError::InvalidResponse("송장 번호가 비어 있습니다".into()));
        }
        Ok(ShipmentLabel {
            carrier: self.name.clone(),
            tracking_number: shipment.tracking_number,
            rate: shipment.price,
            currency: shipment.currency,
            label_url: shipment.label_url,
        })
    }
}
