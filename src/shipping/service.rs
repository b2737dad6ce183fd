use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use uuid::Uuid;

use super::carrier::CarrierClient;
use super::model::{Package, RateQuote, ShipmentRequest};
use super::quote::ShippingQuoter;
use crate::db::models::ShipmentRecord;
use crate::db::ShipmentRepository;
use crate::error::{AppError, CarrierError};

/// 배송 서비스
#[derive(Clone)]
pub struct ShippingService {
    quoter: ShippingQuoter,
    carrier: Option<Arc<dyn CarrierClient>>,
    repo: ShipmentRepository,
}

impl ShippingService {
    pub fn new(quoter: ShippingQuoter, carrier: Option<Arc<dyn CarrierClient>>, repo: ShipmentRepository) -> Self {
        Self { quoter, carrier, repo }
    }

    pub async fn quote(&self, package: &Package) -> Result<RateQuote, AppError> {
        package.validate()?;
        Ok(self.quoter.quote(package).await?)
    }

    /// 배송사에 송장을 만들고 저장
    pub async fn create_shipment(&self, request: &ShipmentRequest, now: DateTime<Utc>) -> Result<ShipmentRecord, AppError> {
        if request.order_id.trim().is_empty() {
            return Err(AppError::Validation("order_id는 필수입니다".into()));
        }
        request.package.validate()?;

        let carrier = self.carrier.as_ref().ok_or(CarrierError::NotConfigured)?;
        let label = carrier.create_shipment(request).await?;

        let record = ShipmentRecord {
            id: Uuid::new_v4().to_string(),
            order_id: request.order_id.clone(),
            carrier: label.carrier,
            tracking_number: label.tracking_number,
            rate: label.rate.to_string(),
            currency: label.currency,
            label_url: label.label_url,
            created_at: now,
        };
        self.repo.save(&record).await?;
        info!("📦 송장 생성: 주문 {} → {} {}", record.order_id, record.carrier, record.tracking_number);

        Ok(record)
    }

    pub async fn shipments_for_order(&self, order_id: &str) -> Result<Vec<ShipmentRecord>, AppError> {
        Ok(self.repo.find_by_order(order_id).await?)
    }
}
