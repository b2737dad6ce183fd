//! 수수료 정책 계산기
//!
//! 주문 금액과 설정 스냅샷만으로 수수료를 계산하는 순수 함수입니다.
//! 설정 저장소를 직접 읽지 않으며 부수 효과가 없습니다.

use rust_decimal::Decimal;

use super::model::{Clamp, CommissionBreakdown, CommissionConfig, OrderAmounts};
use crate::error::CommissionError;

/// 주문 수수료 계산
///
/// 하한을 먼저 검사하고 상한은 그 다음에 검사합니다.
/// `max_amount`가 0이면 상한이 없습니다. 판매자 정산액이 음수가 되어도
/// 그대로 반환하며, 0 이하 처리는 호출자가 결정합니다.
/// 중간 계산이 `Decimal` 범위를 넘으면 `AmountOverflow`를 돌려줍니다.
pub fn compute_commission(
    order: &OrderAmounts,
    config: &CommissionConfig,
) -> Result<CommissionBreakdown, CommissionError> {
    let gross = order.gross()?;
    let base = if config.applies_to_shipping {
        gross
    } else {
        order.product_total
    };

    let raw_fee = base
        .checked_mul(config.rate_percent)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .ok_or(CommissionError::AmountOverflow)?;

    let (percentage_fee, clamp) = if raw_fee < config.min_amount {
        (config.min_amount, Clamp::Min)
    } else if config.max_amount > Decimal::ZERO && raw_fee > config.max_amount {
        (config.max_amount, Clamp::Max)
    } else {
        (raw_fee, Clamp::None)
    };

    let commission = percentage_fee
        .checked_add(config.fixed_fee)
        .ok_or(CommissionError::AmountOverflow)?;
    let seller_receives = gross
        .checked_sub(commission)
        .ok_or(CommissionError::AmountOverflow)?;

    Ok(CommissionBreakdown {
        base,
        percentage_fee,
        fixed_fee: config.fixed_fee,
        commission,
        seller_receives,
        clamp,
    })
}
