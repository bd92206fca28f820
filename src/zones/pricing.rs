//! Dynamic price computation.
//!
//! Adjustments are applied in a fixed order: peak hour surcharge, distance
//! surcharge, premium discount. The premium discount is taken from the order
//! value only, so it never eats into the delivery fee or the surcharges.

use chrono::NaiveTime;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::EngineError;
use super::config::ServiceSettings;
use crate::config::PricingConfig;

/// Two decimal places, midpoint away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    #[default]
    Regular,
    Premium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderDetails {
    #[schema(value_type = String, example = "1000.00")]
    pub order_value: Decimal,
    /// Kilometres from the serving location.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "7.5")]
    pub distance_km: Option<Decimal>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub customer_type: Option<CustomerType>,
}

impl OrderDetails {
    pub fn new(order_value: Decimal) -> Self {
        Self {
            order_value,
            distance_km: None,
            items: Vec::new(),
            customer_type: None,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.order_value.is_sign_negative() {
            return Err(EngineError::InvalidOrder(
                "order_value must not be negative".to_string(),
            ));
        }
        if let Some(distance) = self.distance_km
            && distance.is_sign_negative()
        {
            return Err(EngineError::InvalidOrder(
                "distance_km must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    PeakHour,
    Distance,
    PremiumDiscount,
}

/// One line of the price breakdown. Discounts carry a negative amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceAdjustment {
    #[serde(rename = "type")]
    pub kind: AdjustmentKind,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceCalculation {
    #[schema(value_type = String)]
    pub original_price: Decimal,
    #[schema(value_type = String)]
    pub final_price: Decimal,
    pub breakdown: Vec<PriceAdjustment>,
    #[schema(value_type = String)]
    pub savings: Decimal,
}

fn out_of_range() -> EngineError {
    EngineError::InvalidOrder("order value out of range".to_string())
}

/// Price `order` under `settings` at local wall clock `at`.
///
/// Fails with [`EngineError::InvalidOrder`] when an amount overflows.
pub fn calculate_price(
    settings: &ServiceSettings,
    order: &OrderDetails,
    pricing: &PricingConfig,
    at: NaiveTime,
) -> Result<PriceCalculation, EngineError> {
    let order_value = order.order_value;
    let original_price = round_money(
        order_value
            .checked_add(settings.delivery_fee)
            .ok_or_else(out_of_range)?,
    );
    let mut final_price = original_price;
    let mut breakdown = Vec::new();

    if pricing.is_peak(at) && settings.peak_hour_multiplier > Decimal::ONE {
        let amount = order_value
            .checked_mul(settings.peak_hour_multiplier - Decimal::ONE)
            .map(round_money)
            .ok_or_else(out_of_range)?;
        final_price = final_price.checked_add(amount).ok_or_else(out_of_range)?;
        breakdown.push(PriceAdjustment {
            kind: AdjustmentKind::PeakHour,
            amount,
            description: format!(
                "Peak hour surcharge ({}x)",
                settings.peak_hour_multiplier.normalize()
            ),
        });
    }

    if settings.distance_based_pricing
        && let Some(distance) = order.distance_km
    {
        let billable = distance
            .checked_sub(pricing.free_distance_km)
            .ok_or_else(out_of_range)?
            .max(Decimal::ZERO);
        let amount = billable
            .checked_mul(pricing.rate_per_km)
            .map(round_money)
            .ok_or_else(out_of_range)?;
        if amount > Decimal::ZERO {
            final_price = final_price.checked_add(amount).ok_or_else(out_of_range)?;
            breakdown.push(PriceAdjustment {
                kind: AdjustmentKind::Distance,
                amount,
                description: format!(
                    "Distance surcharge ({} km beyond {} km free)",
                    billable.normalize(),
                    pricing.free_distance_km.normalize()
                ),
            });
        }
    }

    if order.customer_type == Some(CustomerType::Premium) {
        let discount = order_value
            .checked_mul(pricing.premium_discount_pct)
            .and_then(|value| value.checked_div(Decimal::ONE_HUNDRED))
            .map(round_money)
            .ok_or_else(out_of_range)?;
        final_price -= discount;
        breakdown.push(PriceAdjustment {
            kind: AdjustmentKind::PremiumDiscount,
            amount: -discount,
            description: format!(
                "Premium member discount ({}%)",
                pricing.premium_discount_pct.normalize()
            ),
        });
    }

    Ok(PriceCalculation {
        original_price,
        final_price,
        breakdown,
        savings: (original_price - final_price).max(Decimal::ZERO),
    })
}
