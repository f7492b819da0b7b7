//! Shipping cost calculation.
//!
//! Weights are grams everywhere in the engine. Conversion to kg or tons is a
//! display concern of the outer layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{CatalogItem, Money};

/// Weight at or below which the light rate applies.
pub const LIGHT_PARCEL_MAX_GRAMS: u64 = 5000;

const REGULAR_LIGHT: i64 = 15000;
const REGULAR_HEAVY: i64 = 25000;
const EXPRESS_LIGHT: i64 = 30000;
const EXPRESS_HEAVY: i64 = 40000;

/// ShippingTier is the delivery speed chosen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingTier {
    Regular,
    Express,
}

impl fmt::Display for ShippingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShippingTier::Regular => write!(f, "regular"),
            ShippingTier::Express => write!(f, "express"),
        }
    }
}

impl FromStr for ShippingTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(ShippingTier::Regular),
            "express" => Ok(ShippingTier::Express),
            _ => Err(format!("Unknown shipping tier: {}", s)),
        }
    }
}

/// Returns the flat shipping rate for a parcel weight and tier.
pub fn shipping_cost(weight_grams: u64, tier: ShippingTier) -> Money {
    let light = weight_grams <= LIGHT_PARCEL_MAX_GRAMS;
    let rate = match (tier, light) {
        (ShippingTier::Regular, true) => REGULAR_LIGHT,
        (ShippingTier::Regular, false) => REGULAR_HEAVY,
        (ShippingTier::Express, true) => EXPRESS_LIGHT,
        (ShippingTier::Express, false) => EXPRESS_HEAVY,
    };
    Money::from(rate)
}

/// Sums `weight * quantity` over resolved lines. Unknown weights count as zero.
pub fn total_weight<'a, I>(lines: I) -> u64
where
    I: IntoIterator<Item = (&'a CatalogItem, i64)>,
{
    lines
        .into_iter()
        .map(|(item, qty)| item.weight_grams.unwrap_or(0).saturating_mul(qty.max(0) as u64))
        .fold(0u64, u64::saturating_add)
}
