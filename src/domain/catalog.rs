//! Catalog records as seen by the order engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Money;

/// ItemType tells whether a line references a physical product or a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Physical product with a stock counter and an optional weight.
    Product,
    /// Professional service, no stock and no weight.
    Service,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Product => write!(f, "product"),
            ItemType::Service => write!(f, "service"),
        }
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(ItemType::Product),
            "service" => Ok(ItemType::Service),
            _ => Err(format!("Unknown item type: {}", s)),
        }
    }
}

/// CatalogItem is the authoritative record for one product or service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub item_type: ItemType,
    pub id: i64,
    pub name: String,
    /// Current unit price.
    pub unit_price: Money,
    /// Units on hand. Always `Some` for products, `None` for services.
    pub stock: Option<i64>,
    /// Unit weight in grams, if known.
    pub weight_grams: Option<u64>,
    /// Inactive items cannot be ordered.
    pub active: bool,
}

impl CatalogItem {
    /// Builds a product record.
    pub fn product(
        id: i64,
        name: &str,
        unit_price: Money,
        stock: i64,
        weight_grams: Option<u64>,
    ) -> Self {
        Self {
            item_type: ItemType::Product,
            id,
            name: name.to_string(),
            unit_price,
            stock: Some(stock),
            weight_grams,
            active: true,
        }
    }

    /// Builds a service record.
    pub fn service(id: i64, name: &str, unit_price: Money) -> Self {
        Self {
            item_type: ItemType::Service,
            id,
            name: name.to_string(),
            unit_price,
            stock: None,
            weight_grams: None,
            active: true,
        }
    }
}
