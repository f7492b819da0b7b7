//! Order aggregate: header, lines, status lifecycle and checkout input.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ItemType, Money, Payment, Role, ShippingTier};

/// OrderStatus is the fulfillment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, stock reserved, nothing done yet.
    Pending,
    /// Staff is preparing the order.
    Processing,
    /// Handed to the courier.
    Shipped,
    /// Received by the customer. Terminal.
    Delivered,
    /// Cancelled before shipping, stock restored. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// Single source of truth for legal order transitions.
    ///
    /// Forward chain is PENDING -> PROCESSING -> SHIPPED -> DELIVERED.
    /// CANCELLED is reachable from PENDING and PROCESSING only.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Processing => write!(f, "processing"),
            OrderStatus::Shipped => write!(f, "shipped"),
            OrderStatus::Delivered => write!(f, "delivered"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

/// PaymentMethod is the way the customer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Manual bank transfer, verified from an uploaded receipt.
    BankTransfer,
    /// E-wallet transfer, verified from an uploaded receipt.
    EWallet,
    /// Cash on delivery, settled when the order is delivered.
    Cod,
}

impl PaymentMethod {
    /// Returns true if this method is settled by proof-of-payment upload.
    pub fn requires_proof(self) -> bool {
        !matches!(self, PaymentMethod::Cod)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::BankTransfer => write!(f, "bank_transfer"),
            PaymentMethod::EWallet => write!(f, "e_wallet"),
            PaymentMethod::Cod => write!(f, "cod"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "e_wallet" => Ok(PaymentMethod::EWallet),
            "cod" => Ok(PaymentMethod::Cod),
            _ => Err(format!("Unknown payment method: {}", s)),
        }
    }
}

/// CartLine is one untrusted cart entry. It carries no price on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_type: ItemType,
    pub item_id: i64,
    pub quantity: i64,
}

impl CartLine {
    pub fn product(item_id: i64, quantity: i64) -> Self {
        Self {
            item_type: ItemType::Product,
            item_id,
            quantity,
        }
    }

    pub fn service(item_id: i64, quantity: i64) -> Self {
        Self {
            item_type: ItemType::Service,
            item_id,
            quantity,
        }
    }
}

/// CheckoutRequest is everything the customer submits at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub customer_id: i64,
    pub items: Vec<CartLine>,
    pub shipping_address: String,
    pub payment_method: Option<PaymentMethod>,
    /// None means no delivery charge (pickup or services only).
    pub shipping_tier: Option<ShippingTier>,
    pub notes: Option<String>,
}

/// Order is the persisted order header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// Human-readable unique number, e.g. "ORD-20261017-0001".
    pub order_number: String,
    pub customer_id: i64,
    /// Items subtotal plus shipping cost. Fixed at creation.
    pub total_amount: Money,
    pub shipping_tier: Option<ShippingTier>,
    pub shipping_cost: Money,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    /// Set once reserved stock has been given back on cancellation.
    pub stock_restored: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// OrderItem is one priced line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub item_type: ItemType,
    pub item_id: i64,
    /// Catalog name at order time.
    pub name: String,
    pub quantity: i64,
    /// Unit price snapshot, never re-read from the catalog.
    pub price: Money,
}

/// DraftLine is a validated and priced line waiting to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftLine {
    pub item_type: ItemType,
    pub item_id: i64,
    pub name: String,
    pub quantity: i64,
    pub price: Money,
}

impl DraftLine {
    /// Unit price times quantity, or None if it does not fit in `Money`.
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_times(self.quantity)
    }
}

/// OrderDraft is the fully priced order handed to storage for the atomic write.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub customer_id: i64,
    pub lines: Vec<DraftLine>,
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    pub shipping_tier: Option<ShippingTier>,
    pub shipping_cost: Money,
    pub total_amount: Money,
    pub notes: Option<String>,
}

/// Formats an order number as `PREFIX-YYYYMMDD-NNNN`.
///
/// `sequence` is the per-day counter. It is zero-padded to four digits and
/// simply grows wider past 9999, so numbers stay unique.
pub fn format_order_number(prefix: &str, day: NaiveDate, sequence: i64) -> String {
    format!("{}-{}-{:04}", prefix, day.format("%Y%m%d"), sequence)
}

/// PlacedOrder is the result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Payment,
}

/// StatusChange is one audit row of the order status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub order_id: i64,
    /// None for the initial PENDING row.
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub actor_id: i64,
    pub actor_role: Role,
    pub at: DateTime<Utc>,
}
