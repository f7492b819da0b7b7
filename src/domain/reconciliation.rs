//! Derived payment view of an order. Owns no state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Money, Order, OrderStatus, Payment, PaymentStatus};

/// InvoiceRule decides when an invoice may be generated for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceRule {
    /// Only delivered orders.
    Delivered,
    /// Only fully paid orders.
    FullyPaid,
    /// Delivered or fully paid, whichever comes first.
    #[default]
    DeliveredOrPaid,
}

impl fmt::Display for InvoiceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceRule::Delivered => write!(f, "delivered"),
            InvoiceRule::FullyPaid => write!(f, "fully_paid"),
            InvoiceRule::DeliveredOrPaid => write!(f, "delivered_or_paid"),
        }
    }
}

impl FromStr for InvoiceRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivered" => Ok(InvoiceRule::Delivered),
            "fully_paid" => Ok(InvoiceRule::FullyPaid),
            "delivered_or_paid" => Ok(InvoiceRule::DeliveredOrPaid),
            _ => Err(format!("Unknown invoice rule: {}", s)),
        }
    }
}

/// Reconciliation compares confirmed money against the order total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub order_id: i64,
    pub order_number: String,
    pub total_amount: Money,
    /// Sum of all PAID payments.
    pub total_paid: Money,
    /// `max(0, total_amount - total_paid)`.
    pub outstanding_balance: Money,
    /// `max(0, total_paid - total_amount)`. Kept apart from the balance.
    pub overpayment: Money,
    /// Whether the customer should be offered a proof upload.
    pub proof_upload_allowed: bool,
    /// Whether an invoice may be generated under the configured rule.
    pub invoice_allowed: bool,
}

impl Reconciliation {
    /// Computes the view from an order and all of its payments.
    pub fn compute(order: &Order, payments: &[Payment], rule: InvoiceRule) -> Self {
        let total_paid: Money = payments
            .iter()
            .filter(|p| p.order_id == order.id && p.status == PaymentStatus::Paid)
            .map(|p| p.amount)
            .sum();

        let outstanding_balance = order.total_amount.saturating_sub(total_paid);
        let overpayment = total_paid.saturating_sub(order.total_amount);
        let fully_paid = outstanding_balance == Money::ZERO;
        let delivered = order.status == OrderStatus::Delivered;

        let invoice_allowed = match rule {
            InvoiceRule::Delivered => delivered,
            InvoiceRule::FullyPaid => fully_paid,
            InvoiceRule::DeliveredOrPaid => delivered || fully_paid,
        };

        Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            total_amount: order.total_amount,
            total_paid,
            outstanding_balance,
            overpayment,
            proof_upload_allowed: !fully_paid
                && order.status != OrderStatus::Cancelled
                && order.payment_method.requires_proof(),
            invoice_allowed,
        }
    }

    pub fn is_fully_paid(&self) -> bool {
        self.outstanding_balance == Money::ZERO
    }
}
