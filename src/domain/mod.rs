//! Domain models for the order and payment lifecycle.

mod actor;
mod catalog;
mod money;
mod order;
mod payment;
mod reconciliation;
mod shipping;

pub use actor::{Actor, Role};
pub use catalog::{CatalogItem, ItemType};
pub use money::Money;
pub use order::{
    CartLine, CheckoutRequest, DraftLine, Order, OrderDraft, OrderItem, OrderStatus, PaymentMethod,
    PlacedOrder, StatusChange, format_order_number,
};
pub use payment::{Payment, PaymentStatus, ProofRef, VerificationDecision, active_payment};
pub use reconciliation::{InvoiceRule, Reconciliation};
pub use shipping::{LIGHT_PARCEL_MAX_GRAMS, ShippingTier, shipping_cost, total_weight};
