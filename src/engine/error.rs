//! Engine error types.

use crate::domain::{ItemType, Money, OrderStatus, PaymentStatus, Role};
use crate::storage::StorageError;

/// Engine error type.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(
        "insufficient stock for {name} (item {item_id}): \
         requested {requested}, available {available}"
    )]
    InsufficientStock {
        item_id: i64,
        name: String,
        requested: i64,
        available: i64,
    },

    #[error("{item_type} {item_id} not found in catalog")]
    CatalogItemNotFound { item_type: ItemType, item_id: i64 },

    #[error("illegal order transition {from} -> {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("illegal payment transition {from} -> {to}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("order {order_number} is not paid, outstanding {outstanding}")]
    PaymentNotConfirmed {
        order_number: String,
        outstanding: Money,
    },

    #[error("concurrent update: {0}")]
    ConcurrencyConflict(String),

    #[error("{role} may not {action}")]
    Forbidden { role: Role, action: &'static str },

    #[error("order {0} not found")]
    OrderNotFound(i64),

    #[error("payment {0} not found")]
    PaymentNotFound(i64),

    #[error("storage error: {0}")]
    Storage(#[source] StorageError),
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(msg) => EngineError::ConcurrencyConflict(msg),
            StorageError::InsufficientStock {
                item_id,
                name,
                requested,
                available,
            } => EngineError::InsufficientStock {
                item_id,
                name,
                requested,
                available,
            },
            StorageError::ItemUnavailable { item_id } => {
                EngineError::Validation(format!("product {} is no longer available", item_id))
            }
            StorageError::ProductNotFound(item_id) => EngineError::CatalogItemNotFound {
                item_type: ItemType::Product,
                item_id,
            },
            other => EngineError::Storage(other),
        }
    }
}
