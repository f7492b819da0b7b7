//! Storage interfaces and implementations for catalog, orders and payments.

mod sqlite;

pub use sqlite::{SqliteStorage, SqliteStorageConfig};

use crate::domain::{
    Actor, CatalogItem, ItemType, Money, Order, OrderDraft, OrderItem, OrderStatus, Payment,
    PaymentMethod, PaymentStatus, PlacedOrder, ProofRef, StatusChange,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// CatalogLookup is the engine's view of the product and service catalog.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// GetItem returns the current record for an item, or None if it does not exist.
    async fn get_item(
        &self,
        item_type: ItemType,
        item_id: i64,
    ) -> Result<Option<CatalogItem>, StorageError>;

    /// AdjustStock atomically adds `delta` (may be negative) to a product's stock.
    /// Returns the new stock. Never drives stock below zero.
    async fn adjust_stock(&self, item_id: i64, delta: i64) -> Result<i64, StorageError>;
}

/// OrderStore persists orders, their lines, payments and status history.
///
/// Every mutating method is a single transaction. Status changes are
/// conditional on the expected current status so concurrent writers cannot
/// both win.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// PlaceOrder reserves stock and writes order, items, initial payment and
    /// the first history row, all or nothing.
    async fn place_order(
        &self,
        draft: &OrderDraft,
        number_prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<PlacedOrder, StorageError>;

    async fn get_order(&self, order_id: i64) -> Result<Option<Order>, StorageError>;

    async fn get_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StorageError>;

    /// Orders of one customer, newest first.
    async fn orders_for_customer(&self, customer_id: i64) -> Result<Vec<Order>, StorageError>;

    /// Moves an order forward. Fails with Conflict if the status moved meanwhile.
    async fn update_order_status(&self, update: &StatusUpdate) -> Result<Order, StorageError>;

    /// Cancels an order, restores reserved stock once and closes open payments.
    async fn cancel_order(
        &self,
        order_id: i64,
        from: OrderStatus,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<CancelOutcome, StorageError>;

    async fn get_payment(&self, payment_id: i64) -> Result<Option<Payment>, StorageError>;

    /// All payments of an order, oldest first.
    async fn payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, StorageError>;

    /// Creates a new PENDING payment attempt.
    async fn insert_payment(
        &self,
        order_id: i64,
        amount: Money,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Payment, StorageError>;

    /// Applies a payment transition. Fails with Conflict if the status moved meanwhile.
    async fn update_payment(&self, update: &PaymentUpdate) -> Result<Payment, StorageError>;

    /// Status history of an order, oldest first.
    async fn order_history(&self, order_id: i64) -> Result<Vec<StatusChange>, StorageError>;
}

/// StatusUpdate describes one validated forward order transition.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub order_id: i64,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub actor: Actor,
    pub at: DateTime<Utc>,
    /// COD payment to settle (PENDING -> PAID) in the same transaction.
    pub settle_cod_payment: Option<i64>,
}

/// PaymentUpdate describes one validated payment transition.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub payment_id: i64,
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    /// Replaces the stored proof reference when set.
    pub proof_ref: Option<ProofRef>,
    /// Replaces the stored notes when set.
    pub notes: Option<String>,
    /// Drops the stored notes when `notes` is None.
    pub clear_notes: bool,
    /// Recorded together with `at` as verified_at when set.
    pub verified_by: Option<i64>,
    pub at: DateTime<Utc>,
}

/// CancelOutcome reports what a cancellation actually did.
#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    /// The order was cancelled by this call and its stock restored.
    Cancelled(Order),
    /// The order was already cancelled. Nothing was touched.
    AlreadyCancelled(Order),
}

/// StorageError represents errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A conditional write lost against a concurrent writer, or SQLite was busy.
    #[error("Conflict: {0}")]
    Conflict(String),

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

    #[error("item {item_id} is no longer available")]
    ItemUnavailable { item_id: i64 },

    #[error("product {0} does not exist")]
    ProductNotFound(i64),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            if db.is_unique_violation() {
                return StorageError::Conflict(db.message().to_string());
            }
            // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes.
            let busy = db
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| matches!(code & 0xff, 5 | 6))
                .unwrap_or(false);
            if busy {
                return StorageError::Conflict(db.message().to_string());
            }
        }
        StorageError::Database(err)
    }
}
