//! SQLite implementation of CatalogLookup and OrderStore.

use crate::config::StorageConfig;
use crate::domain::{
    Actor, CatalogItem, DraftLine, ItemType, Money, Order, OrderDraft, OrderItem, OrderStatus,
    Payment, PaymentMethod, PaymentStatus, PlacedOrder, ProofRef, Role, StatusChange,
    format_order_number,
};
use crate::storage::{
    CancelOutcome, CatalogLookup, OrderStore, PaymentUpdate, StatusUpdate, StorageError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite, SqliteConnection};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const ORDER_COLUMNS: &str = "id, order_number, customer_id, total_amount, shipping_tier, \
    shipping_cost, status, shipping_address, payment_method, notes, stock_restored, \
    created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, order_id, amount, method, status, payment_proof_ref, notes, \
    created_at, updated_at, verified_at, verified_by";

/// SqliteStorage implements the catalog and order stores on one SQLite database.
///
/// Both live in the same database so that stock reservation and order
/// creation can share a transaction.
pub struct SqliteStorage {
    pool: Pool<Sqlite>,
}

/// SqliteStorageConfig holds SQLite storage configuration.
#[derive(Debug, Clone)]
pub struct SqliteStorageConfig {
    /// Path to the SQLite database file.
    pub path: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// How long a writer waits on a locked database.
    pub busy_timeout: Duration,
}

impl Default for SqliteStorageConfig {
    fn default() -> Self {
        Self {
            path: "backoffice.db".to_string(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&StorageConfig> for SqliteStorageConfig {
    fn from(config: &StorageConfig) -> Self {
        let defaults = Self::default();
        Self {
            path: config.path.clone(),
            max_connections: config.max_connections.unwrap_or(defaults.max_connections),
            busy_timeout: if config.busy_timeout.is_zero() {
                defaults.busy_timeout
            } else {
                config.busy_timeout
            },
        }
    }
}

impl SqliteStorage {
    /// Creates a new SQLite storage instance.
    pub async fn new(config: SqliteStorageConfig) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let storage = Self { pool };

        storage.migrate().await?;

        info!(path = %config.path, "SQLite storage initialized");
        Ok(storage)
    }

    /// Runs database migrations to create the schema.
    async fn migrate(&self) -> Result<(), StorageError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                price TEXT NOT NULL,
                stock INTEGER NOT NULL CHECK (stock >= 0),
                weight_grams INTEGER CHECK (weight_grams IS NULL OR weight_grams >= 0),
                active INTEGER NOT NULL DEFAULT 1,
                updated_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS services (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                price TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                updated_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_number TEXT NOT NULL UNIQUE,
                customer_id INTEGER NOT NULL,
                total_amount TEXT NOT NULL,
                shipping_tier TEXT,
                shipping_cost TEXT NOT NULL,
                status TEXT NOT NULL,
                shipping_address TEXT NOT NULL,
                payment_method TEXT NOT NULL,
                notes TEXT,
                stock_restored INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS order_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
                item_type TEXT NOT NULL,
                item_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                quantity INTEGER NOT NULL CHECK (quantity > 0),
                price TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS payments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id INTEGER NOT NULL REFERENCES orders(id),
                amount TEXT NOT NULL,
                method TEXT NOT NULL,
                status TEXT NOT NULL,
                payment_proof_ref TEXT,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                verified_at TEXT,
                verified_by INTEGER
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS order_status_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
                from_status TEXT,
                to_status TEXT NOT NULL,
                actor_id INTEGER NOT NULL,
                actor_role TEXT NOT NULL,
                at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS order_sequences (
                day TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(customer_id)",
            "CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id)",
            "CREATE INDEX IF NOT EXISTS idx_payments_order ON payments(order_id)",
            "CREATE INDEX IF NOT EXISTS idx_history_order ON order_status_history(order_id)",
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }

    /// Inserts or replaces a product record.
    pub async fn upsert_product(&self, item: &CatalogItem) -> Result<(), StorageError> {
        if item.item_type != ItemType::Product {
            return Err(StorageError::InvalidData(format!(
                "item {} is not a product",
                item.id
            )));
        }
        validate_price(item)?;
        let stock = item.stock.unwrap_or(0);
        if stock < 0 {
            return Err(StorageError::InvalidData(format!(
                "product {}: stock must not be negative",
                item.id
            )));
        }
        let weight = item
            .weight_grams
            .map(|w| {
                i64::try_from(w).map_err(|_| {
                    StorageError::InvalidData(format!("product {}: weight out of range", item.id))
                })
            })
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, stock, weight_grams, active, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                price = excluded.price,
                stock = excluded.stock,
                weight_grams = excluded.weight_grams,
                active = excluded.active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(item.unit_price.to_string())
        .bind(stock)
        .bind(weight)
        .bind(item.active)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(product_id = item.id, stock, "Product upserted");
        Ok(())
    }

    /// Inserts or replaces a service record.
    pub async fn upsert_service(&self, item: &CatalogItem) -> Result<(), StorageError> {
        if item.item_type != ItemType::Service {
            return Err(StorageError::InvalidData(format!(
                "item {} is not a service",
                item.id
            )));
        }
        validate_price(item)?;

        sqlx::query(
            r#"
            INSERT INTO services (id, name, price, active, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                price = excluded.price,
                active = excluded.active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(item.unit_price.to_string())
        .bind(item.active)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(service_id = item.id, "Service upserted");
        Ok(())
    }

    /// Closes the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn validate_price(item: &CatalogItem) -> Result<(), StorageError> {
    if item.unit_price.is_negative() {
        return Err(StorageError::InvalidData(format!(
            "item {}: price must not be negative",
            item.id
        )));
    }
    Ok(())
}

fn validate_amount(amount: Money, what: &str) -> Result<(), StorageError> {
    if !amount.is_positive() {
        return Err(StorageError::InvalidData(format!(
            "{} must be positive, got {}",
            what, amount
        )));
    }
    Ok(())
}

#[async_trait]
impl CatalogLookup for SqliteStorage {
    async fn get_item(
        &self,
        item_type: ItemType,
        item_id: i64,
    ) -> Result<Option<CatalogItem>, StorageError> {
        let row = match item_type {
            ItemType::Product => {
                sqlx::query(
                    r#"
                    SELECT id, name, price, stock, weight_grams, active
                    FROM products WHERE id = ?
                    "#,
                )
                .bind(item_id)
                .fetch_optional(&self.pool)
                .await?
            }
            ItemType::Service => {
                sqlx::query("SELECT id, name, price, active FROM services WHERE id = ?")
                    .bind(item_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        row.map(|row| parse_catalog_row(&row, item_type)).transpose()
    }

    async fn adjust_stock(&self, item_id: i64, delta: i64) -> Result<i64, StorageError> {
        let row = sqlx::query(
            r#"
            UPDATE products SET stock = stock + ?1, updated_at = ?2
            WHERE id = ?3 AND stock + ?1 >= 0
            RETURNING stock
            "#,
        )
        .bind(delta)
        .bind(Utc::now().to_rfc3339())
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            let stock: i64 = row.try_get("stock")?;
            debug!(product_id = item_id, delta, stock, "Stock adjusted");
            return Ok(stock);
        }

        let current = sqlx::query("SELECT name, stock FROM products WHERE id = ?")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;

        match current {
            Some(row) => Err(StorageError::InsufficientStock {
                item_id,
                name: row.try_get("name")?,
                requested: -delta,
                available: row.try_get("stock")?,
            }),
            None => Err(StorageError::ProductNotFound(item_id)),
        }
    }
}

#[async_trait]
impl OrderStore for SqliteStorage {
    async fn place_order(
        &self,
        draft: &OrderDraft,
        number_prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<PlacedOrder, StorageError> {
        validate_amount(draft.total_amount, "order total")?;

        let stamp = now.to_rfc3339();
        let day = now.date_naive();

        let mut tx = self.pool.begin().await?;

        // First statement is a write so the transaction holds the write lock
        // from here on.
        let sequence: i64 = sqlx::query(
            r#"
            INSERT INTO order_sequences (day, value) VALUES (?1, 1)
            ON CONFLICT(day) DO UPDATE SET value = value + 1
            RETURNING value
            "#,
        )
        .bind(day.format("%Y%m%d").to_string())
        .fetch_one(&mut *tx)
        .await?
        .try_get("value")?;
        let order_number = format_order_number(number_prefix, day, sequence);

        for line in draft.lines.iter().filter(|l| l.item_type == ItemType::Product) {
            reserve_stock(&mut tx, line, &stamp).await?;
        }

        let order_id = sqlx::query(
            r#"
            INSERT INTO orders (
                order_number, customer_id, total_amount, shipping_tier, shipping_cost, status,
                shipping_address, payment_method, notes, stock_restored, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?10)
            "#,
        )
        .bind(&order_number)
        .bind(draft.customer_id)
        .bind(draft.total_amount.to_string())
        .bind(draft.shipping_tier.map(|t| t.to_string()))
        .bind(draft.shipping_cost.to_string())
        .bind(OrderStatus::Pending.to_string())
        .bind(&draft.shipping_address)
        .bind(draft.payment_method.to_string())
        .bind(&draft.notes)
        .bind(&stamp)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let item_id = sqlx::query(
                r#"
                INSERT INTO order_items (order_id, item_type, item_id, name, quantity, price)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(order_id)
            .bind(line.item_type.to_string())
            .bind(line.item_id)
            .bind(&line.name)
            .bind(line.quantity)
            .bind(line.price.to_string())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            items.push(OrderItem {
                id: item_id,
                order_id,
                item_type: line.item_type,
                item_id: line.item_id,
                name: line.name.clone(),
                quantity: line.quantity,
                price: line.price,
            });
        }

        let payment_id = sqlx::query(
            r#"
            INSERT INTO payments (order_id, amount, method, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(order_id)
        .bind(draft.total_amount.to_string())
        .bind(draft.payment_method.to_string())
        .bind(PaymentStatus::Pending.to_string())
        .bind(&stamp)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let customer = Actor::customer(draft.customer_id);
        insert_history(&mut tx, order_id, None, OrderStatus::Pending, &customer, &stamp).await?;

        tx.commit().await?;

        debug!(
            order_id,
            order_number = %order_number,
            lines = items.len(),
            "Order persisted"
        );

        Ok(PlacedOrder {
            order: Order {
                id: order_id,
                order_number,
                customer_id: draft.customer_id,
                total_amount: draft.total_amount,
                shipping_tier: draft.shipping_tier,
                shipping_cost: draft.shipping_cost,
                status: OrderStatus::Pending,
                shipping_address: draft.shipping_address.clone(),
                payment_method: draft.payment_method,
                notes: draft.notes.clone(),
                stock_restored: false,
                created_at: now,
                updated_at: now,
            },
            items,
            payment: Payment {
                id: payment_id,
                order_id,
                amount: draft.total_amount,
                method: draft.payment_method,
                status: PaymentStatus::Pending,
                payment_proof_ref: None,
                notes: None,
                created_at: now,
                updated_at: now,
                verified_at: None,
                verified_by: None,
            },
        })
    }

    async fn get_order(&self, order_id: i64) -> Result<Option<Order>, StorageError> {
        let row = sqlx::query(&format!("SELECT {} FROM orders WHERE id = ?", ORDER_COLUMNS))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(parse_order_row).transpose()
    }

    async fn get_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, item_type, item_id, name, quantity, price
            FROM order_items WHERE order_id = ? ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_item_row).collect()
    }

    async fn orders_for_customer(&self, customer_id: i64) -> Result<Vec<Order>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM orders WHERE customer_id = ? ORDER BY created_at DESC, id DESC",
            ORDER_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_order_row).collect()
    }

    async fn update_order_status(&self, update: &StatusUpdate) -> Result<Order, StorageError> {
        let stamp = update.at.to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        )
        .bind(update.to.to_string())
        .bind(&stamp)
        .bind(update.order_id)
        .bind(update.from.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict(format!(
                "order {} is no longer {}",
                update.order_id, update.from
            )));
        }

        if let Some(payment_id) = update.settle_cod_payment {
            let settled = sqlx::query(
                r#"
                UPDATE payments
                SET status = ?1, verified_at = ?2, verified_by = ?3, updated_at = ?2
                WHERE id = ?4 AND status = ?5
                "#,
            )
            .bind(PaymentStatus::Paid.to_string())
            .bind(&stamp)
            .bind(update.actor.id)
            .bind(payment_id)
            .bind(PaymentStatus::Pending.to_string())
            .execute(&mut *tx)
            .await?;

            if settled.rows_affected() == 0 {
                return Err(StorageError::Conflict(format!(
                    "payment {} is no longer pending",
                    payment_id
                )));
            }
        }

        insert_history(
            &mut tx,
            update.order_id,
            Some(update.from),
            update.to,
            &update.actor,
            &stamp,
        )
        .await?;

        let order = fetch_order(&mut tx, update.order_id).await?;
        tx.commit().await?;

        Ok(order)
    }

    async fn cancel_order(
        &self,
        order_id: i64,
        from: OrderStatus,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<CancelOutcome, StorageError> {
        let stamp = now.to_rfc3339();
        let mut tx = self.pool.begin().await?;

        // The stock_restored guard makes the restore below happen at most once.
        let result = sqlx::query(
            r#"
            UPDATE orders SET status = ?1, stock_restored = 1, updated_at = ?2
            WHERE id = ?3 AND status = ?4 AND stock_restored = 0
            "#,
        )
        .bind(OrderStatus::Cancelled.to_string())
        .bind(&stamp)
        .bind(order_id)
        .bind(from.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let current = fetch_order(&mut tx, order_id).await?;
            return if current.status == OrderStatus::Cancelled {
                Ok(CancelOutcome::AlreadyCancelled(current))
            } else {
                Err(StorageError::Conflict(format!(
                    "order {} moved from {} to {}",
                    order_id, from, current.status
                )))
            };
        }

        let reserved = sqlx::query(
            "SELECT item_id, quantity FROM order_items WHERE order_id = ? AND item_type = ?",
        )
        .bind(order_id)
        .bind(ItemType::Product.to_string())
        .fetch_all(&mut *tx)
        .await?;

        for row in &reserved {
            let item_id: i64 = row.try_get("item_id")?;
            let quantity: i64 = row.try_get("quantity")?;

            let restored = sqlx::query(
                "UPDATE products SET stock = stock + ?1, updated_at = ?2 WHERE id = ?3",
            )
            .bind(quantity)
            .bind(&stamp)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

            if restored.rows_affected() == 0 {
                warn!(
                    order_id,
                    product_id = item_id,
                    quantity,
                    "Product missing, stock not restored"
                );
            }
        }

        sqlx::query(
            r#"
            UPDATE payments SET status = ?1, updated_at = ?2
            WHERE order_id = ?3 AND status IN (?4, ?5)
            "#,
        )
        .bind(PaymentStatus::Cancelled.to_string())
        .bind(&stamp)
        .bind(order_id)
        .bind(PaymentStatus::Pending.to_string())
        .bind(PaymentStatus::Failed.to_string())
        .execute(&mut *tx)
        .await?;

        insert_history(&mut tx, order_id, Some(from), OrderStatus::Cancelled, actor, &stamp).await?;

        let order = fetch_order(&mut tx, order_id).await?;
        tx.commit().await?;

        debug!(order_id, restored_lines = reserved.len(), "Order cancelled");
        Ok(CancelOutcome::Cancelled(order))
    }

    async fn get_payment(&self, payment_id: i64) -> Result<Option<Payment>, StorageError> {
        let row = sqlx::query(&format!("SELECT {} FROM payments WHERE id = ?", PAYMENT_COLUMNS))
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(parse_payment_row).transpose()
    }

    async fn payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM payments WHERE order_id = ? ORDER BY id",
            PAYMENT_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_payment_row).collect()
    }

    async fn insert_payment(
        &self,
        order_id: i64,
        amount: Money,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Payment, StorageError> {
        validate_amount(amount, "payment")?;

        let id = sqlx::query(
            r#"
            INSERT INTO payments (order_id, amount, method, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(order_id)
        .bind(amount.to_string())
        .bind(method.to_string())
        .bind(PaymentStatus::Pending.to_string())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Payment {
            id,
            order_id,
            amount,
            method,
            status: PaymentStatus::Pending,
            payment_proof_ref: None,
            notes: None,
            created_at: now,
            updated_at: now,
            verified_at: None,
            verified_by: None,
        })
    }

    async fn update_payment(&self, update: &PaymentUpdate) -> Result<Payment, StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = ?1,
                payment_proof_ref = COALESCE(?2, payment_proof_ref),
                notes = CASE WHEN ?8 THEN ?3 ELSE COALESCE(?3, notes) END,
                verified_by = COALESCE(?4, verified_by),
                verified_at = CASE WHEN ?4 IS NULL THEN verified_at ELSE ?5 END,
                updated_at = ?5
            WHERE id = ?6 AND status = ?7
            "#,
        )
        .bind(update.to.to_string())
        .bind(update.proof_ref.as_ref().map(|p| p.as_str().to_string()))
        .bind(&update.notes)
        .bind(update.verified_by)
        .bind(update.at.to_rfc3339())
        .bind(update.payment_id)
        .bind(update.from.to_string())
        .bind(update.clear_notes)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict(format!(
                "payment {} is no longer {}",
                update.payment_id, update.from
            )));
        }

        self.get_payment(update.payment_id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("payment {}", update.payment_id)))
    }

    async fn order_history(&self, order_id: i64) -> Result<Vec<StatusChange>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, from_status, to_status, actor_id, actor_role, at
            FROM order_status_history WHERE order_id = ? ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_history_row).collect()
    }
}

/// Conditionally decrements stock for one product line.
async fn reserve_stock(
    conn: &mut SqliteConnection,
    line: &DraftLine,
    stamp: &str,
) -> Result<(), StorageError> {
    let result = sqlx::query(
        r#"
        UPDATE products SET stock = stock - ?1, updated_at = ?2
        WHERE id = ?3 AND active = 1 AND stock >= ?1
        "#,
    )
    .bind(line.quantity)
    .bind(stamp)
    .bind(line.item_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let row = sqlx::query("SELECT name, stock, active FROM products WHERE id = ?")
        .bind(line.item_id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Err(StorageError::ProductNotFound(line.item_id));
    };

    let active: bool = row.try_get("active")?;
    if !active {
        return Err(StorageError::ItemUnavailable {
            item_id: line.item_id,
        });
    }

    Err(StorageError::InsufficientStock {
        item_id: line.item_id,
        name: row.try_get("name")?,
        requested: line.quantity,
        available: row.try_get("stock")?,
    })
}

async fn insert_history(
    conn: &mut SqliteConnection,
    order_id: i64,
    from: Option<OrderStatus>,
    to: OrderStatus,
    actor: &Actor,
    stamp: &str,
) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        INSERT INTO order_status_history
            (order_id, from_status, to_status, actor_id, actor_role, at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(order_id)
    .bind(from.map(|s| s.to_string()))
    .bind(to.to_string())
    .bind(actor.id)
    .bind(actor.role.to_string())
    .bind(stamp)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn fetch_order(conn: &mut SqliteConnection, order_id: i64) -> Result<Order, StorageError> {
    let row = sqlx::query(&format!("SELECT {} FROM orders WHERE id = ?", ORDER_COLUMNS))
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => parse_order_row(&row),
        None => Err(StorageError::NotFound(format!("order {}", order_id))),
    }
}

/// Parses a TEXT column through `FromStr`.
fn parse_column<T>(row: &SqliteRow, column: &str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: String = row.try_get(column)?;
    T::from_str(&raw)
        .map_err(|e| StorageError::InvalidData(format!("Invalid {}: {}", column, e)))
}

fn parse_optional_column<T>(row: &SqliteRow, column: &str) -> Result<Option<T>, StorageError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|raw| {
        T::from_str(&raw)
            .map_err(|e| StorageError::InvalidData(format!("Invalid {}: {}", column, e)))
    })
    .transpose()
}

fn parse_time(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, StorageError> {
    let raw: String = row.try_get(column)?;
    parse_rfc3339(column, &raw)
}

fn parse_optional_time(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<DateTime<Utc>>, StorageError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|raw| parse_rfc3339(column, &raw)).transpose()
}

fn parse_rfc3339(column: &str, raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidData(format!("Invalid {}: {}", column, e)))
}

fn parse_catalog_row(row: &SqliteRow, item_type: ItemType) -> Result<CatalogItem, StorageError> {
    let (stock, weight_grams) = match item_type {
        ItemType::Product => {
            let stock: i64 = row.try_get("stock")?;
            let weight: Option<i64> = row.try_get("weight_grams")?;
            let weight = weight
                .map(|w| {
                    u64::try_from(w).map_err(|_| {
                        StorageError::InvalidData(format!("Invalid weight_grams: {}", w))
                    })
                })
                .transpose()?;
            (Some(stock), weight)
        }
        ItemType::Service => (None, None),
    };

    Ok(CatalogItem {
        item_type,
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        unit_price: parse_column(row, "price")?,
        stock,
        weight_grams,
        active: row.try_get("active")?,
    })
}

/// Parses an order from a database row.
fn parse_order_row(row: &SqliteRow) -> Result<Order, StorageError> {
    Ok(Order {
        id: row.try_get("id")?,
        order_number: row.try_get("order_number")?,
        customer_id: row.try_get("customer_id")?,
        total_amount: parse_column(row, "total_amount")?,
        shipping_tier: parse_optional_column(row, "shipping_tier")?,
        shipping_cost: parse_column(row, "shipping_cost")?,
        status: parse_column(row, "status")?,
        shipping_address: row.try_get("shipping_address")?,
        payment_method: parse_column(row, "payment_method")?,
        notes: row.try_get("notes")?,
        stock_restored: row.try_get("stock_restored")?,
        created_at: parse_time(row, "created_at")?,
        updated_at: parse_time(row, "updated_at")?,
    })
}

fn parse_item_row(row: &SqliteRow) -> Result<OrderItem, StorageError> {
    Ok(OrderItem {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        item_type: parse_column(row, "item_type")?,
        item_id: row.try_get("item_id")?,
        name: row.try_get("name")?,
        quantity: row.try_get("quantity")?,
        price: parse_column(row, "price")?,
    })
}

fn parse_payment_row(row: &SqliteRow) -> Result<Payment, StorageError> {
    let proof: Option<String> = row.try_get("payment_proof_ref")?;
    let payment_proof_ref = proof
        .map(ProofRef::new)
        .transpose()
        .map_err(|e| StorageError::InvalidData(format!("Invalid payment_proof_ref: {}", e)))?;

    Ok(Payment {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        amount: parse_column(row, "amount")?,
        method: parse_column(row, "method")?,
        status: parse_column(row, "status")?,
        payment_proof_ref,
        notes: row.try_get("notes")?,
        created_at: parse_time(row, "created_at")?,
        updated_at: parse_time(row, "updated_at")?,
        verified_at: parse_optional_time(row, "verified_at")?,
        verified_by: row.try_get("verified_by")?,
    })
}

fn parse_history_row(row: &SqliteRow) -> Result<StatusChange, StorageError> {
    Ok(StatusChange {
        order_id: row.try_get("order_id")?,
        from_status: parse_optional_column(row, "from_status")?,
        to_status: parse_column(row, "to_status")?,
        actor_id: row.try_get("actor_id")?,
        actor_role: parse_column::<Role>(row, "actor_role")?,
        at: parse_time(row, "at")?,
    })
}
