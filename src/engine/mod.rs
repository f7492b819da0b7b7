//! Order and payment lifecycle engine.
//!
//! Coordinates the catalog, the order builder and the two state machines,
//! and enforces who may do what.

mod builder;
mod error;

pub use error::EngineError;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{Config, PolicyConfig};
use crate::domain::{
    Actor, CheckoutRequest, Order, OrderItem, OrderStatus, Payment, PaymentMethod, PaymentStatus,
    PlacedOrder, ProofRef, Reconciliation, Role, StatusChange, VerificationDecision,
    active_payment,
};
use crate::storage::{
    CancelOutcome, CatalogLookup, OrderStore, PaymentUpdate, SqliteStorage, SqliteStorageConfig,
    StatusUpdate,
};

/// Engine is the shared entry point for every order and payment operation.
///
/// It holds no mutable state of its own and is safe to share behind an `Arc`.
pub struct Engine {
    catalog: Arc<dyn CatalogLookup>,
    orders: Arc<dyn OrderStore>,
    policy: PolicyConfig,
}

impl Engine {
    /// Creates an engine over the given stores.
    pub fn new(
        catalog: Arc<dyn CatalogLookup>,
        orders: Arc<dyn OrderStore>,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            catalog,
            orders,
            policy,
        }
    }

    /// Creates an engine where one SQLite database backs both stores.
    pub fn with_storage(storage: Arc<SqliteStorage>, policy: PolicyConfig) -> Self {
        Self::new(storage.clone(), storage, policy)
    }

    /// Opens the configured database and builds an engine on top of it.
    pub async fn from_config(config: &Config) -> Result<Self, EngineError> {
        let storage = SqliteStorage::new(SqliteStorageConfig::from(&config.storage)).await?;

        info!(
            app = %config.app.name,
            env = %config.app.env,
            require_paid_before_ship = config.policy.require_paid_before_ship,
            invoice_rule = %config.policy.invoice_rule,
            "Engine initialized"
        );

        Ok(Self::with_storage(Arc::new(storage), config.policy.clone()))
    }

    // ==================== Orders ====================

    /// Converts a cart into a persisted PENDING order with its first payment.
    pub async fn create_order(&self, request: CheckoutRequest) -> Result<PlacedOrder, EngineError> {
        let draft = builder::build_draft(self.catalog.as_ref(), &request).await?;

        let placed = self
            .orders
            .place_order(&draft, &self.policy.order_number_prefix, Utc::now())
            .await?;

        info!(
            order_id = placed.order.id,
            order_number = %placed.order.order_number,
            customer_id = placed.order.customer_id,
            lines = placed.items.len(),
            total = %placed.order.total_amount,
            shipping = %placed.order.shipping_cost,
            method = %placed.order.payment_method,
            "Order created"
        );

        Ok(placed)
    }

    /// Moves an order to `requested`. CANCELLED is delegated to [`Engine::cancel_order`].
    pub async fn transition_order_status(
        &self,
        order_id: i64,
        requested: OrderStatus,
        actor: &Actor,
    ) -> Result<Order, EngineError> {
        if requested == OrderStatus::Cancelled {
            return self.cancel_order(order_id, actor).await;
        }

        if actor.role != Role::Admin {
            return Err(EngineError::Forbidden {
                role: actor.role,
                action: "change order status",
            });
        }

        let order = self.get_order(order_id).await?;

        if !order.status.can_transition_to(requested) {
            return Err(EngineError::InvalidStatusTransition {
                from: order.status,
                to: requested,
            });
        }

        let payments = self.orders.payments_for_order(order_id).await?;
        let cod = order.payment_method == PaymentMethod::Cod;

        if requested == OrderStatus::Shipped && self.policy.require_paid_before_ship && !cod {
            let rec = Reconciliation::compute(&order, &payments, self.policy.invoice_rule);
            if !rec.is_fully_paid() {
                warn!(
                    order_number = %order.order_number,
                    outstanding = %rec.outstanding_balance,
                    "Shipment blocked, payment not confirmed"
                );
                return Err(EngineError::PaymentNotConfirmed {
                    order_number: order.order_number,
                    outstanding: rec.outstanding_balance,
                });
            }
        }

        let settle_cod_payment = if requested == OrderStatus::Delivered && cod {
            match active_payment(&payments) {
                Some(p) if p.status.can_transition_to(PaymentStatus::Paid, p.method) => Some(p.id),
                Some(p) => {
                    return Err(EngineError::InvalidPaymentTransition {
                        from: p.status,
                        to: PaymentStatus::Paid,
                    });
                }
                None => {
                    warn!(
                        order_number = %order.order_number,
                        "COD order delivered without an open payment"
                    );
                    None
                }
            }
        } else {
            None
        };

        let updated = self
            .orders
            .update_order_status(&StatusUpdate {
                order_id,
                from: order.status,
                to: requested,
                actor: *actor,
                at: Utc::now(),
                settle_cod_payment,
            })
            .await?;

        info!(
            order_number = %updated.order_number,
            from = %order.status,
            to = %updated.status,
            actor_id = actor.id,
            cod_settled = settle_cod_payment.is_some(),
            "Order status changed"
        );

        Ok(updated)
    }

    /// Cancels an order and gives its reserved stock back.
    ///
    /// Cancelling an already cancelled order returns it unchanged.
    pub async fn cancel_order(&self, order_id: i64, actor: &Actor) -> Result<Order, EngineError> {
        let order = self.get_order(order_id).await?;

        if !actor.acts_for_customer(order.customer_id) {
            return Err(EngineError::Forbidden {
                role: actor.role,
                action: "cancel this order",
            });
        }

        if order.status == OrderStatus::Cancelled {
            debug!(order_number = %order.order_number, "Order already cancelled");
            return Ok(order);
        }

        if !order.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(EngineError::InvalidStatusTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }

        let outcome = self
            .orders
            .cancel_order(order_id, order.status, actor, Utc::now())
            .await?;

        match outcome {
            CancelOutcome::Cancelled(cancelled) => {
                info!(
                    order_number = %cancelled.order_number,
                    from = %order.status,
                    actor_id = actor.id,
                    role = %actor.role,
                    "Order cancelled, stock restored"
                );
                Ok(cancelled)
            }
            CancelOutcome::AlreadyCancelled(cancelled) => {
                debug!(order_number = %cancelled.order_number, "Order cancelled concurrently");
                Ok(cancelled)
            }
        }
    }

    /// Returns an order or `OrderNotFound`.
    pub async fn get_order(&self, order_id: i64) -> Result<Order, EngineError> {
        self.orders
            .get_order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))
    }

    /// Returns the lines of an order.
    pub async fn order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, EngineError> {
        self.get_order(order_id).await?;
        Ok(self.orders.get_order_items(order_id).await?)
    }

    /// Returns every payment attempt of an order, oldest first.
    pub async fn order_payments(&self, order_id: i64) -> Result<Vec<Payment>, EngineError> {
        self.get_order(order_id).await?;
        Ok(self.orders.payments_for_order(order_id).await?)
    }

    /// Returns the status history of an order, oldest first.
    pub async fn order_history(&self, order_id: i64) -> Result<Vec<StatusChange>, EngineError> {
        self.get_order(order_id).await?;
        Ok(self.orders.order_history(order_id).await?)
    }

    /// Returns a customer's orders, newest first.
    pub async fn orders_for_customer(&self, customer_id: i64) -> Result<Vec<Order>, EngineError> {
        Ok(self.orders.orders_for_customer(customer_id).await?)
    }

    // ==================== Payments ====================

    /// Attaches a proof of payment to the order's active payment.
    pub async fn submit_payment_proof(
        &self,
        order_id: i64,
        proof_ref: ProofRef,
        actor: &Actor,
    ) -> Result<Payment, EngineError> {
        let order = self.get_order(order_id).await?;

        if !actor.acts_for_customer(order.customer_id) {
            return Err(EngineError::Forbidden {
                role: actor.role,
                action: "submit payment proof for this order",
            });
        }

        let payments = self.orders.payments_for_order(order_id).await?;
        let rec = Reconciliation::compute(&order, &payments, self.policy.invoice_rule);
        if !rec.proof_upload_allowed {
            return Err(EngineError::Validation(format!(
                "order {} does not accept payment proof (status {}, outstanding {})",
                order.order_number, order.status, rec.outstanding_balance
            )));
        }

        let payment = active_payment(&payments).ok_or_else(|| {
            EngineError::Validation(format!(
                "order {} has no open payment",
                order.order_number
            ))
        })?;

        let to = PaymentStatus::PendingVerification;
        if !payment.status.can_transition_to(to, payment.method) {
            return Err(EngineError::InvalidPaymentTransition {
                from: payment.status,
                to,
            });
        }

        let updated = self
            .orders
            .update_payment(&PaymentUpdate {
                payment_id: payment.id,
                from: payment.status,
                to,
                proof_ref: Some(proof_ref),
                notes: None,
                clear_notes: true,
                verified_by: None,
                at: Utc::now(),
            })
            .await?;

        info!(
            order_number = %order.order_number,
            payment_id = updated.id,
            from = %payment.status,
            "Payment proof submitted"
        );

        Ok(updated)
    }

    /// Records the finance decision on a payment awaiting verification.
    pub async fn verify_payment(
        &self,
        payment_id: i64,
        decision: VerificationDecision,
        actor: &Actor,
        notes: Option<String>,
    ) -> Result<Payment, EngineError> {
        if !actor.can_verify_payments() {
            return Err(EngineError::Forbidden {
                role: actor.role,
                action: "verify payments",
            });
        }

        let payment = self.get_payment(payment_id).await?;
        let to = decision.target_status();
        if !payment.status.can_transition_to(to, payment.method) {
            return Err(EngineError::InvalidPaymentTransition {
                from: payment.status,
                to,
            });
        }

        let verified_by = (to == PaymentStatus::Paid).then_some(actor.id);

        let updated = self
            .orders
            .update_payment(&PaymentUpdate {
                payment_id,
                from: payment.status,
                to,
                proof_ref: None,
                notes: clean_notes(notes),
                clear_notes: false,
                verified_by,
                at: Utc::now(),
            })
            .await?;

        info!(
            payment_id,
            order_id = updated.order_id,
            status = %updated.status,
            amount = %updated.amount,
            actor_id = actor.id,
            "Payment verified"
        );

        Ok(updated)
    }

    /// Marks a PAID payment as refunded.
    pub async fn refund_payment(
        &self,
        payment_id: i64,
        actor: &Actor,
        notes: Option<String>,
    ) -> Result<Payment, EngineError> {
        self.finance_transition(
            payment_id,
            PaymentStatus::Refunded,
            actor,
            notes,
            "refund payments",
        )
            .await
    }

    /// Abandons a PENDING or FAILED payment attempt.
    pub async fn cancel_payment(
        &self,
        payment_id: i64,
        actor: &Actor,
    ) -> Result<Payment, EngineError> {
        self.finance_transition(
            payment_id,
            PaymentStatus::Cancelled,
            actor,
            None,
            "cancel payments",
        )
            .await
    }

    /// Opens a new PENDING payment for whatever is still outstanding.
    pub async fn open_payment_attempt(
        &self,
        order_id: i64,
        actor: &Actor,
    ) -> Result<Payment, EngineError> {
        let order = self.get_order(order_id).await?;

        if !actor.acts_for_customer(order.customer_id) && !actor.can_verify_payments() {
            return Err(EngineError::Forbidden {
                role: actor.role,
                action: "open a payment for this order",
            });
        }

        if order.status == OrderStatus::Cancelled {
            return Err(EngineError::Validation(format!(
                "order {} is cancelled",
                order.order_number
            )));
        }

        let payments = self.orders.payments_for_order(order_id).await?;
        if let Some(open) = active_payment(&payments) {
            return Err(EngineError::Validation(format!(
                "order {} already has open payment {} ({})",
                order.order_number, open.id, open.status
            )));
        }

        let rec = Reconciliation::compute(&order, &payments, self.policy.invoice_rule);
        if !rec.outstanding_balance.is_positive() {
            return Err(EngineError::Validation(format!(
                "order {} has nothing outstanding",
                order.order_number
            )));
        }

        let payment = self
            .orders
            .insert_payment(order_id, rec.outstanding_balance, order.payment_method, Utc::now())
            .await?;

        info!(
            order_number = %order.order_number,
            payment_id = payment.id,
            amount = %payment.amount,
            "Payment attempt opened"
        );

        Ok(payment)
    }

    /// Returns a payment or `PaymentNotFound`.
    pub async fn get_payment(&self, payment_id: i64) -> Result<Payment, EngineError> {
        self.orders
            .get_payment(payment_id)
            .await?
            .ok_or(EngineError::PaymentNotFound(payment_id))
    }

    /// Compares confirmed payments against the order total.
    pub async fn get_reconciliation(&self, order_id: i64) -> Result<Reconciliation, EngineError> {
        let order = self.get_order(order_id).await?;
        let payments = self.orders.payments_for_order(order_id).await?;
        Ok(Reconciliation::compute(
            &order,
            &payments,
            self.policy.invoice_rule,
        ))
    }

    /// Staff-only payment transition without a proof or verifier.
    async fn finance_transition(
        &self,
        payment_id: i64,
        to: PaymentStatus,
        actor: &Actor,
        notes: Option<String>,
        action: &'static str,
    ) -> Result<Payment, EngineError> {
        if !actor.can_verify_payments() {
            return Err(EngineError::Forbidden {
                role: actor.role,
                action,
            });
        }

        let payment = self.get_payment(payment_id).await?;
        if !payment.status.can_transition_to(to, payment.method) {
            return Err(EngineError::InvalidPaymentTransition {
                from: payment.status,
                to,
            });
        }

        let updated = self
            .orders
            .update_payment(&PaymentUpdate {
                payment_id,
                from: payment.status,
                to,
                proof_ref: None,
                notes: clean_notes(notes),
                clear_notes: false,
                verified_by: None,
                at: Utc::now(),
            })
            .await?;

        info!(
            payment_id,
            order_id = updated.order_id,
            from = %payment.status,
            to = %updated.status,
            actor_id = actor.id,
            "Payment status changed"
        );

        Ok(updated)
    }
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests;
