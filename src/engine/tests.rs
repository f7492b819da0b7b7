//! Tests for the engine against a throwaway SQLite database.

use super::*;
use crate::domain::{CartLine, CatalogItem, ItemType, Money, ShippingTier};
use tempfile::TempDir;

const CUSTOMER: i64 = 42;

struct Fixture {
    engine: Arc<Engine>,
    storage: Arc<SqliteStorage>,
    _dir: TempDir,
}

async fn fixture_with_policy(policy: PolicyConfig) -> Fixture {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.db");
    let storage = Arc::new(
        SqliteStorage::new(SqliteStorageConfig {
            path: path.to_str().unwrap().to_string(),
            ..SqliteStorageConfig::default()
        })
        .await
        .unwrap(),
    );

    storage
        .upsert_product(&CatalogItem::product(1, "Bracket", Money::from(50000), 5, Some(1500)))
        .await
        .unwrap();
    storage
        .upsert_product(&CatalogItem::product(2, "Panel", Money::from(20000), 1, Some(6000)))
        .await
        .unwrap();
    storage
        .upsert_service(&CatalogItem::service(7, "Installation", Money::from(150000)))
        .await
        .unwrap();

    Fixture {
        engine: Arc::new(Engine::with_storage(storage.clone(), policy)),
        storage,
        _dir: dir,
    }
}

async fn fixture() -> Fixture {
    fixture_with_policy(PolicyConfig::default()).await
}

fn checkout(items: Vec<CartLine>, method: PaymentMethod) -> CheckoutRequest {
    CheckoutRequest {
        customer_id: CUSTOMER,
        items,
        shipping_address: "Jl. Merdeka 1, Jakarta".to_string(),
        payment_method: Some(method),
        shipping_tier: None,
        notes: None,
    }
}

async fn stock_of(fx: &Fixture, id: i64) -> i64 {
    fx.storage
        .get_item(ItemType::Product, id)
        .await
        .unwrap()
        .unwrap()
        .stock
        .unwrap()
}

fn proof(key: &str) -> ProofRef {
    ProofRef::new(key).unwrap()
}

/// Places a bank transfer order for two brackets and pays it in full.
async fn paid_order(fx: &Fixture) -> PlacedOrder {
    let placed = fx
        .engine
        .create_order(checkout(vec![CartLine::product(1, 2)], PaymentMethod::BankTransfer))
        .await
        .unwrap();
    fx.engine
        .submit_payment_proof(placed.order.id, proof("receipts/1.jpg"), &Actor::customer(CUSTOMER))
        .await
        .unwrap();
    fx.engine
        .verify_payment(placed.payment.id, VerificationDecision::Paid, &Actor::finance(9), None)
        .await
        .unwrap();
    placed
}

// ==================== Order creation ====================

#[tokio::test]
async fn test_create_order_reserves_stock_and_opens_payment() {
    let fx = fixture().await;

    let placed = fx
        .engine
        .create_order(checkout(vec![CartLine::product(1, 2)], PaymentMethod::BankTransfer))
        .await
        .unwrap();

    assert_eq!(placed.order.total_amount, Money::from(100000));
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert!(placed.order.order_number.starts_with("ORD-"));
    assert_eq!(stock_of(&fx, 1).await, 3);
    assert_eq!(placed.payment.status, PaymentStatus::Pending);
    assert_eq!(placed.payment.amount, Money::from(100000));
    assert_eq!(placed.payment.method, PaymentMethod::BankTransfer);
}

#[tokio::test]
async fn test_total_equals_sum_of_lines() {
    let fx = fixture().await;

    let placed = fx
        .engine
        .create_order(checkout(
            vec![CartLine::product(1, 3), CartLine::service(7, 2), CartLine::product(2, 1)],
            PaymentMethod::EWallet,
        ))
        .await
        .unwrap();

    let items = fx.engine.order_items(placed.order.id).await.unwrap();
    let sum: Money = items
        .iter()
        .map(|i| i.price.checked_times(i.quantity).unwrap())
        .sum();
    assert_eq!(placed.order.total_amount, sum);
    assert_eq!(sum, Money::from(3 * 50000 + 2 * 150000 + 20000));
    assert_eq!(stock_of(&fx, 1).await, 2);
    assert_eq!(stock_of(&fx, 2).await, 0);
}

#[tokio::test]
async fn test_shipping_tier_is_folded_into_total() {
    let fx = fixture().await;
    let mut request = checkout(vec![CartLine::product(1, 2)], PaymentMethod::BankTransfer);
    request.shipping_tier = Some(ShippingTier::Express);

    let placed = fx.engine.create_order(request).await.unwrap();

    // 2 x 1500g stays a light parcel.
    assert_eq!(placed.order.shipping_cost, Money::from(30000));
    assert_eq!(placed.order.total_amount, Money::from(130000));
    assert_eq!(placed.payment.amount, Money::from(130000));
}

#[tokio::test]
async fn test_insufficient_stock_leaves_stock_unchanged() {
    let fx = fixture().await;
    fx.storage.adjust_stock(1, -4).await.unwrap();

    let result = fx
        .engine
        .create_order(checkout(vec![CartLine::product(1, 2)], PaymentMethod::BankTransfer))
        .await;

    match result {
        Err(EngineError::InsufficientStock {
            item_id,
            requested,
            available,
            ..
        }) => {
            assert_eq!(item_id, 1);
            assert_eq!(requested, 2);
            assert_eq!(available, 1);
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }
    assert_eq!(stock_of(&fx, 1).await, 1);
    assert!(fx.engine.orders_for_customer(CUSTOMER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_item_is_not_found() {
    let fx = fixture().await;

    let result = fx
        .engine
        .create_order(checkout(vec![CartLine::product(404, 1)], PaymentMethod::BankTransfer))
        .await;

    assert!(matches!(
        result,
        Err(EngineError::CatalogItemNotFound { item_type: ItemType::Product, item_id: 404 })
    ));
}

#[tokio::test]
async fn test_zero_total_order_is_rejected() {
    let fx = fixture().await;
    fx.storage
        .upsert_service(&CatalogItem::service(8, "Free survey", Money::ZERO))
        .await
        .unwrap();

    let result = fx
        .engine
        .create_order(checkout(vec![CartLine::service(8, 1)], PaymentMethod::BankTransfer))
        .await;

    assert!(matches!(result, Err(EngineError::Validation(_))));
    assert!(fx.engine.orders_for_customer(CUSTOMER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_order_total_overflow_is_rejected() {
    let fx = fixture().await;
    fx.storage
        .upsert_service(&CatalogItem::service(9, "Plant build", Money::from(10_000_000_000)))
        .await
        .unwrap();

    let result = fx
        .engine
        .create_order(checkout(vec![CartLine::service(9, i64::MAX)], PaymentMethod::BankTransfer))
        .await;

    assert!(matches!(result, Err(EngineError::Validation(_))));
    assert!(fx.engine.orders_for_customer(CUSTOMER).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_checkout_for_last_unit() {
    let fx = fixture().await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let engine = Arc::clone(&fx.engine);
        handles.push(tokio::spawn(async move {
            engine
                .create_order(checkout(vec![CartLine::product(2, 1)], PaymentMethod::BankTransfer))
                .await
        }));
    }

    let mut succeeded = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(EngineError::InsufficientStock { item_id: 2, .. }) => out_of_stock += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(out_of_stock, 1);
    assert_eq!(stock_of(&fx, 2).await, 0);
}

#[tokio::test]
async fn test_order_numbers_are_unique() {
    let fx = fixture().await;

    let mut numbers = Vec::new();
    for _ in 0..3 {
        let placed = fx
            .engine
            .create_order(checkout(vec![CartLine::service(7, 1)], PaymentMethod::BankTransfer))
            .await
            .unwrap();
        numbers.push(placed.order.order_number);
    }

    assert!(numbers[0].ends_with("-0001"));
    assert!(numbers[1].ends_with("-0002"));
    assert!(numbers[2].ends_with("-0003"));
}

// ==================== Order state machine ====================

#[tokio::test]
async fn test_cancel_restores_stock_once() {
    let fx = fixture().await;
    let placed = fx
        .engine
        .create_order(checkout(
            vec![CartLine::product(1, 2), CartLine::product(2, 1), CartLine::service(7, 1)],
            PaymentMethod::BankTransfer,
        ))
        .await
        .unwrap();
    assert_eq!(stock_of(&fx, 1).await, 3);
    assert_eq!(stock_of(&fx, 2).await, 0);

    let customer = Actor::customer(CUSTOMER);
    let cancelled = fx.engine.cancel_order(placed.order.id, &customer).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&fx, 1).await, 5);
    assert_eq!(stock_of(&fx, 2).await, 1);

    let again = fx.engine.cancel_order(placed.order.id, &customer).await.unwrap();
    assert_eq!(again.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&fx, 1).await, 5);
    assert_eq!(stock_of(&fx, 2).await, 1);

    let payments = fx.engine.order_payments(placed.order.id).await.unwrap();
    assert_eq!(payments[0].status, PaymentStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_via_transition_from_processing() {
    let fx = fixture().await;
    let placed = fx
        .engine
        .create_order(checkout(vec![CartLine::product(1, 1)], PaymentMethod::BankTransfer))
        .await
        .unwrap();
    let admin = Actor::admin(1);

    fx.engine
        .transition_order_status(placed.order.id, OrderStatus::Processing, &admin)
        .await
        .unwrap();
    let order = fx
        .engine
        .transition_order_status(placed.order.id, OrderStatus::Cancelled, &admin)
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&fx, 1).await, 5);
}

#[tokio::test]
async fn test_full_lifecycle_and_history() {
    let fx = fixture().await;
    let placed = paid_order(&fx).await;
    let admin = Actor::admin(1);

    for status in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] {
        let order = fx
            .engine
            .transition_order_status(placed.order.id, status, &admin)
            .await
            .unwrap();
        assert_eq!(order.status, status);
    }

    let history = fx.engine.order_history(placed.order.id).await.unwrap();
    let observed: Vec<OrderStatus> = history.iter().map(|h| h.to_status).collect();
    assert_eq!(
        observed,
        vec![
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered
        ]
    );
    assert_eq!(history[1].from_status, Some(OrderStatus::Pending));
    assert_eq!(history[3].actor_role, Role::Admin);

    let result = fx
        .engine
        .transition_order_status(placed.order.id, OrderStatus::Processing, &admin)
        .await;
    assert!(matches!(
        result,
        Err(EngineError::InvalidStatusTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Processing
        })
    ));
}

#[tokio::test]
async fn test_skipping_and_late_cancel_are_rejected() {
    let fx = fixture().await;
    let placed = paid_order(&fx).await;
    let admin = Actor::admin(1);

    let skip = fx
        .engine
        .transition_order_status(placed.order.id, OrderStatus::Shipped, &admin)
        .await;
    assert!(matches!(skip, Err(EngineError::InvalidStatusTransition { .. })));

    fx.engine
        .transition_order_status(placed.order.id, OrderStatus::Processing, &admin)
        .await
        .unwrap();
    fx.engine
        .transition_order_status(placed.order.id, OrderStatus::Shipped, &admin)
        .await
        .unwrap();

    let cancel = fx.engine.cancel_order(placed.order.id, &admin).await;
    assert!(matches!(
        cancel,
        Err(EngineError::InvalidStatusTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled
        })
    ));
    assert_eq!(stock_of(&fx, 1).await, 3);
}

#[tokio::test]
async fn test_ship_requires_confirmed_payment() {
    let fx = fixture().await;
    let placed = fx
        .engine
        .create_order(checkout(vec![CartLine::product(1, 1)], PaymentMethod::BankTransfer))
        .await
        .unwrap();
    let admin = Actor::admin(1);

    fx.engine
        .transition_order_status(placed.order.id, OrderStatus::Processing, &admin)
        .await
        .unwrap();

    let result = fx
        .engine
        .transition_order_status(placed.order.id, OrderStatus::Shipped, &admin)
        .await;
    match result {
        Err(EngineError::PaymentNotConfirmed { outstanding, .. }) => {
            assert_eq!(outstanding, Money::from(50000));
        }
        other => panic!("expected PaymentNotConfirmed, got {:?}", other),
    }
    assert_eq!(
        fx.engine.get_order(placed.order.id).await.unwrap().status,
        OrderStatus::Processing
    );
}

#[tokio::test]
async fn test_ship_unpaid_allowed_when_policy_disabled() {
    let policy = PolicyConfig {
        require_paid_before_ship: false,
        ..PolicyConfig::default()
    };
    let fx = fixture_with_policy(policy).await;
    let placed = fx
        .engine
        .create_order(checkout(vec![CartLine::product(1, 1)], PaymentMethod::BankTransfer))
        .await
        .unwrap();
    let admin = Actor::admin(1);

    fx.engine
        .transition_order_status(placed.order.id, OrderStatus::Processing, &admin)
        .await
        .unwrap();
    let order = fx
        .engine
        .transition_order_status(placed.order.id, OrderStatus::Shipped, &admin)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Shipped);
}

#[tokio::test]
async fn test_cod_settles_on_delivery() {
    let fx = fixture().await;
    let placed = fx
        .engine
        .create_order(checkout(vec![CartLine::product(1, 1)], PaymentMethod::Cod))
        .await
        .unwrap();
    let admin = Actor::admin(1);

    for status in [OrderStatus::Processing, OrderStatus::Shipped] {
        fx.engine
            .transition_order_status(placed.order.id, status, &admin)
            .await
            .unwrap();
    }
    let before = fx.engine.get_reconciliation(placed.order.id).await.unwrap();
    assert_eq!(before.outstanding_balance, Money::from(50000));

    fx.engine
        .transition_order_status(placed.order.id, OrderStatus::Delivered, &admin)
        .await
        .unwrap();

    let payment = fx.engine.get_payment(placed.payment.id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert_eq!(payment.verified_by, Some(1));
    assert!(payment.verified_at.is_some());

    let after = fx.engine.get_reconciliation(placed.order.id).await.unwrap();
    assert_eq!(after.outstanding_balance, Money::ZERO);
    assert!(after.invoice_allowed);
}

#[tokio::test]
async fn test_cod_does_not_accept_proof() {
    let fx = fixture().await;
    let placed = fx
        .engine
        .create_order(checkout(vec![CartLine::service(7, 1)], PaymentMethod::Cod))
        .await
        .unwrap();

    let rec = fx.engine.get_reconciliation(placed.order.id).await.unwrap();
    assert!(!rec.proof_upload_allowed);

    let customer = Actor::customer(CUSTOMER);
    let result = fx
        .engine
        .submit_payment_proof(placed.order.id, proof("receipts/cod.jpg"), &customer)
        .await;
    assert!(matches!(result, Err(EngineError::Validation(_))));
    let payment = fx.engine.get_payment(placed.payment.id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.payment_proof_ref, None);
}

// ==================== Payment state machine ====================

#[tokio::test]
async fn test_proof_then_verify_clears_balance() {
    let fx = fixture().await;
    let placed = fx
        .engine
        .create_order(checkout(vec![CartLine::product(1, 2)], PaymentMethod::BankTransfer))
        .await
        .unwrap();

    let submitted = fx
        .engine
        .submit_payment_proof(placed.order.id, proof("receipts/1.jpg"), &Actor::customer(CUSTOMER))
        .await
        .unwrap();
    assert_eq!(submitted.status, PaymentStatus::PendingVerification);
    assert_eq!(submitted.payment_proof_ref, Some(proof("receipts/1.jpg")));

    let verified = fx
        .engine
        .verify_payment(placed.payment.id, VerificationDecision::Paid, &Actor::finance(9), None)
        .await
        .unwrap();
    assert_eq!(verified.status, PaymentStatus::Paid);
    assert!(verified.verified_at.is_some());
    assert_eq!(verified.verified_by, Some(9));

    let rec = fx.engine.get_reconciliation(placed.order.id).await.unwrap();
    assert_eq!(rec.total_paid, Money::from(100000));
    assert_eq!(rec.outstanding_balance, Money::ZERO);
    assert!(!rec.proof_upload_allowed);
    assert!(rec.invoice_allowed);

    let again = fx
        .engine
        .submit_payment_proof(placed.order.id, proof("receipts/2.jpg"), &Actor::customer(CUSTOMER))
        .await;
    assert!(matches!(again, Err(EngineError::Validation(_))));
}

#[tokio::test]
async fn test_rejected_proof_can_be_resubmitted() {
    let fx = fixture().await;
    let placed = fx
        .engine
        .create_order(checkout(vec![CartLine::service(7, 1)], PaymentMethod::EWallet))
        .await
        .unwrap();
    let customer = Actor::customer(CUSTOMER);
    let finance = Actor::finance(9);

    fx.engine
        .submit_payment_proof(placed.order.id, proof("receipts/blurry.jpg"), &customer)
        .await
        .unwrap();
    let rejected = fx
        .engine
        .verify_payment(
            placed.payment.id,
            VerificationDecision::Failed,
            &finance,
            Some("amount does not match".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, PaymentStatus::Failed);
    assert_eq!(rejected.payment_proof_ref, Some(proof("receipts/blurry.jpg")));
    assert_eq!(rejected.notes.as_deref(), Some("amount does not match"));
    assert_eq!(rejected.verified_at, None);

    let resubmitted = fx
        .engine
        .submit_payment_proof(placed.order.id, proof("receipts/clear.jpg"), &customer)
        .await
        .unwrap();
    assert_eq!(resubmitted.id, placed.payment.id);
    assert_eq!(resubmitted.status, PaymentStatus::PendingVerification);
    assert_eq!(resubmitted.payment_proof_ref, Some(proof("receipts/clear.jpg")));
    assert_eq!(resubmitted.notes, None);

    let paid = fx
        .engine
        .verify_payment(placed.payment.id, VerificationDecision::Paid, &finance, None)
        .await
        .unwrap();
    assert_eq!(paid.notes, None);
    assert!(fx.engine.get_reconciliation(placed.order.id).await.unwrap().is_fully_paid());
}

#[tokio::test]
async fn test_verify_without_proof_is_illegal() {
    let fx = fixture().await;
    let placed = fx
        .engine
        .create_order(checkout(vec![CartLine::service(7, 1)], PaymentMethod::BankTransfer))
        .await
        .unwrap();

    let result = fx
        .engine
        .verify_payment(placed.payment.id, VerificationDecision::Paid, &Actor::finance(9), None)
        .await;
    assert!(matches!(
        result,
        Err(EngineError::InvalidPaymentTransition {
            from: PaymentStatus::Pending,
            to: PaymentStatus::Paid
        })
    ));
}

#[tokio::test]
async fn test_refund_after_delivery() {
    let fx = fixture().await;
    let placed = paid_order(&fx).await;
    let admin = Actor::admin(1);
    for status in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] {
        fx.engine
            .transition_order_status(placed.order.id, status, &admin)
            .await
            .unwrap();
    }

    let refunded = fx
        .engine
        .refund_payment(placed.payment.id, &Actor::finance(9), Some("returned goods".to_string()))
        .await
        .unwrap();
    assert_eq!(refunded.status, PaymentStatus::Refunded);

    let rec = fx.engine.get_reconciliation(placed.order.id).await.unwrap();
    assert_eq!(rec.total_paid, Money::ZERO);
    assert_eq!(rec.outstanding_balance, Money::from(100000));
    // Delivered orders stay invoiceable under the default rule.
    assert!(rec.invoice_allowed);

    let twice = fx
        .engine
        .refund_payment(placed.payment.id, &Actor::finance(9), None)
        .await;
    assert!(matches!(twice, Err(EngineError::InvalidPaymentTransition { .. })));
}

#[tokio::test]
async fn test_new_attempt_after_cancelled_payment() {
    let fx = fixture().await;
    let placed = fx
        .engine
        .create_order(checkout(vec![CartLine::service(7, 1)], PaymentMethod::BankTransfer))
        .await
        .unwrap();
    let customer = Actor::customer(CUSTOMER);

    let blocked = fx.engine.open_payment_attempt(placed.order.id, &customer).await;
    assert!(matches!(blocked, Err(EngineError::Validation(_))));

    let cancelled = fx
        .engine
        .cancel_payment(placed.payment.id, &Actor::finance(9))
        .await
        .unwrap();
    assert_eq!(cancelled.status, PaymentStatus::Cancelled);

    let attempt = fx
        .engine
        .open_payment_attempt(placed.order.id, &customer)
        .await
        .unwrap();
    assert_ne!(attempt.id, placed.payment.id);
    assert_eq!(attempt.status, PaymentStatus::Pending);
    assert_eq!(attempt.amount, Money::from(150000));

    let submitted = fx
        .engine
        .submit_payment_proof(placed.order.id, proof("receipts/retry.jpg"), &customer)
        .await
        .unwrap();
    assert_eq!(submitted.id, attempt.id);
}

// ==================== Role gating ====================

#[tokio::test]
async fn test_role_gating() {
    let fx = fixture().await;
    let placed = fx
        .engine
        .create_order(checkout(vec![CartLine::product(1, 1)], PaymentMethod::BankTransfer))
        .await
        .unwrap();
    let customer = Actor::customer(CUSTOMER);
    let stranger = Actor::customer(CUSTOMER + 1);
    let owner = Actor::new(3, Role::Owner);

    let forward = fx
        .engine
        .transition_order_status(placed.order.id, OrderStatus::Processing, &customer)
        .await;
    assert!(matches!(forward, Err(EngineError::Forbidden { role: Role::Customer, .. })));

    let foreign_cancel = fx.engine.cancel_order(placed.order.id, &stranger).await;
    assert!(matches!(foreign_cancel, Err(EngineError::Forbidden { .. })));

    let foreign_proof = fx
        .engine
        .submit_payment_proof(placed.order.id, proof("receipts/x.jpg"), &stranger)
        .await;
    assert!(matches!(foreign_proof, Err(EngineError::Forbidden { .. })));

    fx.engine
        .submit_payment_proof(placed.order.id, proof("receipts/1.jpg"), &customer)
        .await
        .unwrap();

    let self_verify = fx
        .engine
        .verify_payment(placed.payment.id, VerificationDecision::Paid, &customer, None)
        .await;
    assert!(matches!(self_verify, Err(EngineError::Forbidden { .. })));

    let owner_verify = fx
        .engine
        .verify_payment(placed.payment.id, VerificationDecision::Paid, &owner, None)
        .await;
    assert!(matches!(owner_verify, Err(EngineError::Forbidden { role: Role::Owner, .. })));

    let admin_verify = fx
        .engine
        .verify_payment(placed.payment.id, VerificationDecision::Paid, &Actor::admin(1), None)
        .await
        .unwrap();
    assert_eq!(admin_verify.verified_by, Some(1));
}

#[tokio::test]
async fn test_missing_records_are_reported() {
    let fx = fixture().await;

    assert!(matches!(
        fx.engine.get_order(999).await,
        Err(EngineError::OrderNotFound(999))
    ));
    assert!(matches!(
        fx.engine.order_history(999).await,
        Err(EngineError::OrderNotFound(999))
    ));
    assert!(matches!(
        fx.engine
            .verify_payment(999, VerificationDecision::Paid, &Actor::finance(9), None)
            .await,
        Err(EngineError::PaymentNotFound(999))
    ));
}
