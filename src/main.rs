mod config;
mod domain;
mod engine;
mod storage;

use config::Config;
use domain::{
    Actor, CartLine, CatalogItem, CheckoutRequest, Money, OrderStatus, PaymentMethod, ProofRef,
    ShippingTier, VerificationDecision,
};
use engine::{Engine, EngineError};
use serde_json::json;
use std::env;
use std::sync::Arc;
use storage::{SqliteStorage, SqliteStorageConfig};
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

fn parse_config_path() -> String {
    for arg in env::args().skip(1) {
        if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
    }
    DEFAULT_CONFIG_PATH.to_string()
}

fn parse_reconcile_order() -> Option<Result<i64, String>> {
    env::args().skip(1).find_map(|arg| {
        arg.strip_prefix("--reconcile=").map(|id| {
            id.parse::<i64>()
                .map_err(|_| format!("invalid order id: {}", id))
        })
    })
}

fn init_tracing(log_level: Option<&str>) {
    let level = match log_level {
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("warn") | Some("warning") => Level::WARN,
        Some("error") => Level::ERROR,
        Some("trace") => Level::TRACE,
        _ => Level::INFO,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config_path = parse_config_path();
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return;
        }
    };

    init_tracing(config.app.log_level.as_deref());

    if let Some(order) = parse_reconcile_order() {
        match order {
            Ok(order_id) => reconcile(&config, order_id).await,
            Err(e) => eprintln!("{}", e),
        }
        return;
    }

    if env::args().any(|arg| arg == "--demo") {
        if let Err(e) = run_demo(&config).await {
            error!(error = %e, "Demo failed");
        }
        return;
    }

    match Engine::from_config(&config).await {
        Ok(_) => info!(config = %config_path, db = %config.storage.path, "Database ready"),
        Err(e) => error!(error = %e, "Failed to open engine"),
    }
}

/// Prints an order with its lines, payments, history and reconciliation as JSON.
async fn reconcile(config: &Config, order_id: i64) {
    let engine = match Engine::from_config(config).await {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "Failed to open engine");
            return;
        }
    };

    match order_report(&engine, order_id).await {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => error!(error = %e, "Failed to encode report"),
        },
        Err(e) => error!(order_id, error = %e, "Reconciliation failed"),
    }
}

async fn order_report(engine: &Engine, order_id: i64) -> Result<serde_json::Value, EngineError> {
    let order = engine.get_order(order_id).await?;
    let items = engine.order_items(order_id).await?;
    let payments = engine.order_payments(order_id).await?;
    let history = engine.order_history(order_id).await?;
    let reconciliation = engine.get_reconciliation(order_id).await?;

    Ok(json!({
        "order": order,
        "items": items,
        "payments": payments,
        "history": history,
        "reconciliation": reconciliation,
    }))
}

/// Walks one bank transfer order and one COD order through their lifecycles.
async fn run_demo(config: &Config) -> Result<(), EngineError> {
    let storage = Arc::new(SqliteStorage::new(SqliteStorageConfig::from(&config.storage)).await?);

    let bracket = CatalogItem::product(1, "Wall bracket", Money::from(50000), 20, Some(1500));
    let panel = CatalogItem::product(2, "Solar panel", Money::from(1200000), 4, Some(18000));
    storage.upsert_product(&bracket).await?;
    storage.upsert_product(&panel).await?;
    storage
        .upsert_service(&CatalogItem::service(10, "Installation", Money::from(350000)))
        .await?;

    let engine = Engine::with_storage(storage.clone(), config.policy.clone());
    let admin = Actor::admin(1);
    let finance = Actor::finance(2);
    let customer = Actor::customer(100);

    let placed = engine
        .create_order(CheckoutRequest {
            customer_id: customer.id,
            items: vec![CartLine::product(1, 2), CartLine::service(10, 1)],
            shipping_address: "Jl. Sudirman 5, Jakarta".to_string(),
            payment_method: Some(PaymentMethod::BankTransfer),
            shipping_tier: Some(ShippingTier::Regular),
            notes: None,
        })
        .await?;

    let proof = ProofRef::new("receipts/demo-transfer.jpg").map_err(EngineError::Validation)?;
    engine
        .submit_payment_proof(placed.order.id, proof, &customer)
        .await?;
    engine
        .verify_payment(placed.payment.id, VerificationDecision::Paid, &finance, None)
        .await?;
    for status in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] {
        engine
            .transition_order_status(placed.order.id, status, &admin)
            .await?;
    }

    let cod = engine
        .create_order(CheckoutRequest {
            customer_id: customer.id,
            items: vec![CartLine::product(2, 1)],
            shipping_address: "Jl. Sudirman 5, Jakarta".to_string(),
            payment_method: Some(PaymentMethod::Cod),
            shipping_tier: Some(ShippingTier::Express),
            notes: Some("call before delivery".to_string()),
        })
        .await?;
    for status in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] {
        engine
            .transition_order_status(cod.order.id, status, &admin)
            .await?;
    }

    let orders = engine.orders_for_customer(customer.id).await?;
    info!(customer_id = customer.id, orders = orders.len(), "Demo finished");

    for order_id in [placed.order.id, cod.order.id] {
        let rec = engine.get_reconciliation(order_id).await?;
        info!(
            order_number = %rec.order_number,
            total = %rec.total_amount,
            paid = %rec.total_paid,
            outstanding = %rec.outstanding_balance,
            invoice_allowed = rec.invoice_allowed,
            "Demo order settled"
        );
    }

    storage.close().await;
    Ok(())
}
