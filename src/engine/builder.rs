//! Turns an untrusted checkout request into a fully priced order draft.
//!
//! Prices, stock and weights are always re-read from the catalog. Stock
//! checked here is only a pre-check; the authoritative reservation happens
//! inside the storage transaction.

use crate::domain::{
    CartLine, CatalogItem, CheckoutRequest, DraftLine, ItemType, Money, OrderDraft, shipping_cost,
    total_weight,
};
use crate::storage::CatalogLookup;

use super::EngineError;

/// Validates the request shape before anything is looked up.
pub(crate) fn validate_request(request: &CheckoutRequest) -> Result<(), EngineError> {
    if request.items.is_empty() {
        return Err(EngineError::Validation("cart is empty".into()));
    }

    if let Some(line) = request.items.iter().find(|l| l.quantity <= 0) {
        return Err(EngineError::Validation(format!(
            "quantity for {} {} must be positive, got {}",
            line.item_type, line.item_id, line.quantity
        )));
    }

    if request.shipping_address.trim().is_empty() {
        return Err(EngineError::Validation("shipping address is required".into()));
    }

    if request.payment_method.is_none() {
        return Err(EngineError::Validation("payment method is required".into()));
    }

    Ok(())
}

/// Merges lines that reference the same item, keeping first-seen order.
pub(crate) fn merge_lines(lines: &[CartLine]) -> Result<Vec<CartLine>, EngineError> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());

    for line in lines {
        match merged
            .iter_mut()
            .find(|m| m.item_type == line.item_type && m.item_id == line.item_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(line.quantity).ok_or_else(|| {
                    EngineError::Validation(format!(
                        "quantity for {} {} is too large",
                        line.item_type, line.item_id
                    ))
                })?;
            }
            None => merged.push(*line),
        }
    }

    Ok(merged)
}

/// Resolves one cart line against the catalog and checks availability.
async fn resolve_line(
    catalog: &dyn CatalogLookup,
    line: &CartLine,
) -> Result<CatalogItem, EngineError> {
    let item = catalog
        .get_item(line.item_type, line.item_id)
        .await?
        .ok_or(EngineError::CatalogItemNotFound {
            item_type: line.item_type,
            item_id: line.item_id,
        })?;

    if !item.active {
        return Err(EngineError::Validation(format!(
            "{} {} ({}) is not available",
            line.item_type, line.item_id, item.name
        )));
    }

    if item.unit_price.is_negative() {
        return Err(EngineError::Validation(format!(
            "{} {} has a negative price",
            line.item_type, line.item_id
        )));
    }

    if line.item_type == ItemType::Product {
        let available = item.stock.unwrap_or(0);
        if line.quantity > available {
            return Err(EngineError::InsufficientStock {
                item_id: line.item_id,
                name: item.name,
                requested: line.quantity,
                available,
            });
        }
    }

    Ok(item)
}

/// Builds the order draft: merged lines, catalog prices, shipping and total.
pub(crate) async fn build_draft(
    catalog: &dyn CatalogLookup,
    request: &CheckoutRequest,
) -> Result<OrderDraft, EngineError> {
    validate_request(request)?;

    let payment_method = request
        .payment_method
        .ok_or_else(|| EngineError::Validation("payment method is required".into()))?;

    let merged = merge_lines(&request.items)?;

    let mut resolved = Vec::with_capacity(merged.len());
    for line in &merged {
        let item = resolve_line(catalog, line).await?;
        resolved.push((item, line.quantity));
    }

    let shipping = match request.shipping_tier {
        Some(tier) => {
            let weight = total_weight(resolved.iter().map(|(item, qty)| (item, *qty)));
            shipping_cost(weight, tier)
        }
        None => Money::ZERO,
    };

    let lines: Vec<DraftLine> = resolved
        .into_iter()
        .map(|(item, quantity)| DraftLine {
            item_type: item.item_type,
            item_id: item.id,
            name: item.name,
            quantity,
            price: item.unit_price,
        })
        .collect();

    let total_amount = lines
        .iter()
        .try_fold(shipping, |acc, line| line.line_total()?.checked_add(acc))
        .ok_or_else(|| EngineError::Validation("order total out of range".into()))?;

    if !total_amount.is_positive() {
        return Err(EngineError::Validation(
            "order total must be greater than zero".into(),
        ));
    }

    Ok(OrderDraft {
        customer_id: request.customer_id,
        lines,
        shipping_address: request.shipping_address.trim().to_string(),
        payment_method,
        shipping_tier: request.shipping_tier,
        shipping_cost: shipping,
        total_amount,
        notes: request
            .notes
            .as_ref()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
    })
}
