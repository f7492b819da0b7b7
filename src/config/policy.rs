//! Business policy switches for the order engine.

use serde::Deserialize;

use crate::domain::InvoiceRule;

/// Policy settings. Every field has a default, the whole section is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Refuse SHIPPED until PAID payments cover the order total. COD is exempt.
    #[serde(default = "default_true")]
    pub require_paid_before_ship: bool,
    /// When invoices may be generated.
    #[serde(default)]
    pub invoice_rule: InvoiceRule,
    /// Leading part of generated order numbers.
    #[serde(default = "default_order_prefix")]
    pub order_number_prefix: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            require_paid_before_ship: true,
            invoice_rule: InvoiceRule::default(),
            order_number_prefix: default_order_prefix(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_order_prefix() -> String {
    "ORD".to_string()
}
