//! Caller identity as handed over by the authentication layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of the caller in the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Staff that runs fulfillment.
    Admin,
    /// Buyer placing and paying orders.
    Customer,
    /// Staff that verifies and refunds payments.
    Finance,
    /// Business owner, read-only on the order pipeline.
    Owner,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Customer => write!(f, "customer"),
            Role::Finance => write!(f, "finance"),
            Role::Owner => write!(f, "owner"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "customer" => Ok(Role::Customer),
            "finance" => Ok(Role::Finance),
            "owner" => Ok(Role::Owner),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Actor is the opaque "who is calling" fact. The engine trusts it as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn admin(id: i64) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn customer(id: i64) -> Self {
        Self::new(id, Role::Customer)
    }

    pub fn finance(id: i64) -> Self {
        Self::new(id, Role::Finance)
    }

    /// Returns true if the actor is staff allowed to decide on payments.
    pub fn can_verify_payments(&self) -> bool {
        matches!(self.role, Role::Finance | Role::Admin)
    }

    /// Returns true if the actor is the given customer or an admin.
    pub fn acts_for_customer(&self, customer_id: i64) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Customer => self.id == customer_id,
            Role::Finance | Role::Owner => false,
        }
    }
}
