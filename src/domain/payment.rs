//! Payment records and their verification lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Money, PaymentMethod};

/// PaymentStatus is the verification state of one payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Waiting for the customer to pay.
    Pending,
    /// Proof of payment uploaded, waiting for finance review.
    PendingVerification,
    /// Confirmed by staff (or settled on delivery for COD).
    Paid,
    /// Proof rejected by staff. The customer may resubmit.
    Failed,
    /// Abandoned attempt. Terminal.
    Cancelled,
    /// Money returned to the customer. Terminal.
    Refunded,
}

impl PaymentStatus {
    /// Single source of truth for legal payment transitions.
    ///
    /// COD payments never go through proof review: they move PENDING -> PAID
    /// when the order is delivered. Every other method must pass through
    /// PENDING_VERIFICATION.
    pub fn can_transition_to(self, next: PaymentStatus, method: PaymentMethod) -> bool {
        use PaymentStatus::*;
        match (self, next) {
            (Pending, PendingVerification) | (Failed, PendingVerification) => {
                method.requires_proof()
            }
            (Pending, Paid) => !method.requires_proof(),
            (PendingVerification, Paid) | (PendingVerification, Failed) => true,
            (Paid, Refunded) => true,
            (Pending, Cancelled) | (Failed, Cancelled) => true,
            _ => false,
        }
    }

    /// Active payments are the ones still expecting an action.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            PaymentStatus::Pending | PaymentStatus::PendingVerification | PaymentStatus::Failed
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::PendingVerification => write!(f, "pending_verification"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Cancelled => write!(f, "cancelled"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "pending_verification" => Ok(PaymentStatus::PendingVerification),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(format!("Unknown payment status: {}", s)),
        }
    }
}

/// VerificationDecision is the finance verdict on an uploaded proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationDecision {
    Paid,
    Failed,
}

impl VerificationDecision {
    pub fn target_status(self) -> PaymentStatus {
        match self {
            VerificationDecision::Paid => PaymentStatus::Paid,
            VerificationDecision::Failed => PaymentStatus::Failed,
        }
    }
}

/// ProofRef is an opaque reference into the blob store (e.g. an upload key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProofRef(String);

impl ProofRef {
    /// Creates a proof reference. Blank references are rejected.
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err("proof of payment reference must not be empty".to_string());
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Payment is one attempt to settle (part of) an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    /// Fixed at creation. A new attempt gets a new record.
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub payment_proof_ref: Option<ProofRef>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<i64>,
}

/// Picks the active payment of an order: the most recent one still open.
pub fn active_payment(payments: &[Payment]) -> Option<&Payment> {
    payments
        .iter()
        .filter(|p| p.status.is_active())
        .max_by_key(|p| (p.created_at, p.id))
}
