// models/checkout.rs
use serde::{Deserialize, Serialize};

use crate::config::ProviderEnvironment;

/// A checkout preference issued by the payment provider. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub preference_id: String,
    pub checkout_url: String,
    pub sandbox_url: Option<String>,
}

impl CheckoutSession {
    /// URL the embedded browser should open for the given environment.
    pub fn entry_url(&self, environment: ProviderEnvironment) -> &str {
        match (environment, self.sandbox_url.as_deref()) {
            (ProviderEnvironment::Sandbox, Some(sandbox)) if !sandbox.is_empty() => sandbox,
            _ => &self.checkout_url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Approved,
    Rejected,
    Pending,
    Cancelled,
    Unknown,
}

impl PaymentOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentOutcome::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOutcome::Approved => "approved",
            PaymentOutcome::Rejected => "rejected",
            PaymentOutcome::Pending => "pending",
            PaymentOutcome::Cancelled => "cancelled",
            PaymentOutcome::Unknown => "unknown",
        }
    }
}

/// How a reconciliation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub outcome: PaymentOutcome,
    /// Provider payment id read from the settling URL, when it carried one.
    pub payment_id: Option<String>,
    pub url: Option<String>,
}

impl Settlement {
    pub fn without_url(outcome: PaymentOutcome) -> Self {
        Settlement {
            outcome,
            payment_id: None,
            url: None,
        }
    }
}
