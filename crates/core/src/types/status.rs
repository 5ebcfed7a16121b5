//! Status enums for orders, payment gateways, and refund sessions.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order financial status.
///
/// Maps to Shopify's `displayFinancialStatus` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinancialStatus {
    #[default]
    Pending,
    Authorized,
    PartiallyPaid,
    Paid,
    PartiallyRefunded,
    Refunded,
    Voided,
}

impl FinancialStatus {
    /// Whether money can still be returned for an order in this status.
    #[must_use]
    pub const fn is_refundable(&self) -> bool {
        matches!(self, Self::Paid | Self::PartiallyPaid | Self::PartiallyRefunded)
    }
}

/// Payment processor that captured the order's payment.
///
/// Shopify reports gateways as free-form strings; the ones the refund
/// backend treats specially get their own variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentGateway {
    /// No online processor (cash, bank transfer, or unknown).
    #[default]
    Manual,
    PayPal,
    Stripe,
    /// Any other gateway name, passed through verbatim.
    Other(String),
}

impl PaymentGateway {
    /// Gateway name as sent to the refund backend.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Manual => "manual",
            Self::PayPal => "paypal",
            Self::Stripe => "stripe",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for PaymentGateway {
    fn from(name: String) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "manual" => Self::Manual,
            "paypal" | "paypal_express" | "paypal express checkout" => Self::PayPal,
            "stripe" => Self::Stripe,
            _ => Self::Other(name),
        }
    }
}

impl From<PaymentGateway> for String {
    fn from(gateway: PaymentGateway) -> Self {
        gateway.as_str().to_owned()
    }
}

impl FromStr for PaymentGateway {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl fmt::Display for PaymentGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of a single order's refund session.
///
/// ```text
/// Browsing -> Selecting -> Calculated -> Committing -> Committed
///                ^             |              |
///                +-- mutate ---+              +------> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefundPhase {
    /// Order opened, nothing selected yet.
    #[default]
    Browsing,
    /// Line items or shipping chosen; no valid gateway quote.
    Selecting,
    /// A gateway quote matches the current selection.
    Calculated,
    /// Commit request sent, awaiting the gateway.
    Committing,
    /// Refund executed; the session is finished.
    Committed,
    /// The last gateway call failed; the selection is kept for a retry.
    Failed,
}

impl RefundPhase {
    /// Whether the session accepts no further changes.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

impl fmt::Display for RefundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Browsing => write!(f, "browsing"),
            Self::Selecting => write!(f, "selecting"),
            Self::Calculated => write!(f, "calculated"),
            Self::Committing => write!(f, "committing"),
            Self::Committed => write!(f, "committed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
