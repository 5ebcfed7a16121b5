//! Refund request payload sent to the refund gateway.
//!
//! # Wire format
//!
//! ```json
//! {
//!   "orderId": "5551234",
//!   "refund": {
//!     "refund_line_items": [{ "line_item_id": "13421", "quantity": 2 }],
//!     "shipping": { "amount": "10.00" },
//!     "currency": "AUD",
//!     "notify": true,
//!     "note": "Damaged in transit",
//!     "transactions": [{ "parent_id": "99", "amount": "55.00", "kind": "refund", "gateway": "manual" }]
//!   }
//! }
//! ```
//!
//! Amounts are rounded to cents only here, at serialization.

use refund_desk_core::{CurrencyCode, Money, OrderId, PaymentGateway};
use serde::{Serialize, Serializer};

/// Whether a request is a dry-run quote or an actual refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefundMode {
    /// Ask the gateway for its authoritative quote; no money moves.
    Calculate,
    /// Execute the refund against the quoted parent transaction.
    Commit,
}

impl RefundMode {
    /// Mode name used by the gateway (`calculate` / `refund`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Calculate => "calculate",
            Self::Commit => "refund",
        }
    }
}

/// A line item and quantity to refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundLineItem {
    /// Numeric line item ID (global ID prefix stripped).
    pub line_item_id: String,
    pub quantity: i64,
}

/// Money movement attached to a committed refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundTransaction {
    /// Transaction ID exactly as the gateway quoted it.
    pub parent_transaction_id: String,
    pub amount: Money,
    pub gateway: PaymentGateway,
}

/// Final payload for the refund gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub mode: RefundMode,
    pub order_id: OrderId,
    pub line_items: Vec<RefundLineItem>,
    pub shipping_amount: Option<Money>,
    pub currency: CurrencyCode,
    pub notify: bool,
    pub note: String,
    /// Present only in [`RefundMode::Commit`].
    pub transactions: Option<Vec<RefundTransaction>>,
}

impl RefundRequest {
    /// Total amount of the attached transactions, if any.
    #[must_use]
    pub fn transaction_amount(&self) -> Option<Money> {
        self.transactions
            .as_ref()
            .map(|transactions| transactions.iter().map(|t| t.amount).sum())
    }

    /// Append a processor reference (e.g. a PayPal refund ID) to the note.
    pub fn append_note_reference(&mut self, reference: &str) {
        if self.note.is_empty() {
            reference.clone_into(&mut self.note);
        } else {
            self.note = format!("{} | {reference}", self.note);
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope<'a> {
    order_id: &'a str,
    refund: WireRefund<'a>,
}

#[derive(Serialize)]
struct WireRefund<'a> {
    refund_line_items: Vec<WireLineItem<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shipping: Option<WireShipping>,
    currency: &'static str,
    notify: bool,
    note: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    transactions: Option<Vec<WireTransaction<'a>>>,
}

#[derive(Serialize)]
struct WireLineItem<'a> {
    line_item_id: &'a str,
    quantity: i64,
}

#[derive(Serialize)]
struct WireShipping {
    amount: String,
}

#[derive(Serialize)]
struct WireTransaction<'a> {
    parent_id: &'a str,
    amount: String,
    kind: &'static str,
    gateway: &'a str,
}

impl Serialize for RefundRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireEnvelope {
            order_id: self.order_id.numeric_id(),
            refund: WireRefund {
                refund_line_items: self
                    .line_items
                    .iter()
                    .map(|item| WireLineItem {
                        line_item_id: &item.line_item_id,
                        quantity: item.quantity,
                    })
                    .collect(),
                shipping: self.shipping_amount.map(|amount| WireShipping {
                    amount: amount.to_string(),
                }),
                currency: self.currency.code(),
                notify: self.notify,
                note: &self.note,
                transactions: self.transactions.as_ref().map(|transactions| {
                    transactions
                        .iter()
                        .map(|t| WireTransaction {
                            parent_id: &t.parent_transaction_id,
                            amount: t.amount.to_string(),
                            kind: "refund",
                            gateway: t.gateway.as_str(),
                        })
                        .collect()
                }),
            },
        }
        .serialize(serializer)
    }
}
