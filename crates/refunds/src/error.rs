//! Unified error handling for refund operations.

use refund_desk_core::{LineItemId, Money, RefundPhase};
use thiserror::Error;

use crate::gateway::GatewayError;

/// Application-level error type for refund sessions.
#[derive(Debug, Error)]
pub enum RefundError {
    /// The selection cannot be refunded against this order.
    #[error("Invalid selection: {0}")]
    InvalidSelection(#[from] SelectionError),

    /// Commit attempted without a fresh gateway quote.
    #[error("Refund must be calculated before it can be committed")]
    MissingGatewayQuote,

    /// Refund gateway call failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Order snapshot is missing data the refund needs.
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// Operation is not allowed in the session's current phase.
    #[error("Cannot {action} while refund is {state}")]
    InvalidState {
        /// Phase the session was in.
        state: RefundPhase,
        /// What the caller attempted.
        action: &'static str,
    },
}

/// Reasons a refund selection is rejected.
///
/// These are raised synchronously, before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Nothing selected: no line items and no shipping.
    #[error("nothing selected to refund")]
    Empty,

    /// Selected line item is not part of the order.
    #[error("line item {line_item_id} is not part of this order")]
    UnknownLineItem {
        /// The unknown ID.
        line_item_id: LineItemId,
    },

    /// Quantity must be at least one.
    #[error("quantity for line item {line_item_id} must be positive (got {quantity})")]
    NonPositiveQuantity {
        /// Offending line item.
        line_item_id: LineItemId,
        /// Requested quantity.
        quantity: i64,
    },

    /// Quantity exceeds what is still refundable.
    #[error("quantity {requested} for line item {line_item_id} exceeds remaining {remaining}")]
    QuantityExceedsRemaining {
        /// Offending line item.
        line_item_id: LineItemId,
        /// Requested quantity.
        requested: i64,
        /// Quantity still refundable.
        remaining: i64,
    },

    /// Shipping refund amount is below zero.
    #[error("shipping refund amount {amount} cannot be negative")]
    NegativeShippingAmount {
        /// Requested amount.
        amount: Money,
    },

    /// Shipping refund amount is above what remains refundable.
    #[error("shipping refund {requested} exceeds refundable {max_refundable}")]
    ShippingExceedsRefundable {
        /// Requested amount.
        requested: Money,
        /// Shipping still refundable.
        max_refundable: Money,
    },
}
