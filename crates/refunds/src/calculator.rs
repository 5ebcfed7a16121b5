//! Refund amount computation.
//!
//! The local quote is a client-side estimate shown before submission; the
//! gateway's calculate response is authoritative for the amount actually
//! moved.
//!
//! # Tax proration
//!
//! Tax lines carry the tax for a line item's *original* quantity, so the
//! per-unit tax is `Σ taxLine.price / (quantity + previouslyRefundedQuantity)`.
//! Shipping tax is scaled by the fraction of shipping refunded:
//! `Σ shippingTax × (amount / originalAmount)`.

use refund_desk_core::{Money, TransactionId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ShopSettings;
use crate::error::{RefundError, SelectionError};
use crate::order::Order;
use crate::request::{RefundLineItem, RefundMode, RefundRequest, RefundTransaction};
use crate::selection::RefundSelection;

/// Breakdown of a refund at full precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundQuote {
    pub product_subtotal: Money,
    pub product_tax: Money,
    pub shipping_amount: Money,
    pub shipping_tax: Money,
    pub total_tax: Money,
    pub refund_total: Money,
}

impl RefundQuote {
    /// Every component rounded to cents for display.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            product_subtotal: self.product_subtotal.round_cents(),
            product_tax: self.product_tax.round_cents(),
            shipping_amount: self.shipping_amount.round_cents(),
            shipping_tax: self.shipping_tax.round_cents(),
            total_tax: self.total_tax.round_cents(),
            refund_total: self.refund_total.round_cents(),
        }
    }
}

/// The gateway's answer to a calculate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayQuote {
    /// Parent transaction the refund will be issued against.
    pub transaction_id: TransactionId,
    /// Amount the gateway will refund.
    pub amount: Money,
}

/// Check a selection against an order without computing anything.
///
/// # Errors
///
/// Returns `RefundError::DataIntegrity` if the order has no line items, a
/// line item carries a negative quantity, or shipping is requested on an
/// order without a shipping line, and
/// `RefundError::InvalidSelection` for unknown line items, out-of-range
/// quantities, or an out-of-range shipping amount.
pub fn validate(order: &Order, selection: &RefundSelection) -> Result<(), RefundError> {
    if order.line_items.is_empty() {
        return Err(RefundError::DataIntegrity(format!(
            "order {} has no line items",
            order.name
        )));
    }
    if let Some(item) = order.line_items.iter().find(|item| !item.has_valid_quantities()) {
        return Err(RefundError::DataIntegrity(format!(
            "line item {} on order {} has a negative quantity",
            item.id, order.name
        )));
    }

    for entry in selection.line_items() {
        let item = order
            .line_item(&entry.line_item_id)
            .ok_or_else(|| SelectionError::UnknownLineItem {
                line_item_id: entry.line_item_id.clone(),
            })?;

        if entry.quantity <= 0 {
            return Err(SelectionError::NonPositiveQuantity {
                line_item_id: entry.line_item_id.clone(),
                quantity: entry.quantity,
            }
            .into());
        }

        if entry.quantity > item.quantity {
            return Err(SelectionError::QuantityExceedsRemaining {
                line_item_id: entry.line_item_id.clone(),
                requested: entry.quantity,
                remaining: item.quantity,
            }
            .into());
        }
    }

    if selection.shipping_requested() {
        let shipping = order.shipping.as_ref().ok_or_else(|| {
            RefundError::DataIntegrity(format!(
                "shipping refund requested but order {} has no shipping line",
                order.name
            ))
        })?;

        let amount = selection.shipping_amount();
        if amount.is_negative() {
            return Err(SelectionError::NegativeShippingAmount { amount }.into());
        }
        if amount > shipping.max_refundable {
            return Err(SelectionError::ShippingExceedsRefundable {
                requested: amount,
                max_refundable: shipping.max_refundable,
            }
            .into());
        }
    }

    Ok(())
}

/// Compute the refund breakdown for a selection.
///
/// Pure and cheap; safe to call on every selection change.
///
/// # Errors
///
/// Returns the same errors as [`validate`].
pub fn quote(order: &Order, selection: &RefundSelection) -> Result<RefundQuote, RefundError> {
    validate(order, selection)?;

    let mut product_subtotal = Money::ZERO;
    let mut product_tax = Money::ZERO;
    for entry in selection.line_items() {
        product_subtotal += entry.subtotal();
        // validate() guarantees the line item exists
        if let Some(item) = order.line_item(&entry.line_item_id) {
            product_tax += item.unit_tax().times(entry.quantity);
        }
    }

    let shipping_amount = selection.requested_shipping();
    let shipping_tax = match (&order.shipping, selection.shipping_requested()) {
        (Some(shipping), true) => shipping.tax_for(shipping_amount),
        _ => Money::ZERO,
    };

    let total_tax = product_tax + shipping_tax;
    let quote = RefundQuote {
        product_subtotal,
        product_tax,
        shipping_amount,
        shipping_tax,
        total_tax,
        refund_total: product_subtotal + total_tax + shipping_amount,
    };

    debug!(
        order_id = %order.id,
        subtotal = %quote.product_subtotal,
        tax = %quote.total_tax,
        shipping = %quote.shipping_amount,
        total = %quote.refund_total,
        "Computed refund quote"
    );

    Ok(quote)
}

/// Quotes refunds and builds gateway requests with the shop's settings.
#[derive(Debug, Clone)]
pub struct RefundCalculator {
    settings: ShopSettings,
}

impl RefundCalculator {
    #[must_use]
    pub const fn new(settings: ShopSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub const fn settings(&self) -> &ShopSettings {
        &self.settings
    }

    /// See [`quote`].
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`validate`].
    pub fn quote(
        &self,
        order: &Order,
        selection: &RefundSelection,
    ) -> Result<RefundQuote, RefundError> {
        quote(order, selection)
    }

    /// Build the gateway payload for `mode`.
    ///
    /// Commit requests carry exactly one transaction built from
    /// `gateway_quote`; calculate requests carry none.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`validate`], plus
    /// `RefundError::MissingGatewayQuote` for a commit without a quote.
    pub fn build_request(
        &self,
        order: &Order,
        selection: &RefundSelection,
        mode: RefundMode,
        gateway_quote: Option<&GatewayQuote>,
    ) -> Result<RefundRequest, RefundError> {
        validate(order, selection)?;

        let transactions = match mode {
            RefundMode::Calculate => None,
            RefundMode::Commit => {
                let gateway_quote = gateway_quote.ok_or(RefundError::MissingGatewayQuote)?;
                Some(vec![RefundTransaction {
                    parent_transaction_id: gateway_quote.transaction_id.as_str().to_owned(),
                    amount: gateway_quote.amount,
                    gateway: order.gateway.clone(),
                }])
            }
        };

        let note = if selection.note().trim().is_empty() {
            self.settings.default_note.clone()
        } else {
            selection.note().to_owned()
        };

        Ok(RefundRequest {
            mode,
            order_id: order.id.clone(),
            line_items: selection
                .line_items()
                .iter()
                .map(|entry| RefundLineItem {
                    line_item_id: entry.line_item_id.numeric_id().to_owned(),
                    quantity: entry.quantity,
                })
                .collect(),
            shipping_amount: selection
                .shipping_requested()
                .then(|| selection.shipping_amount()),
            currency: self.settings.currency,
            notify: selection.notify_customer(),
            note,
            transactions,
        })
    }
}
