//! Prior refunds for an order, as reported by the refund gateway.
//!
//! Used to derive how much of each line item and of shipping is still
//! refundable after a commit.

use chrono::{DateTime, Utc};
use refund_desk_core::{LineItemId, Money};
use serde::{Deserialize, Serialize};

use crate::gateway::types::string_or_number;
use crate::order::{Order, ShippingLine};

/// One line item inside a past refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundedLineItem {
    /// Numeric line item ID, when the gateway reports it.
    #[serde(default, deserialize_with = "string_or_number::option")]
    pub line_item_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub total_tax: Money,
}

/// Shipping refunded in a past refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundedShipping {
    #[serde(default)]
    pub title: String,
    pub total: Money,
    #[serde(default)]
    pub tax: Money,
}

/// A past refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    #[serde(default, deserialize_with = "string_or_number::option")]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub refund_line_items: Vec<RefundedLineItem>,
    #[serde(default)]
    pub refund_shipping: Vec<RefundedShipping>,
}

/// All refunds issued so far for one order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RefundHistory {
    pub refunds: Vec<RefundRecord>,
}

impl RefundHistory {
    #[must_use]
    pub const fn new(refunds: Vec<RefundRecord>) -> Self {
        Self { refunds }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refunds.is_empty()
    }

    /// Units of a line item refunded across all records.
    #[must_use]
    pub fn refunded_quantity(&self, id: &LineItemId) -> i64 {
        let numeric = id.numeric_id();
        self.refunds
            .iter()
            .flat_map(|refund| &refund.refund_line_items)
            .filter(|item| item.line_item_id.as_deref() == Some(numeric))
            .fold(0_i64, |total, item| total.saturating_add(item.quantity))
    }

    /// Shipping amount refunded across all records, excluding tax.
    #[must_use]
    pub fn shipping_refunded(&self) -> Money {
        self.refunds
            .iter()
            .flat_map(|refund| &refund.refund_shipping)
            .map(|shipping| shipping.total)
            .sum()
    }

    /// Shipping tax refunded across all records.
    #[must_use]
    pub fn shipping_tax_refunded(&self) -> Money {
        self.refunds
            .iter()
            .flat_map(|refund| &refund.refund_shipping)
            .map(|shipping| shipping.tax)
            .sum()
    }

    /// Shipping still refundable out of `original_amount`; never negative.
    #[must_use]
    pub fn max_refundable_shipping(&self, original_amount: Money) -> Money {
        (original_amount - self.shipping_refunded()).clamp_non_negative()
    }

    /// Rebuild remaining quantities on a snapshot whose line items carry
    /// their originally ordered quantity.
    ///
    /// Quantities never drop below zero.
    #[must_use]
    pub fn apply_to_original(&self, mut order: Order) -> Order {
        for item in &mut order.line_items {
            let original = item.original_quantity().max(0);
            let refunded = self.refunded_quantity(&item.id).clamp(0, original);
            item.previously_refunded_quantity = refunded;
            item.quantity = original - refunded;
        }
        if let Some(shipping) = order.shipping.take() {
            order.shipping = Some(ShippingLine::from_history(
                shipping.title,
                shipping.original_amount,
                shipping.tax_lines,
                self,
            ));
        }
        order
    }
}

impl ShippingLine {
    /// Shipping line whose `max_refundable` accounts for prior refunds.
    #[must_use]
    pub fn from_history(
        title: Option<String>,
        original_amount: Money,
        tax_lines: Vec<crate::order::TaxLine>,
        history: &RefundHistory,
    ) -> Self {
        Self {
            title,
            original_amount,
            tax_lines,
            max_refundable: history.max_refundable_shipping(original_amount),
        }
    }
}
