//! Read-only order snapshot consumed by the refund calculator.
//!
//! Snapshots are produced by whatever fetches orders from Shopify and are
//! deserialized from camelCase JSON. `LineItem::quantity` is the quantity
//! still refundable, not the originally ordered quantity.

use std::collections::BTreeMap;

use refund_desk_core::{
    CurrencyCode, FinancialStatus, LineItemId, LocationId, Money, OrderId, PaymentGateway,
    TransactionId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Metafield key holding the PayPal capture/transaction ID.
pub const PAYPAL_TRANSACTION_METAFIELD: &str = "paypal_transaction_id";

/// Metafield key holding the Stripe charge ID.
pub const STRIPE_CHARGE_METAFIELD: &str = "stripe_charge_id";

/// A tax charged on a line item or shipping line.
///
/// `price` is the tax over the parent's *original* full quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxLine {
    pub price: Money,
    #[serde(default)]
    pub rate: Decimal,
    #[serde(default)]
    pub title: String,
}

/// One product entry within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: LineItemId,
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// Current discounted unit price.
    pub unit_price: Money,
    /// Quantity still available to refund.
    pub quantity: i64,
    #[serde(default)]
    pub previously_refunded_quantity: i64,
    #[serde(default)]
    pub tax_lines: Vec<TaxLine>,
}

impl LineItem {
    /// Quantity originally ordered (remaining plus already refunded).
    #[must_use]
    pub const fn original_quantity(&self) -> i64 {
        self.quantity.saturating_add(self.previously_refunded_quantity)
    }

    /// Whether both quantities are non-negative.
    #[must_use]
    pub const fn has_valid_quantities(&self) -> bool {
        self.quantity >= 0 && self.previously_refunded_quantity >= 0
    }

    /// Total tax across all tax lines for the original quantity.
    #[must_use]
    pub fn total_tax(&self) -> Money {
        self.tax_lines.iter().map(|line| line.price).sum()
    }

    /// Tax attributable to a single unit.
    ///
    /// Zero when the item has no tax lines or no original quantity.
    #[must_use]
    pub fn unit_tax(&self) -> Money {
        if self.tax_lines.is_empty() {
            return Money::ZERO;
        }
        self.total_tax()
            .split(self.original_quantity())
            .unwrap_or(Money::ZERO)
    }
}

/// The shipping charge on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingLine {
    #[serde(default)]
    pub title: Option<String>,
    pub original_amount: Money,
    #[serde(default)]
    pub tax_lines: Vec<TaxLine>,
    /// Original amount minus shipping already refunded.
    pub max_refundable: Money,
}

impl ShippingLine {
    /// Sum of all shipping tax lines.
    #[must_use]
    pub fn total_tax(&self) -> Money {
        self.tax_lines.iter().map(|line| line.price).sum()
    }

    /// Shipping tax prorated to the fraction of shipping being refunded.
    ///
    /// Refunding the full original amount yields the full tax.
    #[must_use]
    pub fn tax_for(&self, amount: Money) -> Money {
        if !self.original_amount.is_positive() {
            return Money::ZERO;
        }
        amount
            .fraction_of(self.original_amount)
            .map_or(Money::ZERO, |fraction| self.total_tax().scale(fraction))
    }
}

/// Gateway-specific payment reference stored on the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentReference {
    PayPal { transaction_id: String },
    Stripe { charge_id: String },
}

/// Snapshot of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Display number, e.g. `#1042`.
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub financial_status: Option<FinancialStatus>,
    #[serde(default)]
    pub total_tax: Money,
    #[serde(default)]
    pub gateway: PaymentGateway,
    #[serde(default)]
    pub transaction_id: Option<TransactionId>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub shipping: Option<ShippingLine>,
    /// Custom-namespace metafields (key to value).
    #[serde(default)]
    pub metafields: BTreeMap<String, String>,
}

impl Order {
    /// Look up a line item by ID.
    #[must_use]
    pub fn line_item(&self, id: &LineItemId) -> Option<&LineItem> {
        self.line_items.iter().find(|item| &item.id == id)
    }

    /// PayPal or Stripe reference recorded in the order's metafields.
    ///
    /// PayPal takes precedence if both are present. Blank values are ignored.
    #[must_use]
    pub fn payment_reference(&self) -> Option<PaymentReference> {
        let non_blank = |key: &str| {
            self.metafields
                .get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        };

        if let Some(transaction_id) = non_blank(PAYPAL_TRANSACTION_METAFIELD) {
            return Some(PaymentReference::PayPal { transaction_id });
        }
        non_blank(STRIPE_CHARGE_METAFIELD).map(|charge_id| PaymentReference::Stripe { charge_id })
    }

    /// Apply resolved transaction metadata to the snapshot.
    #[must_use]
    pub fn with_transaction_meta(mut self, meta: TransactionMeta) -> Self {
        self.gateway = meta.gateway;
        self.transaction_id = meta.transaction_id;
        self.location_id = Some(meta.location_id);
        self
    }
}

/// First transaction of an order as reported by the Admin REST API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
}

/// Gateway, parent transaction, and location used when refunding an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionMeta {
    pub gateway: PaymentGateway,
    pub transaction_id: Option<TransactionId>,
    pub location_id: LocationId,
}

impl TransactionMeta {
    /// Resolve metadata from an optional transaction lookup.
    ///
    /// A failed or empty lookup does not abort anything: the gateway falls
    /// back to `manual` and the location to the shop default.
    #[must_use]
    pub fn resolve(record: Option<TransactionRecord>, default_location: &LocationId) -> Self {
        match record {
            Some(record) => Self {
                gateway: record.gateway.map(PaymentGateway::from).unwrap_or_default(),
                transaction_id: Some(record.id),
                location_id: record
                    .location_id
                    .unwrap_or_else(|| default_location.clone()),
            },
            None => {
                tracing::warn!(
                    location_id = %default_location,
                    "No transaction metadata, falling back to manual gateway"
                );
                Self {
                    gateway: PaymentGateway::Manual,
                    transaction_id: None,
                    location_id: default_location.clone(),
                }
            }
        }
    }
}
