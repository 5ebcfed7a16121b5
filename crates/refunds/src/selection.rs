//! Caller-built refund selection.
//!
//! Every mutation bumps [`RefundSelection::revision`], which the session uses
//! to tell whether a gateway quote still describes the current selection.

use refund_desk_core::{LineItemId, Money};

use crate::order::{LineItem, Order};

/// One line item chosen for refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedLineItem {
    pub line_item_id: LineItemId,
    pub quantity: i64,
    /// Unit price charged back per unit, as supplied by the caller.
    pub unit_price: Money,
    pub title: String,
}

impl SelectedLineItem {
    /// Select `quantity` units of `item` at its current unit price.
    #[must_use]
    pub fn from_line_item(item: &LineItem, quantity: i64) -> Self {
        Self {
            line_item_id: item.id.clone(),
            quantity,
            unit_price: item.unit_price,
            title: item.title.clone(),
        }
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Line items, shipping, and notification choices for one refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundSelection {
    line_items: Vec<SelectedLineItem>,
    shipping_requested: bool,
    shipping_amount: Money,
    note: String,
    notify_customer: bool,
    revision: u64,
}

impl Default for RefundSelection {
    fn default() -> Self {
        Self {
            line_items: Vec::new(),
            shipping_requested: false,
            shipping_amount: Money::ZERO,
            note: String::new(),
            notify_customer: true,
            revision: 0,
        }
    }
}

impl RefundSelection {
    /// Empty selection that notifies the customer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty selection whose shipping amount is pre-filled with what is
    /// still refundable on `order`.
    #[must_use]
    pub fn for_order(order: &Order) -> Self {
        Self {
            shipping_amount: order
                .shipping
                .as_ref()
                .map_or(Money::ZERO, |shipping| shipping.max_refundable),
            ..Self::default()
        }
    }

    /// Selected line items in selection order.
    #[must_use]
    pub fn line_items(&self) -> &[SelectedLineItem] {
        &self.line_items
    }

    /// Selected entry for a line item, if any.
    #[must_use]
    pub fn line_item(&self, id: &LineItemId) -> Option<&SelectedLineItem> {
        self.line_items.iter().find(|entry| &entry.line_item_id == id)
    }

    /// Whether shipping is part of the refund.
    #[must_use]
    pub const fn shipping_requested(&self) -> bool {
        self.shipping_requested
    }

    /// Shipping amount entered by the caller, whether or not it is requested.
    #[must_use]
    pub const fn shipping_amount(&self) -> Money {
        self.shipping_amount
    }

    /// Shipping amount that will actually be refunded.
    #[must_use]
    pub const fn requested_shipping(&self) -> Money {
        if self.shipping_requested {
            self.shipping_amount
        } else {
            Money::ZERO
        }
    }

    #[must_use]
    pub fn note(&self) -> &str {
        &self.note
    }

    #[must_use]
    pub const fn notify_customer(&self) -> bool {
        self.notify_customer
    }

    /// Counter incremented by every mutation.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// True when neither line items nor shipping are selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty() && !self.shipping_requested
    }

    /// Set the refund quantity for `item`; zero removes it.
    pub fn select(&mut self, item: &LineItem, quantity: i64) {
        if quantity == 0 {
            self.remove(&item.id);
        } else {
            self.insert(SelectedLineItem::from_line_item(item, quantity));
        }
    }

    /// Insert or replace an entry, keyed by line item ID.
    pub fn insert(&mut self, entry: SelectedLineItem) {
        match self
            .line_items
            .iter_mut()
            .find(|existing| existing.line_item_id == entry.line_item_id)
        {
            Some(existing) => *existing = entry,
            None => self.line_items.push(entry),
        }
        self.touch();
    }

    /// Drop a line item from the selection.
    ///
    /// Returns whether it was selected.
    pub fn remove(&mut self, id: &LineItemId) -> bool {
        let before = self.line_items.len();
        self.line_items.retain(|entry| &entry.line_item_id != id);
        let removed = self.line_items.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Unselect every line item.
    pub fn clear_line_items(&mut self) {
        if !self.line_items.is_empty() {
            self.line_items.clear();
            self.touch();
        }
    }

    /// Include shipping in the refund with the given amount.
    pub fn request_shipping(&mut self, amount: Money) {
        self.shipping_requested = true;
        self.shipping_amount = amount;
        self.touch();
    }

    /// Exclude shipping, keeping the entered amount for later.
    pub fn cancel_shipping(&mut self) {
        if self.shipping_requested {
            self.shipping_requested = false;
            self.touch();
        }
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = note.into();
        self.touch();
    }

    pub fn set_notify_customer(&mut self, notify: bool) {
        if self.notify_customer != notify {
            self.notify_customer = notify;
            self.touch();
        }
    }

    const fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::TaxLine;
    use refund_desk_core::{CurrencyCode, OrderId, PaymentGateway};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn line_item(id: u64) -> LineItem {
        LineItem {
            id: LineItemId::from_numeric(id),
            title: format!("Item {id}"),
            sku: None,
            unit_price: Money::new(dec!(12.50)),
            quantity: 3,
            previously_refunded_quantity: 0,
            tax_lines: vec![TaxLine {
                price: Money::new(dec!(3.75)),
                rate: dec!(0.1),
                title: "GST".to_string(),
            }],
        }
    }

    #[test]
    fn test_new_selection_notifies_and_is_empty() {
        let selection = RefundSelection::new();
        assert!(selection.is_empty());
        assert!(selection.notify_customer());
        assert_eq!(selection.revision(), 0);
        assert_eq!(selection.requested_shipping(), Money::ZERO);
    }

    #[test]
    fn test_select_replaces_existing_entry() {
        let item = line_item(1);
        let mut selection = RefundSelection::new();
        selection.select(&item, 1);
        selection.select(&item, 2);

        assert_eq!(selection.line_items().len(), 1);
        assert_eq!(selection.line_item(&item.id).map(|e| e.quantity), Some(2));
        assert_eq!(selection.revision(), 2);
    }

    #[test]
    fn test_select_zero_removes() {
        let item = line_item(1);
        let mut selection = RefundSelection::new();
        selection.select(&item, 2);
        selection.select(&item, 0);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_remove_missing_does_not_bump_revision() {
        let mut selection = RefundSelection::new();
        assert!(!selection.remove(&LineItemId::from_numeric(9)));
        assert_eq!(selection.revision(), 0);
    }

    #[test]
    fn test_shipping_toggle() {
        let mut selection = RefundSelection::new();
        selection.request_shipping(Money::new(dec!(7.50)));
        assert!(!selection.is_empty());
        assert_eq!(selection.requested_shipping(), Money::new(dec!(7.50)));

        selection.cancel_shipping();
        assert_eq!(selection.requested_shipping(), Money::ZERO);
        assert_eq!(selection.shipping_amount(), Money::new(dec!(7.50)));
    }

    #[test]
    fn test_notify_toggle_bumps_only_on_change() {
        let mut selection = RefundSelection::new();
        selection.set_notify_customer(true);
        assert_eq!(selection.revision(), 0);
        selection.set_notify_customer(false);
        assert_eq!(selection.revision(), 1);
    }

    #[test]
    fn test_for_order_prefills_refundable_shipping() {
        let order = Order {
            id: OrderId::from_numeric(1),
            name: "#1".to_string(),
            email: None,
            currency: CurrencyCode::AUD,
            financial_status: None,
            total_tax: Money::ZERO,
            gateway: PaymentGateway::Manual,
            transaction_id: None,
            location_id: None,
            line_items: vec![line_item(1)],
            shipping: Some(crate::order::ShippingLine {
                title: None,
                original_amount: Money::new(dec!(20.00)),
                tax_lines: vec![],
                max_refundable: Money::new(dec!(15.00)),
            }),
            metafields: BTreeMap::new(),
        };

        let selection = RefundSelection::for_order(&order);
        assert_eq!(selection.shipping_amount(), Money::new(dec!(15.00)));
        assert!(!selection.shipping_requested());
    }

    #[test]
    fn test_subtotal() {
        let entry = SelectedLineItem::from_line_item(&line_item(1), 2);
        assert_eq!(entry.subtotal(), Money::new(dec!(25.00)));
    }
}
