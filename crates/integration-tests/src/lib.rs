//! Integration tests for Refund Desk.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p refund-desk-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `calculator_properties` - worked examples and property tests for quotes
//! - `refund_flow` - full calculate/commit flows against [`FakeGateway`]
//! - `http_gateway` - [`refund_desk::HttpRefundGateway`] against a mock server
//!
//! This crate holds the shared fixtures.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use refund_desk::{
    GatewayError, GatewayQuote, LineItem, Order, ProcessorRefund, RefundGateway, RefundHistory,
    RefundReceipt, RefundRequest, ShippingLine, TaxLine,
};
use refund_desk_core::{
    CurrencyCode, LineItemId, LocationId, Money, OrderId, PaymentGateway, TransactionId,
};
use rust_decimal::Decimal;

/// Money from a decimal string; panics on bad input (fixtures only).
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn money(amount: &str) -> Money {
    amount.parse().unwrap()
}

/// Line item with a single 10% tax line.
#[must_use]
pub fn line_item(
    id: u64,
    unit_price: &str,
    quantity: i64,
    previously_refunded: i64,
    tax: Option<&str>,
) -> LineItem {
    LineItem {
        id: LineItemId::from_numeric(id),
        title: format!("Item {id}"),
        sku: Some(format!("SKU-{id}")),
        unit_price: money(unit_price),
        quantity,
        previously_refunded_quantity: previously_refunded,
        tax_lines: tax
            .map(|price| TaxLine {
                price: money(price),
                rate: Decimal::new(1, 1),
                title: "GST".to_string(),
            })
            .into_iter()
            .collect(),
    }
}

/// Builder for order snapshots.
#[derive(Debug, Clone)]
pub struct OrderBuilder {
    order: Order,
}

impl Default for OrderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: Order {
                id: OrderId::from_numeric(5_551_234),
                name: "#1042".to_string(),
                email: Some("customer@example.com".to_string()),
                currency: CurrencyCode::AUD,
                financial_status: None,
                total_tax: Money::ZERO,
                gateway: PaymentGateway::Manual,
                transaction_id: Some(TransactionId::new("998877")),
                location_id: Some(LocationId::new("70116966605")),
                line_items: Vec::new(),
                shipping: None,
                metafields: BTreeMap::new(),
            },
        }
    }

    #[must_use]
    pub fn line_item(mut self, item: LineItem) -> Self {
        self.order.line_items.push(item);
        self
    }

    #[must_use]
    pub fn shipping(mut self, original: &str, tax: &[&str], max_refundable: &str) -> Self {
        self.order.shipping = Some(ShippingLine {
            title: Some("Standard".to_string()),
            original_amount: money(original),
            tax_lines: tax
                .iter()
                .map(|price| TaxLine {
                    price: money(price),
                    rate: Decimal::new(1, 1),
                    title: "GST".to_string(),
                })
                .collect(),
            max_refundable: money(max_refundable),
        });
        self
    }

    #[must_use]
    pub fn gateway(mut self, gateway: PaymentGateway) -> Self {
        self.order.gateway = gateway;
        self
    }

    #[must_use]
    pub fn metafield(mut self, key: &str, value: &str) -> Self {
        self.order
            .metafields
            .insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn build(self) -> Order {
        self.order
    }
}

/// Order with one taxed line item (`25.00 × 4`, tax `10.00`) and shipping
/// (`20.00`, tax `2.00`).
#[must_use]
pub fn sample_order() -> Order {
    OrderBuilder::new()
        .line_item(line_item(13_421, "25.00", 4, 0, Some("10.00")))
        .shipping("20.00", &["2.00"], "20.00")
        .build()
}

/// A call received by [`FakeGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Calculate(RefundRequest),
    Refund(RefundRequest),
    PayPal { transaction_id: String, amount: Money },
    Stripe { charge_id: String, amount: Money },
    History(OrderId),
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<GatewayCall>,
    quote_amount: Option<Money>,
    calculate_error: Option<String>,
    refund_error: Option<String>,
    processor_error: Option<String>,
    history: RefundHistory,
}

/// In-memory refund gateway that records every call.
///
/// Quotes zero unless an amount is scripted with [`FakeGateway::with_quote`];
/// commits echo the attached amount under transaction `9001`.
#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<FakeState>>,
}

impl FakeGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Quote this amount for every calculate request.
    #[must_use]
    pub fn with_quote(self, amount: &str) -> Self {
        self.state().quote_amount = Some(money(amount));
        self
    }

    #[must_use]
    pub fn with_history(self, history: RefundHistory) -> Self {
        self.state().history = history;
        self
    }

    /// Fail calculate requests with this message (`None` to succeed again).
    pub fn fail_calculate(&self, message: Option<&str>) {
        self.state().calculate_error = message.map(str::to_string);
    }

    /// Fail commit requests with this message (`None` to succeed again).
    pub fn fail_refund(&self, message: Option<&str>) {
        self.state().refund_error = message.map(str::to_string);
    }

    /// Reject PayPal/Stripe refunds with this message.
    pub fn reject_processor(&self, message: Option<&str>) {
        self.state().processor_error = message.map(str::to_string);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state().calls.clone()
    }

    /// Commit requests received so far.
    #[must_use]
    pub fn refunds(&self) -> Vec<RefundRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Refund(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn api_error(message: &str) -> GatewayError {
        GatewayError::Api {
            status: 502,
            message: message.to_string(),
        }
    }
}

impl RefundGateway for FakeGateway {
    async fn calculate(&self, request: &RefundRequest) -> Result<GatewayQuote, GatewayError> {
        let mut state = self.state();
        state.calls.push(GatewayCall::Calculate(request.clone()));
        if let Some(message) = &state.calculate_error {
            return Err(Self::api_error(message));
        }
        Ok(GatewayQuote {
            transaction_id: TransactionId::new("gid://shopify/OrderTransaction/4411"),
            amount: state.quote_amount.unwrap_or(Money::ZERO),
        })
    }

    async fn refund(&self, request: &RefundRequest) -> Result<RefundReceipt, GatewayError> {
        let mut state = self.state();
        state.calls.push(GatewayCall::Refund(request.clone()));
        if let Some(message) = &state.refund_error {
            return Err(Self::api_error(message));
        }
        Ok(RefundReceipt {
            transaction_id: TransactionId::new("9001"),
            amount: request.transaction_amount().unwrap_or(Money::ZERO),
        })
    }

    async fn paypal_refund(
        &self,
        transaction_id: &str,
        amount: Money,
    ) -> Result<ProcessorRefund, GatewayError> {
        let mut state = self.state();
        state.calls.push(GatewayCall::PayPal {
            transaction_id: transaction_id.to_string(),
            amount,
        });
        if let Some(message) = &state.processor_error {
            return Err(GatewayError::Rejected(message.clone()));
        }
        Ok(ProcessorRefund {
            gateway: PaymentGateway::PayPal,
            refund_id: "PP-8XY12".to_string(),
        })
    }

    async fn stripe_refund(
        &self,
        charge_id: &str,
        amount: Money,
    ) -> Result<ProcessorRefund, GatewayError> {
        let mut state = self.state();
        state.calls.push(GatewayCall::Stripe {
            charge_id: charge_id.to_string(),
            amount,
        });
        if let Some(message) = &state.processor_error {
            return Err(GatewayError::Rejected(message.clone()));
        }
        Ok(ProcessorRefund {
            gateway: PaymentGateway::Stripe,
            refund_id: "re_3Nx".to_string(),
        })
    }

    async fn refund_history(&self, order_id: &OrderId) -> Result<RefundHistory, GatewayError> {
        let mut state = self.state();
        state.calls.push(GatewayCall::History(order_id.clone()));
        Ok(state.history.clone())
    }
}
