//! Refund Desk library.
//!
//! Quotes Shopify refunds locally, then runs the two-phase
//! calculate/commit protocol against an external refund gateway.
//!
//! # Flow
//!
//! 1. Open a [`RefundSession`] on an [`Order`] snapshot
//! 2. Mutate its [`RefundSelection`]; show [`RefundCalculator::quote`] as an estimate
//! 3. [`RefundDesk::calculate`] fetches the gateway's authoritative quote
//! 4. [`RefundDesk::commit`] executes the refund against that quote
//!
//! Any selection change after step 3 drops the quote, so step 4 is only
//! reachable with a quote that matches what is selected.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod calculator;
pub mod config;
pub mod desk;
pub mod error;
pub mod gateway;
pub mod history;
pub mod order;
pub mod request;
pub mod selection;
pub mod session;

pub use calculator::{GatewayQuote, RefundCalculator, RefundQuote};
pub use config::{ConfigError, GatewayConfig, RefundDeskConfig, ShopSettings};
pub use desk::RefundDesk;
pub use error::{RefundError, SelectionError};
pub use gateway::{
    GatewayError, HttpRefundGateway, ProcessorRefund, RefundGateway, RefundReceipt,
};
pub use history::{RefundHistory, RefundRecord, RefundedLineItem, RefundedShipping};
pub use order::{
    LineItem, Order, PaymentReference, ShippingLine, TaxLine, TransactionMeta, TransactionRecord,
};
pub use request::{RefundLineItem, RefundMode, RefundRequest, RefundTransaction};
pub use selection::{RefundSelection, SelectedLineItem};
pub use session::{CalculationTicket, RefundSession};
