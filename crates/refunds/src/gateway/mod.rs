//! Refund gateway: the external service that quotes and executes refunds.
//!
//! # Endpoints
//!
//! Relative to the configured base URL:
//!
//! | Method | Path                  | Purpose                               |
//! |--------|-----------------------|---------------------------------------|
//! | POST   | `calculate`           | Dry-run quote, no money moves         |
//! | POST   | `refund`              | Commit a refund                       |
//! | POST   | `paypal-refund`       | Refund a PayPal capture directly      |
//! | POST   | `stripe-refund`       | Refund a Stripe charge directly       |
//! | GET    | `get-refunds/{order}` | Prior refunds for an order            |

mod client;
mod error;
pub mod types;

use std::future::Future;

use refund_desk_core::{Money, OrderId};

pub use client::HttpRefundGateway;
pub use error::GatewayError;
pub use types::{ProcessorRefund, RefundReceipt};

use crate::calculator::GatewayQuote;
use crate::history::RefundHistory;
use crate::request::RefundRequest;

/// Operations offered by the refund gateway.
///
/// Every call is fallible and never retried automatically.
pub trait RefundGateway: Send + Sync {
    /// Ask for the authoritative quote of a calculate-mode request.
    fn calculate(
        &self,
        request: &RefundRequest,
    ) -> impl Future<Output = Result<GatewayQuote, GatewayError>> + Send;

    /// Execute a commit-mode request.
    fn refund(
        &self,
        request: &RefundRequest,
    ) -> impl Future<Output = Result<RefundReceipt, GatewayError>> + Send;

    /// Refund a PayPal capture.
    fn paypal_refund(
        &self,
        transaction_id: &str,
        amount: Money,
    ) -> impl Future<Output = Result<ProcessorRefund, GatewayError>> + Send;

    /// Refund a Stripe charge.
    fn stripe_refund(
        &self,
        charge_id: &str,
        amount: Money,
    ) -> impl Future<Output = Result<ProcessorRefund, GatewayError>> + Send;

    /// Refunds already issued for an order.
    fn refund_history(
        &self,
        order_id: &OrderId,
    ) -> impl Future<Output = Result<RefundHistory, GatewayError>> + Send;
}
