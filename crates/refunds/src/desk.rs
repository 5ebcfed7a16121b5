//! Drives refund sessions against a [`RefundGateway`].

use refund_desk_core::{Money, OrderId};
use tracing::{info, instrument};

use crate::calculator::{GatewayQuote, RefundCalculator};
use crate::config::ShopSettings;
use crate::error::RefundError;
use crate::gateway::{GatewayError, ProcessorRefund, RefundGateway, RefundReceipt};
use crate::history::RefundHistory;
use crate::order::{Order, PaymentReference, TransactionMeta, TransactionRecord};
use crate::session::RefundSession;

/// Refund workflow entry point.
///
/// Holds no per-order state; each order is handled through its own
/// [`RefundSession`].
#[derive(Debug, Clone)]
pub struct RefundDesk<G> {
    gateway: G,
    calculator: RefundCalculator,
}

impl<G: RefundGateway> RefundDesk<G> {
    #[must_use]
    pub const fn new(gateway: G, settings: ShopSettings) -> Self {
        Self {
            gateway,
            calculator: RefundCalculator::new(settings),
        }
    }

    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    #[must_use]
    pub const fn calculator(&self) -> &RefundCalculator {
        &self.calculator
    }

    /// Open a session on a snapshot whose quantities are already remaining
    /// quantities.
    #[must_use]
    pub fn open(&self, order: Order) -> RefundSession {
        let session = RefundSession::new(order);
        info!(
            session_id = %session.id(),
            order_id = %session.order().id,
            "Refund session opened"
        );
        session
    }

    /// Apply the result of an order's transaction lookup.
    ///
    /// An empty or failed lookup (`None`) falls back to the manual gateway
    /// and the shop's default location instead of aborting.
    #[must_use]
    pub fn resolve_transaction(&self, order: Order, record: Option<TransactionRecord>) -> Order {
        let default_location = &self.calculator.settings().default_location_id;
        order.with_transaction_meta(TransactionMeta::resolve(record, default_location))
    }

    /// Prior refunds for an order.
    ///
    /// # Errors
    ///
    /// Returns `RefundError::Gateway` if the lookup fails.
    pub async fn refund_history(&self, order_id: &OrderId) -> Result<RefundHistory, RefundError> {
        Ok(self.gateway.refund_history(order_id).await?)
    }

    /// Apply refund history to a snapshot carrying originally ordered
    /// quantities.
    ///
    /// # Errors
    ///
    /// Returns `RefundError::Gateway` if the history lookup fails.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn reconcile(&self, order: Order) -> Result<Order, RefundError> {
        let history = self.refund_history(&order.id).await?;
        Ok(history.apply_to_original(order))
    }

    /// Request the gateway's quote for the session's selection.
    ///
    /// # Errors
    ///
    /// Returns validation errors before any network call, or
    /// `RefundError::Gateway` when the gateway fails.
    #[instrument(skip(self, session), fields(session_id = %session.id(), order_id = %session.order().id))]
    pub async fn calculate(&self, session: &mut RefundSession) -> Result<GatewayQuote, RefundError> {
        let (ticket, request) = session.begin_calculation(&self.calculator)?;
        let result = self.gateway.calculate(&request).await;
        session
            .complete_calculation(ticket, result)?
            .ok_or_else(|| RefundError::InvalidState {
                state: session.phase(),
                action: "accept a superseded quote",
            })
    }

    /// Commit the refund quoted by the last calculation.
    ///
    /// Orders paid through PayPal or Stripe are refunded with the processor
    /// first; the processor's refund ID is appended to the note of the
    /// commit request. A processor failure fails the commit before the
    /// refund gateway is asked to record it. When a processor refund went
    /// through but the refund gateway then failed, the retry reuses that
    /// refund instead of issuing another.
    ///
    /// # Errors
    ///
    /// Returns `RefundError::MissingGatewayQuote` without a fresh quote,
    /// `RefundError::InvalidState` outside the `Calculated` phase, or
    /// `RefundError::Gateway` when a gateway call fails.
    #[instrument(skip(self, session), fields(session_id = %session.id(), order_id = %session.order().id))]
    pub async fn commit(&self, session: &mut RefundSession) -> Result<RefundReceipt, RefundError> {
        let mut request = session.begin_commit(&self.calculator)?;
        let amount = request.transaction_amount().unwrap_or(Money::ZERO);

        let issued = session.processor_refund().cloned();
        let processor_refund = match (issued, session.order().payment_reference()) {
            (Some(issued), _) => {
                info!(
                    refund_id = %issued.refund_id,
                    "Reusing processor refund from earlier attempt"
                );
                Some(issued)
            }
            (None, Some(reference)) => match self.processor_refund(&reference, amount).await {
                Ok(refund) => {
                    session.record_processor_refund(refund.clone());
                    Some(refund)
                }
                Err(err) => return Err(session.fail_commit(err)),
            },
            (None, None) => None,
        };
        if let Some(refund) = processor_refund {
            request.append_note_reference(&refund.note_reference());
        }

        let result = self.gateway.refund(&request).await;
        session.complete_commit(result)
    }

    async fn processor_refund(
        &self,
        reference: &PaymentReference,
        amount: Money,
    ) -> Result<ProcessorRefund, GatewayError> {
        match reference {
            PaymentReference::PayPal { transaction_id } => {
                self.gateway.paypal_refund(transaction_id, amount).await
            }
            PaymentReference::Stripe { charge_id } => {
                self.gateway.stripe_refund(charge_id, amount).await
            }
        }
    }
}
