//! Per-order refund session: the two-phase calculate/commit state machine.
//!
//! ```text
//! Browsing -> Selecting -> Calculated -> Committing -> Committed
//!                ^             |              |
//!                +-- mutate ---+              +------> Failed
//! ```
//!
//! The session performs no I/O. Callers take the request returned by a
//! `begin_*` method to the gateway and hand the outcome back through the
//! matching `complete_*` method.
//!
//! Each calculation is issued under a [`CalculationTicket`]. Only the most
//! recent ticket is accepted, and only while the selection is unchanged, so
//! responses that arrive late are dropped.
//!
//! A PayPal or Stripe refund issued during a commit stays on the session
//! through failures. It is reused by the next commit and locks the
//! selection, so the processor is never asked to refund twice.

use refund_desk_core::RefundPhase;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculator::{GatewayQuote, RefundCalculator, RefundQuote};
use crate::error::{RefundError, SelectionError};
use crate::gateway::{GatewayError, ProcessorRefund, RefundReceipt};
use crate::order::Order;
use crate::request::{RefundMode, RefundRequest};
use crate::selection::RefundSelection;

/// Identifies one calculate request within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalculationTicket {
    seq: u64,
    revision: u64,
}

impl CalculationTicket {
    /// Position of this request in the session's sequence.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }
}

/// Refund workflow for a single order.
#[derive(Debug, Clone)]
pub struct RefundSession {
    id: Uuid,
    order: Order,
    selection: RefundSelection,
    phase: RefundPhase,
    gateway_quote: Option<GatewayQuote>,
    last_seq: u64,
    in_flight: Option<CalculationTicket>,
    processor_refund: Option<ProcessorRefund>,
    receipt: Option<RefundReceipt>,
    last_error: Option<String>,
}

impl RefundSession {
    /// Open a session on an order snapshot.
    #[must_use]
    pub fn new(order: Order) -> Self {
        let selection = RefundSelection::for_order(&order);
        Self {
            id: Uuid::new_v4(),
            order,
            selection,
            phase: RefundPhase::Browsing,
            gateway_quote: None,
            last_seq: 0,
            in_flight: None,
            processor_refund: None,
            receipt: None,
            last_error: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn order(&self) -> &Order {
        &self.order
    }

    #[must_use]
    pub const fn selection(&self) -> &RefundSelection {
        &self.selection
    }

    #[must_use]
    pub const fn phase(&self) -> RefundPhase {
        self.phase
    }

    /// Gateway quote for the current selection, if one is held.
    #[must_use]
    pub const fn gateway_quote(&self) -> Option<&GatewayQuote> {
        self.gateway_quote.as_ref()
    }

    /// PayPal or Stripe refund already issued for this session.
    #[must_use]
    pub const fn processor_refund(&self) -> Option<&ProcessorRefund> {
        self.processor_refund.as_ref()
    }

    /// Receipt of the committed refund.
    #[must_use]
    pub const fn receipt(&self) -> Option<&RefundReceipt> {
        self.receipt.as_ref()
    }

    /// Message of the last gateway failure.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether a calculate request is awaiting its response.
    #[must_use]
    pub const fn is_calculating(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Commit is enabled only with exactly one fresh quote and nothing in flight.
    #[must_use]
    pub const fn can_commit(&self) -> bool {
        matches!(self.phase, RefundPhase::Calculated)
            && self.gateway_quote.is_some()
            && self.in_flight.is_none()
    }

    /// Local estimate for the current selection.
    ///
    /// # Errors
    ///
    /// Returns the calculator's validation errors.
    pub fn local_quote(&self, calculator: &RefundCalculator) -> Result<RefundQuote, RefundError> {
        calculator.quote(&self.order, &self.selection)
    }

    /// Mutate the selection.
    ///
    /// Any actual change drops the gateway quote and any pending
    /// calculation, returning the session to `Selecting` (or `Browsing`
    /// once nothing is selected).
    ///
    /// # Errors
    ///
    /// Returns `RefundError::InvalidState` while a commit is in progress,
    /// after the refund was committed, or once a processor refund was
    /// issued.
    pub fn update_selection<R>(
        &mut self,
        update: impl FnOnce(&mut RefundSelection) -> R,
    ) -> Result<R, RefundError> {
        self.ensure_open("change the selection")?;
        if self.processor_refund.is_some() {
            return Err(RefundError::InvalidState {
                state: self.phase,
                action: "change a selection the payment processor already refunded",
            });
        }

        let before = self.selection.revision();
        let result = update(&mut self.selection);

        if self.selection.revision() != before {
            if self.gateway_quote.take().is_some() {
                info!(session_id = %self.id, "Selection changed, gateway quote invalidated");
            }
            self.in_flight = None;
            self.phase = if self.selection.is_empty() {
                RefundPhase::Browsing
            } else {
                RefundPhase::Selecting
            };
        }

        Ok(result)
    }

    /// Start a calculate round-trip.
    ///
    /// Supersedes any calculation already in flight.
    ///
    /// # Errors
    ///
    /// Returns `RefundError::InvalidState` while committing or once
    /// committed, `SelectionError::Empty` when nothing is selected, and the
    /// calculator's validation errors.
    pub fn begin_calculation(
        &mut self,
        calculator: &RefundCalculator,
    ) -> Result<(CalculationTicket, RefundRequest), RefundError> {
        self.ensure_open("calculate")?;
        if self.selection.is_empty() {
            return Err(SelectionError::Empty.into());
        }

        let request =
            calculator.build_request(&self.order, &self.selection, RefundMode::Calculate, None)?;

        self.last_seq += 1;
        let ticket = CalculationTicket {
            seq: self.last_seq,
            revision: self.selection.revision(),
        };
        self.in_flight = Some(ticket);
        self.gateway_quote = None;
        self.phase = RefundPhase::Selecting;

        Ok((ticket, request))
    }

    /// Record the outcome of a calculate round-trip.
    ///
    /// Returns `Ok(None)` when the response is stale and was discarded.
    ///
    /// # Errors
    ///
    /// Returns `RefundError::Gateway` when the current calculation failed;
    /// the session moves to `Failed` and keeps its selection.
    pub fn complete_calculation(
        &mut self,
        ticket: CalculationTicket,
        result: Result<GatewayQuote, GatewayError>,
    ) -> Result<Option<GatewayQuote>, RefundError> {
        if self.in_flight != Some(ticket) || ticket.revision != self.selection.revision() {
            warn!(
                session_id = %self.id,
                seq = ticket.seq,
                latest = self.last_seq,
                "Discarding stale calculate response"
            );
            return Ok(None);
        }
        self.in_flight = None;

        match result {
            Ok(quote) => {
                info!(
                    session_id = %self.id,
                    order_id = %self.order.id,
                    transaction_id = %quote.transaction_id,
                    amount = %quote.amount,
                    "Refund calculated"
                );
                self.gateway_quote = Some(quote.clone());
                self.last_error = None;
                self.phase = RefundPhase::Calculated;
                Ok(Some(quote))
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Start the commit.
    ///
    /// # Errors
    ///
    /// Returns `RefundError::InvalidState` when committing, committed, or a
    /// calculation is still in flight, and `RefundError::MissingGatewayQuote`
    /// when no fresh quote is held.
    pub fn begin_commit(&mut self, calculator: &RefundCalculator) -> Result<RefundRequest, RefundError> {
        self.ensure_open("commit")?;
        if self.in_flight.is_some() {
            return Err(RefundError::InvalidState {
                state: self.phase,
                action: "commit",
            });
        }
        if self.phase != RefundPhase::Calculated {
            return Err(RefundError::MissingGatewayQuote);
        }

        let request = calculator.build_request(
            &self.order,
            &self.selection,
            RefundMode::Commit,
            self.gateway_quote.as_ref(),
        )?;
        self.phase = RefundPhase::Committing;
        Ok(request)
    }

    /// Record the outcome of the commit.
    ///
    /// # Errors
    ///
    /// Returns `RefundError::InvalidState` if no commit is in progress, or
    /// `RefundError::Gateway` when the commit failed.
    pub fn complete_commit(
        &mut self,
        result: Result<RefundReceipt, GatewayError>,
    ) -> Result<RefundReceipt, RefundError> {
        if self.phase != RefundPhase::Committing {
            return Err(RefundError::InvalidState {
                state: self.phase,
                action: "complete a commit",
            });
        }

        match result {
            Ok(receipt) => {
                info!(
                    session_id = %self.id,
                    order_id = %self.order.id,
                    transaction_id = %receipt.transaction_id,
                    amount = %receipt.amount,
                    "Refund committed"
                );
                self.receipt = Some(receipt.clone());
                self.last_error = None;
                self.phase = RefundPhase::Committed;
                Ok(receipt)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Record the PayPal or Stripe refund issued for the commit in progress.
    pub(crate) fn record_processor_refund(&mut self, refund: ProcessorRefund) {
        if self.phase == RefundPhase::Committing {
            info!(
                session_id = %self.id,
                gateway = %refund.gateway,
                refund_id = %refund.refund_id,
                "Processor refund recorded"
            );
            self.processor_refund = Some(refund);
        }
    }

    /// Abort the commit in progress, e.g. when a processor refund failed
    /// before the generic refund was sent.
    pub(crate) fn fail_commit(&mut self, err: GatewayError) -> RefundError {
        if self.phase != RefundPhase::Committing {
            return RefundError::InvalidState {
                state: self.phase,
                action: "fail a commit that is not in progress",
            };
        }
        self.fail(err)
    }

    /// Move to `Failed`, keeping the selection and any processor refund and
    /// dropping the quote.
    fn fail(&mut self, err: GatewayError) -> RefundError {
        warn!(
            session_id = %self.id,
            phase = %self.phase,
            error = %err,
            "Refund gateway call failed"
        );
        self.last_error = Some(err.user_message());
        self.gateway_quote = None;
        self.in_flight = None;
        self.phase = RefundPhase::Failed;
        err.into()
    }

    fn ensure_open(&self, action: &'static str) -> Result<(), RefundError> {
        match self.phase {
            RefundPhase::Committing | RefundPhase::Committed => {
                Err(RefundError::InvalidState {
                    state: self.phase,
                    action,
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ShopSettings;
    use crate::order::{LineItem, TaxLine};
    use refund_desk_core::{
        CurrencyCode, LineItemId, Money, OrderId, PaymentGateway, TransactionId,
    };
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn order() -> Order {
        Order {
            id: OrderId::from_numeric(5_551_234),
            name: "#1042".to_string(),
            email: None,
            currency: CurrencyCode::AUD,
            financial_status: None,
            total_tax: Money::new(dec!(10.00)),
            gateway: PaymentGateway::Manual,
            transaction_id: None,
            location_id: None,
            line_items: vec![LineItem {
                id: LineItemId::from_numeric(13_421),
                title: "Candle".to_string(),
                sku: None,
                unit_price: Money::new(dec!(25.00)),
                quantity: 4,
                previously_refunded_quantity: 0,
                tax_lines: vec![TaxLine {
                    price: Money::new(dec!(10.00)),
                    rate: dec!(0.1),
                    title: "GST".to_string(),
                }],
            }],
            shipping: None,
            metafields: BTreeMap::new(),
        }
    }

    fn quote(amount: rust_decimal::Decimal) -> GatewayQuote {
        GatewayQuote {
            transaction_id: TransactionId::new("4411"),
            amount: Money::new(amount),
        }
    }

    fn selecting_session() -> RefundSession {
        let mut session = RefundSession::new(order());
        let item = session.order().line_items[0].clone();
        session.update_selection(|s| s.select(&item, 2)).unwrap();
        session
    }

    fn calculator() -> RefundCalculator {
        RefundCalculator::new(ShopSettings::default())
    }

    #[test]
    fn test_new_session_is_browsing() {
        let session = RefundSession::new(order());
        assert_eq!(session.phase(), RefundPhase::Browsing);
        assert!(!session.can_commit());
    }

    #[test]
    fn test_calculate_then_commit() {
        let calc = calculator();
        let mut session = selecting_session();
        assert_eq!(session.phase(), RefundPhase::Selecting);

        let (ticket, request) = session.begin_calculation(&calc).unwrap();
        assert_eq!(request.mode, RefundMode::Calculate);
        assert!(session.is_calculating());
        assert!(!session.can_commit());

        session
            .complete_calculation(ticket, Ok(quote(dec!(55.00))))
            .unwrap()
            .unwrap();
        assert_eq!(session.phase(), RefundPhase::Calculated);
        assert!(session.can_commit());

        let request = session.begin_commit(&calc).unwrap();
        assert_eq!(session.phase(), RefundPhase::Committing);
        assert_eq!(request.transaction_amount(), Some(Money::new(dec!(55.00))));

        let receipt = session
            .complete_commit(Ok(RefundReceipt {
                transaction_id: TransactionId::new("9001"),
                amount: Money::new(dec!(55.00)),
            }))
            .unwrap();
        assert_eq!(receipt.transaction_id.as_str(), "9001");
        assert_eq!(session.phase(), RefundPhase::Committed);
        assert!(session.phase().is_terminal());
    }

    #[test]
    fn test_commit_without_calculate() {
        let mut session = selecting_session();
        let err = session.begin_commit(&calculator()).unwrap_err();
        assert!(matches!(err, RefundError::MissingGatewayQuote));
        assert_eq!(session.phase(), RefundPhase::Selecting);
    }

    #[test]
    fn test_mutation_invalidates_quote() {
        let calc = calculator();
        let mut session = selecting_session();
        let (ticket, _) = session.begin_calculation(&calc).unwrap();
        session
            .complete_calculation(ticket, Ok(quote(dec!(55.00))))
            .unwrap();

        let item = session.order().line_items[0].clone();
        session.update_selection(|s| s.select(&item, 3)).unwrap();

        assert_eq!(session.phase(), RefundPhase::Selecting);
        assert!(session.gateway_quote().is_none());
        assert!(matches!(
            session.begin_commit(&calc).unwrap_err(),
            RefundError::MissingGatewayQuote
        ));
    }

    #[test]
    fn test_no_op_mutation_keeps_quote() {
        let calc = calculator();
        let mut session = selecting_session();
        let (ticket, _) = session.begin_calculation(&calc).unwrap();
        session
            .complete_calculation(ticket, Ok(quote(dec!(55.00))))
            .unwrap();

        session
            .update_selection(|s| s.set_notify_customer(true))
            .unwrap();
        assert!(session.can_commit());
    }

    #[test]
    fn test_superseded_response_discarded() {
        let calc = calculator();
        let mut session = selecting_session();
        let (first, _) = session.begin_calculation(&calc).unwrap();
        let (second, _) = session.begin_calculation(&calc).unwrap();
        assert!(second.seq() > first.seq());

        let stale = session
            .complete_calculation(first, Ok(quote(dec!(1.00))))
            .unwrap();
        assert!(stale.is_none());
        assert!(session.is_calculating());

        let fresh = session
            .complete_calculation(second, Ok(quote(dec!(55.00))))
            .unwrap();
        assert_eq!(fresh.unwrap().amount, Money::new(dec!(55.00)));
    }

    #[test]
    fn test_response_after_mutation_discarded() {
        let calc = calculator();
        let mut session = selecting_session();
        let (ticket, _) = session.begin_calculation(&calc).unwrap();

        let item = session.order().line_items[0].clone();
        session.update_selection(|s| s.select(&item, 1)).unwrap();

        let result = session
            .complete_calculation(ticket, Ok(quote(dec!(55.00))))
            .unwrap();
        assert!(result.is_none());
        assert!(session.gateway_quote().is_none());
        assert_eq!(session.phase(), RefundPhase::Selecting);
    }

    #[test]
    fn test_failed_commit_keeps_selection() {
        let calc = calculator();
        let mut session = selecting_session();
        let (ticket, _) = session.begin_calculation(&calc).unwrap();
        session
            .complete_calculation(ticket, Ok(quote(dec!(55.00))))
            .unwrap();
        session.begin_commit(&calc).unwrap();

        let err = session
            .complete_commit(Err(GatewayError::Api {
                status: 502,
                message: "Processor unavailable".to_string(),
            }))
            .unwrap_err();

        assert!(matches!(err, RefundError::Gateway(_)));
        assert_eq!(session.phase(), RefundPhase::Failed);
        assert_eq!(session.last_error(), Some("Processor unavailable"));
        assert_eq!(session.selection().line_items().len(), 1);
        assert!(session.gateway_quote().is_none());
        assert!(session.receipt().is_none());

        // retry requires a fresh calculation
        assert!(matches!(
            session.begin_commit(&calc).unwrap_err(),
            RefundError::MissingGatewayQuote
        ));
        let (ticket, _) = session.begin_calculation(&calc).unwrap();
        session
            .complete_calculation(ticket, Ok(quote(dec!(55.00))))
            .unwrap();
        assert!(session.can_commit());
    }

    #[test]
    fn test_failed_calculation() {
        let calc = calculator();
        let mut session = selecting_session();
        let (ticket, _) = session.begin_calculation(&calc).unwrap();
        let err = session
            .complete_calculation(
                ticket,
                Err(GatewayError::Api {
                    status: 400,
                    message: "bad".to_string(),
                }),
            )
            .unwrap_err();
        assert!(matches!(err, RefundError::Gateway(_)));
        assert_eq!(session.phase(), RefundPhase::Failed);
        assert!(!session.is_calculating());
    }

    #[test]
    fn test_empty_selection_cannot_calculate() {
        let mut session = RefundSession::new(order());
        let err = session.begin_calculation(&calculator()).unwrap_err();
        assert!(matches!(
            err,
            RefundError::InvalidSelection(SelectionError::Empty)
        ));
    }

    #[test]
    fn test_invalid_selection_blocks_calculation() {
        let mut session = RefundSession::new(order());
        let item = session.order().line_items[0].clone();
        session.update_selection(|s| s.select(&item, 5)).unwrap();
        let err = session.begin_calculation(&calculator()).unwrap_err();
        assert!(matches!(err, RefundError::InvalidSelection(_)));
        assert!(!session.is_calculating());
    }

    #[test]
    fn test_committed_session_is_locked() {
        let calc = calculator();
        let mut session = selecting_session();
        let (ticket, _) = session.begin_calculation(&calc).unwrap();
        session
            .complete_calculation(ticket, Ok(quote(dec!(55.00))))
            .unwrap();
        session.begin_commit(&calc).unwrap();

        let err = session.update_selection(|s| s.clear_line_items()).unwrap_err();
        assert!(matches!(
            err,
            RefundError::InvalidState {
                state: RefundPhase::Committing,
                ..
            }
        ));
        assert!(session.begin_commit(&calc).is_err());
    }

    #[test]
    fn test_complete_commit_without_begin() {
        let mut session = selecting_session();
        let err = session
            .complete_commit(Ok(RefundReceipt {
                transaction_id: TransactionId::new("1"),
                amount: Money::ZERO,
            }))
            .unwrap_err();
        assert!(matches!(err, RefundError::InvalidState { .. }));
    }

    #[test]
    fn test_clearing_selection_returns_to_browsing() {
        let mut session = selecting_session();
        session.update_selection(RefundSelection::clear_line_items).unwrap();
        assert_eq!(session.phase(), RefundPhase::Browsing);
    }

    #[test]
    fn test_local_quote() {
        let session = selecting_session();
        let quote = session.local_quote(&calculator()).unwrap();
        assert_eq!(quote.refund_total, Money::new(dec!(55.00)));
    }

    fn paypal_refund() -> ProcessorRefund {
        ProcessorRefund {
            gateway: PaymentGateway::PayPal,
            refund_id: "8XY12".to_string(),
        }
    }

    fn committing_session(calc: &RefundCalculator) -> RefundSession {
        let mut session = selecting_session();
        let (ticket, _) = session.begin_calculation(calc).unwrap();
        session
            .complete_calculation(ticket, Ok(quote(dec!(55.00))))
            .unwrap();
        session.begin_commit(calc).unwrap();
        session
    }

    #[test]
    fn test_processor_refund_survives_failed_commit() {
        let calc = calculator();
        let mut session = committing_session(&calc);
        session.record_processor_refund(paypal_refund());
        session
            .complete_commit(Err(GatewayError::Rejected("down".to_string())))
            .unwrap_err();

        assert_eq!(session.phase(), RefundPhase::Failed);
        assert_eq!(session.processor_refund(), Some(&paypal_refund()));

        let (ticket, _) = session.begin_calculation(&calc).unwrap();
        session
            .complete_calculation(ticket, Ok(quote(dec!(55.00))))
            .unwrap();
        assert_eq!(session.processor_refund(), Some(&paypal_refund()));
    }

    #[test]
    fn test_processor_refund_locks_selection() {
        let calc = calculator();
        let mut session = committing_session(&calc);
        session.record_processor_refund(paypal_refund());
        session
            .complete_commit(Err(GatewayError::Rejected("down".to_string())))
            .unwrap_err();

        let item = session.order().line_items[0].clone();
        let err = session.update_selection(|s| s.select(&item, 1)).unwrap_err();
        assert!(matches!(err, RefundError::InvalidState { .. }));
        assert_eq!(session.selection().line_items()[0].quantity, 2);
    }

    #[test]
    fn test_processor_refund_ignored_outside_commit() {
        let mut session = selecting_session();
        session.record_processor_refund(paypal_refund());
        assert!(session.processor_refund().is_none());
    }

    #[test]
    fn test_fail_commit_requires_commit_in_progress() {
        let calc = calculator();
        let mut session = selecting_session();
        let (ticket, _) = session.begin_calculation(&calc).unwrap();
        session
            .complete_calculation(ticket, Ok(quote(dec!(55.00))))
            .unwrap();

        let err = session.fail_commit(GatewayError::Rejected("nope".to_string()));
        assert!(matches!(
            err,
            RefundError::InvalidState {
                state: RefundPhase::Calculated,
                ..
            }
        ));
        assert!(session.can_commit());
    }
}
