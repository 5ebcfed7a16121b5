//! Wire types for the refund gateway endpoints.

use refund_desk_core::{Money, PaymentGateway, TransactionId};
use serde::{Deserialize, Serialize};

use crate::calculator::GatewayQuote;
use crate::history::RefundRecord;

/// Accepts IDs encoded either as JSON strings or numbers.
pub mod string_or_number {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        UInt(u64),
    }

    impl From<Raw> for String {
        fn from(raw: Raw) -> Self {
            match raw {
                Raw::Str(s) => s,
                Raw::Int(n) => n.to_string(),
                Raw::UInt(n) => n.to_string(),
            }
        }
    }

    /// Deserialize a required ID.
    ///
    /// # Errors
    ///
    /// Fails if the value is neither a string nor an integer.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Raw::deserialize(deserializer).map(String::from)
    }

    /// Deserialize an optional ID; `null` becomes `None`.
    ///
    /// # Errors
    ///
    /// Fails if the value is neither null, a string, nor an integer.
    pub fn option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Option::<Raw>::deserialize(deserializer).map(|raw| raw.map(String::from))
    }
}

/// Response body of `calculate` and `refund`.
///
/// The error shape is tried first so a body carrying `error` is never read
/// as a success.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum TransactionResponse {
    Failure {
        error: String,
    },
    Success {
        #[serde(rename = "transactionId", deserialize_with = "string_or_number::deserialize")]
        transaction_id: String,
        amount: Money,
    },
}

impl TransactionResponse {
    pub(crate) fn into_result(self) -> Result<GatewayQuote, String> {
        match self {
            Self::Failure { error } => Err(error),
            Self::Success {
                transaction_id,
                amount,
            } => Ok(GatewayQuote {
                transaction_id: TransactionId::new(transaction_id),
                amount,
            }),
        }
    }
}

/// Body of a non-2xx response that carries an error message.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(alias = "message")]
    pub error: String,
}

/// Result of a committed refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundReceipt {
    pub transaction_id: TransactionId,
    pub amount: Money,
}

impl From<GatewayQuote> for RefundReceipt {
    fn from(quote: GatewayQuote) -> Self {
        Self {
            transaction_id: quote.transaction_id,
            amount: quote.amount,
        }
    }
}

/// Body of `paypal-refund`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PayPalRefundBody<'a> {
    pub transaction_id: &'a str,
    pub amount: String,
}

/// Body of `stripe-refund`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StripeRefundBody<'a> {
    pub charge_id: &'a str,
    pub amount: String,
}

/// Response of `paypal-refund` and `stripe-refund`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProcessorRefundResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "string_or_number::option")]
    pub paypal_refund_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number::option")]
    pub stripe_refund_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A refund issued directly with PayPal or Stripe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorRefund {
    pub gateway: PaymentGateway,
    pub refund_id: String,
}

impl ProcessorRefund {
    /// Text appended to the refund note, e.g. `PayPal refund ID: 8XY12`.
    #[must_use]
    pub fn note_reference(&self) -> String {
        let processor = match &self.gateway {
            PaymentGateway::PayPal => "PayPal",
            PaymentGateway::Stripe => "Stripe",
            other => other.as_str(),
        };
        format!("{processor} refund ID: {}", self.refund_id)
    }
}

/// Response of `get-refunds/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RefundHistoryResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub refunds: Vec<RefundRecord>,
    #[serde(default, alias = "error")]
    pub message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transaction_response_success() {
        let response: TransactionResponse =
            serde_json::from_str(r#"{"transactionId": 4411, "amount": "27.50"}"#).unwrap();
        let quote = response.into_result().unwrap();
        assert_eq!(quote.transaction_id.as_str(), "4411");
        assert_eq!(quote.amount, Money::new(dec!(27.50)));
    }

    #[test]
    fn test_transaction_response_error_wins() {
        let response: TransactionResponse = serde_json::from_str(
            r#"{"error": "Order already fully refunded", "transactionId": "1", "amount": "0"}"#,
        )
        .unwrap();
        assert_eq!(
            response.into_result().unwrap_err(),
            "Order already fully refunded"
        );
    }

    #[test]
    fn test_transaction_response_rejects_unknown_shape() {
        let result = serde_json::from_str::<TransactionResponse>(r#"{"ok": true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_processor_response_fields() {
        let response: ProcessorRefundResponse =
            serde_json::from_str(r#"{"success": true, "paypalRefundId": "8XY12"}"#).unwrap();
        assert!(response.success);
        assert_eq!(response.paypal_refund_id.as_deref(), Some("8XY12"));
        assert!(response.stripe_refund_id.is_none());
    }

    #[test]
    fn test_note_reference() {
        let refund = ProcessorRefund {
            gateway: PaymentGateway::Stripe,
            refund_id: "re_3Nx".to_string(),
        };
        assert_eq!(refund.note_reference(), "Stripe refund ID: re_3Nx");
    }

    #[test]
    fn test_processor_body_shape() {
        let body = StripeRefundBody {
            charge_id: "ch_1",
            amount: Money::new(dec!(12.5)).to_string(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"chargeId": "ch_1", "amount": "12.50"})
        );
    }
}
