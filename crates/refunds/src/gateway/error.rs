//! Refund gateway errors.

use thiserror::Error;

/// Errors that can occur when talking to the refund gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed (network, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with an error; `message` is passed through verbatim.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// PayPal or Stripe refused the refund.
    #[error("Refund rejected: {0}")]
    Rejected(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl GatewayError {
    /// Message suitable for showing to the operator as-is.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } | Self::Rejected(message) => message.clone(),
            other => other.to_string(),
        }
    }
}
