//! HTTP implementation of [`RefundGateway`].

use std::sync::Arc;

use refund_desk_core::{Money, OrderId, PaymentGateway};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument};
use url::Url;

use super::error::GatewayError;
use super::types::{
    ErrorBody, PayPalRefundBody, ProcessorRefund, ProcessorRefundResponse, RefundHistoryResponse,
    RefundReceipt, StripeRefundBody, TransactionResponse,
};
use super::RefundGateway;
use crate::calculator::GatewayQuote;
use crate::config::GatewayConfig;
use crate::history::RefundHistory;
use crate::request::RefundRequest;

/// Refund gateway reached over HTTP.
#[derive(Clone)]
pub struct HttpRefundGateway {
    inner: Arc<HttpRefundGatewayInner>,
}

struct HttpRefundGatewayInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRefundGateway {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| GatewayError::Parse(format!("Invalid gateway token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        debug!(
            base_url = %config.base_url,
            authenticated = config.is_authenticated(),
            "Refund gateway client created"
        );

        Ok(Self {
            inner: Arc::new(HttpRefundGatewayInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// Base URL every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| GatewayError::InvalidUrl(format!("{path}: {e}")))
    }

    /// POST a JSON body and parse a successful JSON response.
    async fn post<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(StatusCode, T), GatewayError> {
        let url = self.endpoint(path)?;
        let response = self.inner.client.post(url).json(body).send().await?;
        self.handle_response(path, response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<(StatusCode, T), GatewayError> {
        let url = self.endpoint(path)?;
        let response = self.inner.client.get(url).send().await?;
        self.handle_response(path, response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        path: &str,
        response: Response,
    ) -> Result<(StatusCode, T), GatewayError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = parse_error_message(status, &body);
            error!(
                endpoint = %path,
                status = status.as_u16(),
                error = %message,
                "Refund gateway returned an error"
            );
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Parse(format!("Failed to parse {path} response: {e}")))?;
        Ok((status, parsed))
    }

    async fn transaction(
        &self,
        path: &str,
        request: &RefundRequest,
    ) -> Result<GatewayQuote, GatewayError> {
        let (status, response): (_, TransactionResponse) = self.post(path, request).await?;
        response.into_result().map_err(|message| {
            error!(endpoint = %path, error = %message, "Refund gateway rejected request");
            GatewayError::Api {
                status: status.as_u16(),
                message,
            }
        })
    }

    async fn processor_refund<B: serde::Serialize + Sync>(
        &self,
        path: &str,
        gateway: PaymentGateway,
        body: &B,
    ) -> Result<ProcessorRefund, GatewayError> {
        let (_, response): (_, ProcessorRefundResponse) = self.post(path, body).await?;

        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| format!("{gateway} refund failed"));
            error!(gateway = %gateway, error = %message, "Processor refund rejected");
            return Err(GatewayError::Rejected(message));
        }

        let refund_id = match gateway {
            PaymentGateway::PayPal => response.paypal_refund_id,
            _ => response.stripe_refund_id,
        }
        .ok_or_else(|| GatewayError::Parse(format!("{path} response is missing the refund ID")))?;

        info!(gateway = %gateway, refund_id = %refund_id, "Processor refund issued");
        Ok(ProcessorRefund { gateway, refund_id })
    }
}

/// Pull a human-readable message out of an error body.
fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.error;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

impl RefundGateway for HttpRefundGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id, items = request.line_items.len()))]
    async fn calculate(&self, request: &RefundRequest) -> Result<GatewayQuote, GatewayError> {
        let quote = self.transaction("calculate", request).await?;
        debug!(
            transaction_id = %quote.transaction_id,
            amount = %quote.amount,
            "Gateway quote received"
        );
        Ok(quote)
    }

    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn refund(&self, request: &RefundRequest) -> Result<RefundReceipt, GatewayError> {
        let receipt = RefundReceipt::from(self.transaction("refund", request).await?);
        info!(
            transaction_id = %receipt.transaction_id,
            amount = %receipt.amount,
            "Refund committed"
        );
        Ok(receipt)
    }

    #[instrument(skip(self))]
    async fn paypal_refund(
        &self,
        transaction_id: &str,
        amount: Money,
    ) -> Result<ProcessorRefund, GatewayError> {
        let body = PayPalRefundBody {
            transaction_id,
            amount: amount.to_string(),
        };
        self.processor_refund("paypal-refund", PaymentGateway::PayPal, &body)
            .await
    }

    #[instrument(skip(self))]
    async fn stripe_refund(
        &self,
        charge_id: &str,
        amount: Money,
    ) -> Result<ProcessorRefund, GatewayError> {
        let body = StripeRefundBody {
            charge_id,
            amount: amount.to_string(),
        };
        self.processor_refund("stripe-refund", PaymentGateway::Stripe, &body)
            .await
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn refund_history(&self, order_id: &OrderId) -> Result<RefundHistory, GatewayError> {
        let path = format!("get-refunds/{}", order_id.numeric_id());
        let (_, response): (_, RefundHistoryResponse) = self.get(&path).await?;

        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "Refund history unavailable".to_string());
            error!(error = %message, "Refund history lookup failed");
            return Err(GatewayError::Rejected(message));
        }

        debug!(refunds = response.refunds.len(), "Refund history loaded");
        Ok(RefundHistory::new(response.refunds))
    }
}

impl std::fmt::Debug for HttpRefundGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRefundGateway")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}
