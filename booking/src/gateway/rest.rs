//! HTTP payment gateway client.
//!
//! Talks to the provider's REST API with basic auth and bounded timeouts.
//! All failures surface as [`BookingError::Gateway`]; nothing is silently
//! swallowed.

use crate::config::GatewayConfig;
use crate::error::{BookingError, Result};
use crate::gateway::{CreatedOrder, OrderRequest, PaymentAttempt, PaymentGateway};
use serde::Deserialize;

/// REST client for the payment provider.
#[derive(Clone)]
pub struct RestPaymentGateway {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    callback_url: Option<String>,
}

/// Provider response for order creation.
#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    session_token: String,
}

/// Provider response for the payment-attempt listing.
#[derive(Debug, Deserialize)]
struct AttemptsResponse {
    items: Vec<AttemptItem>,
}

#[derive(Debug, Deserialize)]
struct AttemptItem {
    id: String,
    status: super::AttemptStatus,
    #[serde(default)]
    error_reason: Option<String>,
}

impl RestPaymentGateway {
    /// Build a client from gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Gateway`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BookingError::Gateway {
                operation: "client_init",
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            callback_url: config.callback_url.clone(),
        })
    }

    fn gateway_err(operation: &'static str, message: impl std::fmt::Display) -> BookingError {
        BookingError::Gateway {
            operation,
            message: message.to_string(),
        }
    }
}

impl PaymentGateway for RestPaymentGateway {
    async fn create_order(&self, order: &OrderRequest) -> Result<CreatedOrder> {
        let url = format!("{}/v1/orders", self.base_url);
        let mut body = serde_json::json!({
            "receipt": order.receipt,
            "amount": order.amount.minor_units(),
            "currency": order.currency.as_str(),
            "notes": {
                "customer_name": order.customer_name,
                "customer_email": order.customer_email,
                "customer_phone": order.customer_phone,
            },
        });
        if let Some(callback) = &self.callback_url {
            body["callback_url"] = serde_json::json!(callback);
        }

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::gateway_err("create_order", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::gateway_err(
                "create_order",
                format!("provider answered {status}: {text}"),
            ));
        }

        let order: OrderResponse = response
            .json()
            .await
            .map_err(|e| Self::gateway_err("create_order", e))?;

        tracing::debug!(provider_order_id = %order.id, "Provider order created");

        Ok(CreatedOrder {
            provider_order_id: order.id,
            session_token: order.session_token,
        })
    }

    async fn fetch_attempts(&self, provider_order_id: &str) -> Result<Vec<PaymentAttempt>> {
        let url = format!("{}/v1/orders/{provider_order_id}/payments", self.base_url);

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| Self::gateway_err("fetch_attempts", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::gateway_err(
                "fetch_attempts",
                format!("provider answered {status}: {text}"),
            ));
        }

        let attempts: AttemptsResponse = response
            .json()
            .await
            .map_err(|e| Self::gateway_err("fetch_attempts", e))?;

        Ok(attempts
            .items
            .into_iter()
            .map(|item| PaymentAttempt {
                provider_payment_id: item.id,
                status: item.status,
                failure_reason: item.error_reason,
            })
            .collect())
    }
}
