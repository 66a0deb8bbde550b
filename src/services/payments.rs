use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when talking to the payment provider
#[derive(Debug, Error)]
pub enum PaymentsError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Payment provider returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// A payment intent as returned by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub status: String,
}

/// HTTP client for a Stripe-style payment intent API
///
/// The provider is reached over its REST surface directly; requests are
/// form-encoded and authenticated with a bearer secret key.
pub struct PaymentsClient {
    base_url: String,
    secret_key: String,
    client: Client,
}

impl PaymentsClient {
    pub fn new(
        base_url: String,
        secret_key: String,
        timeout_secs: u64,
    ) -> Result<Self, PaymentsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            secret_key,
            client,
        })
    }

    /// Create a payment intent for a credit package
    pub async fn create_payment_intent(
        &self,
        amount_cents: i32,
        currency: &str,
        user_id: Uuid,
        credits: i32,
    ) -> Result<PaymentIntent, PaymentsError> {
        let url = format!("{}/v1/payment_intents", self.base_url.trim_end_matches('/'));

        let user = user_id.to_string();
        let amount = amount_cents.to_string();
        let credit_count = credits.to_string();
        let params = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("metadata[user_id]", user.as_str()),
            ("metadata[credits]", credit_count.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await?;

        self.parse_intent(response).await
    }

    /// Look up an existing payment intent by id
    pub async fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntent, PaymentsError> {
        let url = format!(
            "{}/v1/payment_intents/{}",
            self.base_url.trim_end_matches('/'),
            payment_intent_id
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        self.parse_intent(response).await
    }

    async fn parse_intent(
        &self,
        response: reqwest::Response,
    ) -> Result<PaymentIntent, PaymentsError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Provider error bodies carry a message under error.message
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("error")?
                        .get("message")?
                        .as_str()
                        .map(String::from)
                })
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(PaymentsError::ApiError(message));
        }

        response
            .json::<PaymentIntent>()
            .await
            .map_err(|e| PaymentsError::InvalidResponse(e.to_string()))
    }
}
