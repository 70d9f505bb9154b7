use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    pub session_id: Option<String>,
    pub checkout_url: String,
}

/// Creates hosted checkout pages. Payment rows are written later, from
/// webhooks, never here.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout(&self, request: &CheckoutRequest)
        -> Result<CheckoutSession, PaymentError>;
}

#[derive(Clone)]
pub struct DodoClient {
    client: Client,
    base_url: String,
    api_key: String,
    product_id: String,
    return_url: String,
}

impl DodoClient {
    pub fn new(
        base_url: String,
        api_key: String,
        product_id: String,
        return_url: String,
    ) -> Result<Self, PaymentError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            base_url,
            api_key,
            product_id,
            return_url,
        })
    }
}

#[async_trait]
impl PaymentProvider for DodoClient {
    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/checkouts", self.base_url.trim_end_matches('/'));
        let body = json!({
            "product_cart": [{ "product_id": self.product_id, "quantity": 1 }],
            "customer": { "email": request.email, "name": request.name },
            "return_url": self.return_url,
            "metadata": { "user_id": request.user_id.to_string() },
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: CheckoutSession = response.json().await?;
        info!(user_id = %request.user_id, session_id = ?session.session_id, "Checkout session created");
        Ok(session)
    }
}
