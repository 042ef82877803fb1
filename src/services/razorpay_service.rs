// services/razorpay_service.rs
use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Order intent sent to the gateway. `amount` is in currency subunits (paise).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: BTreeMap<String, String>,
    pub payment_capture: u8,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    error: GatewayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key id handed to checkout clients.
    fn key_id(&self) -> String;

    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder>;
}

#[derive(Debug, Clone)]
pub struct RazorpayService {
    key_id: String,
    key_secret: String,
    base_url: String,
    client: Client,
}

impl RazorpayService {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(RazorpayService {
            key_id: config.razorpay_key_id.clone(),
            key_secret: config.razorpay_key_secret.clone(),
            base_url: config.razorpay_base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayService {
    fn key_id(&self) -> String {
        self.key_id.clone()
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder> {
        info!(
            amount = request.amount,
            currency = %request.currency,
            receipt = %request.receipt,
            "Creating gateway order"
        );

        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .header(header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Order creation failed: {} - {}", status, body);

            let detail = serde_json::from_str::<GatewayErrorBody>(&body)
                .ok()
                .and_then(|b| match (b.error.code, b.error.description) {
                    (Some(code), Some(desc)) => Some(format!("{}: {}", code, desc)),
                    (_, Some(desc)) => Some(desc),
                    (Some(code), None) => Some(code),
                    (None, None) => None,
                })
                .unwrap_or_else(|| status.to_string());

            return Err(AppError::gateway(format!(
                "order creation failed ({}). Check your Razorpay credentials.",
                detail
            )));
        }

        let order: GatewayOrder = response.json().await?;
        if order.amount != request.amount {
            return Err(AppError::gateway(format!(
                "gateway order {} echoed amount {} but {} was requested",
                order.id, order.amount, request.amount
            )));
        }

        info!(
            order_id = %order.id,
            status = ?order.status,
            receipt = ?order.receipt,
            "Gateway order created"
        );
        Ok(order)
    }
}
