// libs/payment-cell/src/services/gateway.rs
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;
use shared_utils::extractor::GatewayPayload;

use crate::models::{CheckoutSession, PaymentSession};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Payment gateway not configured")]
    NotConfigured,

    #[error("Gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gateway returned HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("Unreadable gateway response: {0}")]
    InvalidResponse(String),

    #[error("Gateway did not return a checkout URL")]
    InitRejected { details: Value },
}

impl GatewayError {
    /// Body shown to the caller of `/api/pay`. Only the gateway's own
    /// rejection payload is passed through.
    pub fn public_details(&self) -> Value {
        match self {
            GatewayError::InitRejected { details } => details.clone(),
            GatewayError::NotConfigured => json!({ "reason": "gateway not configured" }),
            _ => json!({ "reason": "gateway unavailable" }),
        }
    }
}

/// Hosted-checkout payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a transaction and returns the hosted checkout page.
    async fn init_session(&self, session: &PaymentSession) -> Result<CheckoutSession, GatewayError>;

    /// Whether `payload` genuinely comes from the gateway for transaction `tran_id`.
    async fn validate(&self, payload: &GatewayPayload, tran_id: &str) -> Result<bool, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct ValidationResponse {
    status: String,
    tran_id: Option<String>,
}

/// SSLCommerz client for session initiation and order validation.
/// Based on: https://developer.sslcommerz.com/doc/v4/
pub struct SslCommerzClient {
    client: Client,
    base_url: String,
    store_id: String,
    store_passwd: String,
    configured: bool,
}

impl SslCommerzClient {
    pub fn new(config: &AppConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.gateway_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.gateway_base_url.trim_end_matches('/').to_string(),
            store_id: config.store_id.clone(),
            store_passwd: config.store_passwd.clone(),
            configured: config.is_gateway_configured(),
        })
    }

    async fn read_json(response: reqwest::Response, what: &str) -> Result<Value, GatewayError> {
        let status = response.status();
        let response_text = response.text().await?;

        debug!("SSLCommerz {} response: {} - {}", what, status, response_text);

        if !status.is_success() {
            error!("SSLCommerz {} failed: {} - {}", what, status, response_text);
            return Err(GatewayError::Http { status, body: response_text });
        }

        serde_json::from_str(&response_text)
            .map_err(|e| GatewayError::InvalidResponse(format!("Failed to parse {} response: {}", what, e)))
    }
}

#[async_trait]
impl PaymentGateway for SslCommerzClient {
    /// POST /gwprocess/v4/api.php
    async fn init_session(&self, session: &PaymentSession) -> Result<CheckoutSession, GatewayError> {
        if !self.configured {
            return Err(GatewayError::NotConfigured);
        }

        info!("Initiating SSLCommerz session for transaction: {}", session.tran_id);

        let url = format!("{}/gwprocess/v4/api.php", self.base_url);

        let mut form = vec![
            ("store_id", self.store_id.clone()),
            ("store_passwd", self.store_passwd.clone()),
        ];
        form.extend(session.form_fields());

        let response = self.client.post(&url).form(&form).send().await?;
        let body = Self::read_json(response, "session").await?;

        let gateway_page_url = body
            .get("GatewayPageURL")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        match gateway_page_url {
            Some(gateway_page_url) => {
                info!("SSLCommerz session ready for transaction: {}", session.tran_id);
                Ok(CheckoutSession {
                    gateway_page_url,
                    session_key: body
                        .get("sessionkey")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                })
            }
            None => {
                error!("SSLCommerz Init Error: {}", body);
                Err(GatewayError::InitRejected { details: body })
            }
        }
    }

    /// GET /validator/api/validationserverAPI.php
    async fn validate(&self, payload: &GatewayPayload, tran_id: &str) -> Result<bool, GatewayError> {
        if !self.configured {
            return Err(GatewayError::NotConfigured);
        }

        let Some(val_id) = payload.get("val_id") else {
            warn!("Gateway payload has no val_id, refusing to trust it");
            return Ok(false);
        };

        let url = format!("{}/validator/api/validationserverAPI.php", self.base_url);
        debug!("Validating val_id {} with SSLCommerz", val_id);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("val_id", val_id.as_str()),
                ("store_id", self.store_id.as_str()),
                ("store_passwd", self.store_passwd.as_str()),
                ("v", "1"),
                ("format", "json"),
            ])
            .send()
            .await?;

        let body = Self::read_json(response, "validation").await?;
        let validation: ValidationResponse = serde_json::from_value(body)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let status_ok = matches!(validation.status.as_str(), "VALID" | "VALIDATED");
        // A val_id from any other transaction, or one the gateway won't attribute, is not proof.
        let tran_matches = validation.tran_id.as_deref() == Some(tran_id);

        if !status_ok || !tran_matches {
            warn!(
                "SSLCommerz validation rejected val_id {} for {}: status={}, tran_id={:?}",
                val_id, tran_id, validation.status, validation.tran_id
            );
        }

        Ok(status_ok && tran_matches)
    }
}
