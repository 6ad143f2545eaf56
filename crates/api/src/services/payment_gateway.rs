use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::PaymentConfig;

/// Failure of a single call to the payment provider.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The provider answered and refused the request.
    #[error("gateway rejected request (status {status}): [{code}] {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },
    /// The request never completed (network failure, timeout).
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Short code recorded on the order when this error fails a payment.
    pub fn failure_code(&self) -> &str {
        match self {
            GatewayError::Rejected { code, .. } => code,
            GatewayError::Unavailable(_) => "GATEWAY_UNAVAILABLE",
        }
    }

    pub fn failure_message(&self) -> String {
        match self {
            GatewayError::Rejected { message, .. } => message.clone(),
            GatewayError::Unavailable(_) => "Payment provider is unavailable".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub payment_key: String,
    pub order_id: String,
    pub amount: i64,
}

/// What the provider reports back for an approved payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfirmation {
    pub payment_key: String,
    pub order_id: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_amount: Option<i64>,
    #[serde(skip)]
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCancellation {
    pub payment_key: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(skip)]
    pub raw: serde_json::Value,
}

/// Confirm/cancel operations of an external payment provider.
///
/// Implementations must be stateless between calls; one instance is shared by
/// every request.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn confirm(&self, request: &ConfirmRequest) -> Result<GatewayConfirmation, GatewayError>;

    async fn cancel(
        &self,
        payment_key: &str,
        reason: &str,
    ) -> Result<GatewayCancellation, GatewayError>;
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Toss Payments REST client.
#[derive(Clone)]
pub struct TossPaymentsGateway {
    client: reqwest::Client,
    base_url: String,
    authorization: String,
}

impl TossPaymentsGateway {
    pub fn new(config: &PaymentConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            authorization: authorization_header(&config.secret_key),
        })
    }

    async fn post(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value, GatewayError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(rejection_from_body(status.as_u16(), &text));
        }

        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl PaymentGateway for TossPaymentsGateway {
    async fn confirm(&self, request: &ConfirmRequest) -> Result<GatewayConfirmation, GatewayError> {
        let url = format!("{}/v1/payments/confirm", self.base_url);
        let body = json!(request);
        let raw = self.post(&url, &body).await?;

        // A 2xx means the charge went through; never turn an unreadable body
        // into a failure.
        let mut confirmation = match serde_json::from_value::<GatewayConfirmation>(raw.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    order_id = %request.order_id,
                    "Unexpected confirm response body, falling back to request values: {}",
                    e
                );
                GatewayConfirmation {
                    payment_key: request.payment_key.clone(),
                    order_id: request.order_id.clone(),
                    method: None,
                    status: None,
                    total_amount: None,
                    raw: serde_json::Value::Null,
                }
            }
        };
        confirmation.raw = raw;

        info!(order_id = %request.order_id, "Payment confirmed by gateway");
        Ok(confirmation)
    }

    async fn cancel(
        &self,
        payment_key: &str,
        reason: &str,
    ) -> Result<GatewayCancellation, GatewayError> {
        let url = format!(
            "{}/v1/payments/{}/cancel",
            self.base_url,
            urlencoding::encode(payment_key)
        );
        let raw = self.post(&url, &json!({ "cancelReason": reason })).await?;

        let mut cancellation = serde_json::from_value::<GatewayCancellation>(raw.clone())
            .unwrap_or_else(|_| GatewayCancellation {
                payment_key: payment_key.to_string(),
                status: None,
                raw: serde_json::Value::Null,
            });
        cancellation.raw = raw;

        info!(payment_key = %payment_key, "Payment cancelled by gateway");
        Ok(cancellation)
    }
}

/// `Basic base64("{secret_key}:")`: the secret key is the username, the
/// password is empty.
pub fn authorization_header(secret_key: &str) -> String {
    let encoded = general_purpose::STANDARD.encode(format!("{secret_key}:"));
    format!("Basic {encoded}")
}

fn rejection_from_body(status: u16, body: &str) -> GatewayError {
    match serde_json::from_str::<ProviderErrorBody>(body) {
        Ok(parsed) => GatewayError::Rejected {
            status,
            code: parsed.code.unwrap_or_else(|| "UNKNOWN_ERROR".to_string()),
            message: parsed.message.unwrap_or_else(|| body.to_string()),
        },
        Err(_) => GatewayError::Rejected {
            status,
            code: "UNKNOWN_ERROR".to_string(),
            message: body.to_string(),
        },
    }
}
