use crate::config::GatewayConfig;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::ProcessorClient;
use crate::payments::types::{
    ConfigToken, CreateOrderRequest, CreateOrderResponse, RefundResponse, TransactionsResponse,
};
use crate::payments::utils::{BasicCredentials, PaymentHttpClient};
use async_trait::async_trait;
use reqwest::{Method, Url};
use std::time::Duration;
use tracing::{info, warn};

pub const SANDBOX_BASE_URL: &str = "https://demo.vivapayments.com";
pub const PRODUCTION_BASE_URL: &str = "https://www.vivapayments.com";

#[derive(Debug, Clone)]
pub struct VivaConfig {
    pub merchant_id: String,
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub log_payloads: bool,
}

impl Default for VivaConfig {
    fn default() -> Self {
        Self {
            merchant_id: String::new(),
            api_key: String::new(),
            base_url: SANDBOX_BASE_URL.to_string(),
            timeout_secs: 20,
            log_payloads: false,
        }
    }
}

impl From<&GatewayConfig> for VivaConfig {
    fn from(gateway: &GatewayConfig) -> Self {
        Self {
            merchant_id: gateway.merchant_id.clone(),
            api_key: gateway.api_key.clone(),
            base_url: gateway.endpoint(),
            timeout_secs: gateway.timeout_secs,
            log_payloads: gateway.debug_log,
        }
    }
}

pub struct VivaClient {
    config: VivaConfig,
    credentials: BasicCredentials,
    http: PaymentHttpClient,
}

impl VivaClient {
    pub fn new(config: VivaConfig) -> PaymentResult<Self> {
        let http = PaymentHttpClient::new(
            Duration::from_secs(config.timeout_secs),
            config.log_payloads,
        )?;
        let credentials = BasicCredentials::new(&config.merchant_id, &config.api_key);
        Ok(Self {
            config,
            credentials,
            http,
        })
    }

    pub fn from_gateway(gateway: &GatewayConfig) -> PaymentResult<Self> {
        Self::new(VivaConfig::from(gateway))
    }

    /// Joins path segments onto the base URL, percent-encoding each one so
    /// identifiers taken from notifications cannot escape the API path.
    fn endpoint(&self, segments: &[&str]) -> PaymentResult<Url> {
        let mut url = Url::parse(&self.config.base_url).map_err(|e| {
            PaymentError::InvalidInput {
                message: format!("invalid Viva base URL: {}", e),
                field: Some("VIVA_BASE_URL".to_string()),
            }
        })?;
        url.path_segments_mut()
            .map_err(|_| PaymentError::InvalidInput {
                message: "Viva base URL cannot carry a path".to_string(),
                field: Some("VIVA_BASE_URL".to_string()),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_config_token(&self, credentials: &BasicCredentials) -> PaymentResult<ConfigToken> {
        let url = self.endpoint(&["api", "messages", "config", "token"])?;
        let raw = self
            .http
            .request_raw(Method::GET, url.as_str(), credentials, None)
            .await?;

        if !raw.status.is_success() {
            warn!(status = %raw.status, "viva config token request rejected");
            return Err(PaymentError::RemoteRejected {
                message: format!("HTTP {}: {}", raw.status, raw.body),
                error_code: Some(i64::from(raw.status.as_u16())),
            });
        }

        Ok(ConfigToken::from_raw(raw.body))
    }
}

#[async_trait]
impl ProcessorClient for VivaClient {
    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> PaymentResult<CreateOrderResponse> {
        let payload = serde_json::to_value(request).map_err(|e| PaymentError::InvalidInput {
            message: format!("failed to encode create-order request: {}", e),
            field: None,
        })?;
        let url = self.endpoint(&["api", "orders"])?;

        info!(merchant_trns = %request.merchant_trns, "creating viva payment order");
        self.http
            .request_json(Method::POST, url.as_str(), &self.credentials, Some(&payload))
            .await
    }

    async fn get_transaction(&self, transaction_id: &str) -> PaymentResult<TransactionsResponse> {
        let url = self.endpoint(&["api", "transactions", transaction_id])?;
        self.http
            .request_json(Method::GET, url.as_str(), &self.credentials, None)
            .await
    }

    async fn request_config_token(&self) -> PaymentResult<ConfigToken> {
        self.fetch_config_token(&self.credentials).await
    }

    async fn request_config_token_with(
        &self,
        merchant_id: &str,
        api_key: &str,
    ) -> PaymentResult<ConfigToken> {
        self.fetch_config_token(&BasicCredentials::new(merchant_id, api_key))
            .await
    }

    async fn refund_transaction(
        &self,
        transaction_id: &str,
        amount_minor: i64,
    ) -> PaymentResult<RefundResponse> {
        let mut url = self.endpoint(&["api", "transactions", transaction_id])?;
        url.query_pairs_mut()
            .append_pair("Amount", &amount_minor.to_string());

        info!(transaction_id = %transaction_id, amount_minor, "requesting viva refund");
        self.http
            .request_json(Method::DELETE, url.as_str(), &self.credentials, None)
            .await
    }

    fn checkout_endpoint(&self) -> String {
        self.config.base_url.trim_end_matches('/').to_string()
    }
}
