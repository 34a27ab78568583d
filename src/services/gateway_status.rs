//! Gateway configuration state: credential validation, availability and
//! dismissible admin notices.

use crate::config::GatewayConfig;
use crate::database::settings_repository::{
    notice_key, SettingsStore, IPN_VALIDATED_KEY, SETTINGS_VALIDATED_KEY,
};
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::ProcessorClient;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const SUPPORTED_CURRENCY: &str = "EUR";
pub const UNSUPPORTED_CURRENCY_NOTICE: &str = "unsupported_currency_notice";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationStatus {
    MissingFields,
    InvalidCredentials,
    Valid,
}

impl ConfigurationStatus {
    /// Numeric code used by the settings screen: 1 missing, 2 invalid, 0 valid.
    pub fn code(&self) -> u8 {
        match self {
            ConfigurationStatus::Valid => 0,
            ConfigurationStatus::MissingFields => 1,
            ConfigurationStatus::InvalidCredentials => 2,
        }
    }
}

pub fn is_supported_currency(currency: &str) -> bool {
    currency.trim().eq_ignore_ascii_case(SUPPORTED_CURRENCY)
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatusReport {
    pub enabled: bool,
    pub sandbox: bool,
    pub configuration_valid: bool,
    pub webhook_verified: bool,
    pub available: bool,
    pub unsupported_currency_notice: bool,
}

pub struct GatewayStatus {
    config: GatewayConfig,
    settings: Arc<dyn SettingsStore>,
    client: Arc<dyn ProcessorClient>,
}

impl GatewayStatus {
    pub fn new(
        config: GatewayConfig,
        settings: Arc<dyn SettingsStore>,
        client: Arc<dyn ProcessorClient>,
    ) -> Self {
        Self {
            config,
            settings,
            client,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Checks credentials against the config-token endpoint and records the
    /// verdict under `viva_settings_validated`.
    pub async fn validate_credentials(
        &self,
        merchant_id: &str,
        api_key: &str,
    ) -> PaymentResult<ConfigurationStatus> {
        let status = if merchant_id.trim().is_empty() || api_key.trim().is_empty() {
            ConfigurationStatus::MissingFields
        } else {
            match self
                .client
                .request_config_token_with(merchant_id.trim(), api_key.trim())
                .await
            {
                Ok(token) if token.key.is_some() => ConfigurationStatus::Valid,
                Ok(_) => ConfigurationStatus::InvalidCredentials,
                Err(e) => {
                    warn!(error = %e, "viva credential check failed");
                    ConfigurationStatus::InvalidCredentials
                }
            }
        };

        let flag = if status == ConfigurationStatus::Valid {
            "yes"
        } else {
            "no"
        };
        self.settings.set(SETTINGS_VALIDATED_KEY, flag).await?;
        info!(status = ?status, "viva credentials validated");
        Ok(status)
    }

    pub async fn is_configuration_valid(&self) -> PaymentResult<bool> {
        Ok(self
            .settings
            .get(SETTINGS_VALIDATED_KEY)
            .await?
            .is_some_and(|value| value == "yes"))
    }

    pub async fn is_available(&self, currency: &str) -> PaymentResult<bool> {
        if !self.config.enabled {
            return Ok(false);
        }
        if !self.config.allow_non_eur && !is_supported_currency(currency) {
            return Ok(false);
        }
        self.is_configuration_valid().await
    }

    pub fn check_order_currency(&self, currency: &str) -> PaymentResult<()> {
        if is_supported_currency(currency) {
            Ok(())
        } else {
            Err(PaymentError::UnsupportedCurrency {
                currency: currency.to_string(),
            })
        }
    }

    pub async fn has_verified_webhook(&self) -> PaymentResult<bool> {
        Ok(self
            .settings
            .get(IPN_VALIDATED_KEY)
            .await?
            .is_some_and(|value| !value.is_empty()))
    }

    pub async fn dismiss_notice(&self, name: &str) -> PaymentResult<()> {
        self.settings.set(&notice_key(name), "dismissed").await?;
        Ok(())
    }

    pub async fn is_notice_dismissed(&self, name: &str) -> PaymentResult<bool> {
        Ok(self.settings.get(&notice_key(name)).await?.is_some())
    }

    pub async fn unsupported_currency_notice_visible(&self, currency: &str) -> PaymentResult<bool> {
        if !self.config.enabled || is_supported_currency(currency) {
            return Ok(false);
        }
        Ok(!self.is_notice_dismissed(UNSUPPORTED_CURRENCY_NOTICE).await?)
    }

    pub async fn report(&self, currency: &str) -> PaymentResult<GatewayStatusReport> {
        Ok(GatewayStatusReport {
            enabled: self.config.enabled,
            sandbox: self.config.sandbox,
            configuration_valid: self.is_configuration_valid().await?,
            webhook_verified: self.has_verified_webhook().await?,
            available: self.is_available(currency).await?,
            unsupported_currency_notice: self.unsupported_currency_notice_visible(currency).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::InMemorySettingsStore;
    use crate::payments::types::{
        ConfigToken, CreateOrderRequest, CreateOrderResponse, RefundResponse,
        TransactionsResponse,
    };
    use async_trait::async_trait;

    struct TokenProcessor;

    #[async_trait]
    impl ProcessorClient for TokenProcessor {
        async fn create_order(&self, _: &CreateOrderRequest) -> PaymentResult<CreateOrderResponse> {
            unreachable!("not used")
        }

        async fn get_transaction(&self, _: &str) -> PaymentResult<TransactionsResponse> {
            unreachable!("not used")
        }

        async fn request_config_token(&self) -> PaymentResult<ConfigToken> {
            self.request_config_token_with("m", "k").await
        }

        async fn request_config_token_with(
            &self,
            merchant_id: &str,
            _api_key: &str,
        ) -> PaymentResult<ConfigToken> {
            match merchant_id {
                "good" => Ok(ConfigToken::from_raw(r#"{"Key":"ABC"}"#.to_string())),
                "nokey" => Ok(ConfigToken::from_raw("{}".to_string())),
                _ => Err(PaymentError::RemoteRejected {
                    message: "HTTP 401".to_string(),
                    error_code: Some(401),
                }),
            }
        }

        async fn refund_transaction(&self, _: &str, _: i64) -> PaymentResult<RefundResponse> {
            unreachable!("not used")
        }

        fn checkout_endpoint(&self) -> String {
            String::new()
        }
    }

    fn status_with(config: GatewayConfig) -> (GatewayStatus, Arc<InMemorySettingsStore>) {
        let settings = Arc::new(InMemorySettingsStore::new());
        let status = GatewayStatus::new(config, settings.clone(), Arc::new(TokenProcessor));
        (status, settings)
    }

    #[tokio::test]
    async fn credential_validation_outcomes_are_persisted() {
        let (status, settings) = status_with(GatewayConfig::default());

        assert_eq!(
            status.validate_credentials("", "key").await.unwrap(),
            ConfigurationStatus::MissingFields
        );
        assert_eq!(
            settings.get(SETTINGS_VALIDATED_KEY).await.unwrap().as_deref(),
            Some("no")
        );

        assert_eq!(
            status.validate_credentials("bad", "key").await.unwrap(),
            ConfigurationStatus::InvalidCredentials
        );
        assert_eq!(
            status.validate_credentials("nokey", "key").await.unwrap(),
            ConfigurationStatus::InvalidCredentials
        );
        assert!(!status.is_configuration_valid().await.unwrap());

        assert_eq!(
            status.validate_credentials("good", "key").await.unwrap(),
            ConfigurationStatus::Valid
        );
        assert!(status.is_configuration_valid().await.unwrap());
        assert_eq!(ConfigurationStatus::InvalidCredentials.code(), 2);
    }

    #[tokio::test]
    async fn availability_requires_eur_unless_allowed() {
        let (status, settings) = status_with(GatewayConfig::default());
        settings.set(SETTINGS_VALIDATED_KEY, "yes").await.unwrap();

        assert!(status.is_available("EUR").await.unwrap());
        assert!(!status.is_available("USD").await.unwrap());
        assert!(status.check_order_currency("usd").is_err());

        let (lenient, settings) = status_with(GatewayConfig {
            allow_non_eur: true,
            ..GatewayConfig::default()
        });
        settings.set(SETTINGS_VALIDATED_KEY, "yes").await.unwrap();
        assert!(lenient.is_available("USD").await.unwrap());

        let (disabled, _) = status_with(GatewayConfig {
            enabled: false,
            ..GatewayConfig::default()
        });
        assert!(!disabled.is_available("EUR").await.unwrap());
    }

    #[tokio::test]
    async fn currency_notice_can_be_dismissed() {
        let (status, _) = status_with(GatewayConfig::default());

        assert!(status.unsupported_currency_notice_visible("GBP").await.unwrap());
        assert!(!status.unsupported_currency_notice_visible("EUR").await.unwrap());

        status
            .dismiss_notice(UNSUPPORTED_CURRENCY_NOTICE)
            .await
            .unwrap();
        assert!(status
            .is_notice_dismissed(UNSUPPORTED_CURRENCY_NOTICE)
            .await
            .unwrap());
        assert!(!status.unsupported_currency_notice_visible("GBP").await.unwrap());
    }

    #[tokio::test]
    async fn webhook_verification_follows_probe_fingerprint() {
        let (status, settings) = status_with(GatewayConfig::default());
        assert!(!status.has_verified_webhook().await.unwrap());
        settings.set(IPN_VALIDATED_KEY, "abc123").await.unwrap();
        assert!(status.has_verified_webhook().await.unwrap());
    }
}
