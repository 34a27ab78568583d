//! Application configuration module
//! Handles environment variable loading, configuration validation, and application settings

use crate::payments::providers::viva::{PRODUCTION_BASE_URL, SANDBOX_BASE_URL};
use reqwest::Url;
use std::env;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// `None` when no `DATABASE_URL` is set; the in-memory stores are used then.
    pub database: Option<DatabaseConfig>,
    pub logging: LoggingConfig,
    pub gateway: GatewayConfig,
    pub storefront: StorefrontConfig,
    pub skip_externals: bool,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,   // seconds
    pub idle_timeout: Option<u64>, // seconds
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

/// Viva Wallet gateway settings
#[derive(Clone)]
pub struct GatewayConfig {
    pub enabled: bool,
    pub sandbox: bool,
    pub merchant_id: String,
    pub api_key: String,
    /// Payment source code registered with Viva for this store.
    pub source_code: String,
    /// Overrides the sandbox/production endpoint, mainly for tests.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// Logs outbound request and response payloads at debug level.
    pub debug_log: bool,
    pub allow_non_eur: bool,
}

/// Storefront pages the buyer is sent back to.
///
/// Paths may contain `{order_id}`, replaced with the local order id.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub base_url: Url,
    pub thank_you_path: String,
    pub generic_thank_you_path: String,
    pub order_pay_path: String,
    pub checkout_path: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        let skip_externals = env_bool("SKIP_EXTERNALS", false)?;
        let database = if skip_externals || env::var("DATABASE_URL").is_err() {
            None
        } else {
            Some(DatabaseConfig::from_env()?)
        };

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            database,
            logging: LoggingConfig::from_env()?,
            gateway: GatewayConfig::from_env()?,
            storefront: StorefrontConfig::from_env()?,
            skip_externals,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.logging.validate()?;
        self.gateway.validate()?;
        self.storefront.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MIN_CONNECTIONS".to_string()))?,
            connection_timeout: env::var("DB_CONNECTION_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_CONNECTION_TIMEOUT".to_string()))?,
            idle_timeout: env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|val| val.parse().ok()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("DATABASE_URL".to_string()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(
                "DB_MIN_CONNECTIONS must be <= DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            format: LogFormat::Plain,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(GatewayConfig {
            enabled: env_bool("VIVA_ENABLED", true)?,
            sandbox: env_bool("VIVA_SANDBOX", true)?,
            merchant_id: env::var("VIVA_MERCHANT_ID").unwrap_or_default(),
            api_key: env::var("VIVA_API_KEY").unwrap_or_default(),
            source_code: env::var("VIVA_SOURCE_CODE").unwrap_or_default(),
            base_url: env::var("VIVA_BASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            timeout_secs: env::var("VIVA_TIMEOUT_SECS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("VIVA_TIMEOUT_SECS".to_string()))?,
            debug_log: env_bool("VIVA_DEBUG_LOG", false)?,
            allow_non_eur: env_bool("VIVA_ALLOW_NON_EUR", false)?,
        })
    }

    /// REST and checkout host for the configured environment.
    pub fn endpoint(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if self.sandbox => SANDBOX_BASE_URL.to_string(),
            None => PRODUCTION_BASE_URL.to_string(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.merchant_id.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("VIVA_TIMEOUT_SECS".to_string()));
        }

        let endpoint = self.endpoint();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "VIVA_BASE_URL must be a valid URL".to_string(),
            ));
        }

        if self.enabled && self.source_code.trim().is_empty() {
            return Err(ConfigError::MissingVariable("VIVA_SOURCE_CODE".to_string()));
        }

        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sandbox: true,
            merchant_id: String::new(),
            api_key: String::new(),
            source_code: String::new(),
            base_url: None,
            timeout_secs: 20,
            debug_log: false,
            allow_non_eur: false,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("enabled", &self.enabled)
            .field("sandbox", &self.sandbox)
            .field("merchant_id", &self.merchant_id)
            .field("api_key", &"<redacted>")
            .field("source_code", &self.source_code)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("debug_log", &self.debug_log)
            .field("allow_non_eur", &self.allow_non_eur)
            .finish()
    }
}

impl StorefrontConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = env::var("STORE_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
        Ok(StorefrontConfig {
            base_url: Url::parse(&base)
                .map_err(|_| ConfigError::InvalidValue("STORE_BASE_URL".to_string()))?,
            thank_you_path: env::var("STORE_THANK_YOU_PATH")
                .unwrap_or_else(|_| "/checkout/order-received/{order_id}".to_string()),
            generic_thank_you_path: env::var("STORE_GENERIC_THANK_YOU_PATH")
                .unwrap_or_else(|_| "/checkout/order-received".to_string()),
            order_pay_path: env::var("STORE_ORDER_PAY_PATH")
                .unwrap_or_else(|_| "/checkout/order-pay/{order_id}".to_string()),
            checkout_path: env::var("STORE_CHECKOUT_PATH")
                .unwrap_or_else(|_| "/checkout".to_string()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, path) in [
            ("STORE_THANK_YOU_PATH", &self.thank_you_path),
            ("STORE_GENERIC_THANK_YOU_PATH", &self.generic_thank_you_path),
            ("STORE_ORDER_PAY_PATH", &self.order_pay_path),
            ("STORE_CHECKOUT_PATH", &self.checkout_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must start with '/'",
                    name
                )));
            }
        }

        Ok(())
    }

    fn page(&self, path: &str, order_id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        match order_id {
            Some(id) => url.set_path(&path.replace("{order_id}", id)),
            None => url.set_path(path),
        }
        url
    }

    pub fn thank_you_url(&self, order_id: &str) -> String {
        self.page(&self.thank_you_path, Some(order_id)).into()
    }

    pub fn generic_thank_you_url(&self) -> String {
        self.page(&self.generic_thank_you_path, None).into()
    }

    /// Pay page flagged with the failed processor order code.
    pub fn order_pay_url(&self, order_id: &str, failed_order_code: &str) -> String {
        let mut url = self.page(&self.order_pay_path, Some(order_id));
        url.query_pairs_mut()
            .append_pair("result", "failure")
            .append_pair("failed_viva_order_code", failed_order_code);
        url.into()
    }

    pub fn checkout_url(&self) -> String {
        self.page(&self.checkout_path, None).into()
    }
}

fn env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidValue(name.to_string())),
        },
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}
