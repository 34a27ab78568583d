use crate::payments::error::{PaymentError, PaymentResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, Method};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

/// Merchant credentials used for every call against the processor.
#[derive(Clone)]
pub struct BasicCredentials {
    pub merchant_id: String,
    pub api_key: String,
}

impl BasicCredentials {
    pub fn new(merchant_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            api_key: api_key.into(),
        }
    }

    pub fn authorization_header(&self) -> String {
        let pair = format!("{}:{}", self.merchant_id, self.api_key);
        format!("Basic {}", STANDARD.encode(pair))
    }

    pub fn is_blank(&self) -> bool {
        self.merchant_id.trim().is_empty() || self.api_key.trim().is_empty()
    }
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("merchant_id", &self.merchant_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Raw processor reply: HTTP status plus the untouched body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: reqwest::StatusCode,
    pub body: String,
}

/// Thin authenticated JSON client. Calls are single-shot: a failure surfaces
/// immediately to the caller, there is no retry loop.
#[derive(Clone)]
pub struct PaymentHttpClient {
    client: Client,
    timeout: Duration,
    log_payloads: bool,
}

impl PaymentHttpClient {
    pub fn new(timeout: Duration, log_payloads: bool) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| PaymentError::RemoteUnreachable {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            timeout,
            log_payloads,
        })
    }

    pub async fn request_raw(
        &self,
        method: Method,
        url: &str,
        credentials: &BasicCredentials,
        body: Option<&JsonValue>,
    ) -> PaymentResult<RawResponse> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .timeout(self.timeout)
            .header(
                reqwest::header::AUTHORIZATION,
                credentials.authorization_header(),
            )
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(payload) = body {
            if self.log_payloads {
                debug!(method = %method, url = url, payload = %payload, "viva request");
            }
            request = request.json(payload);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::RemoteUnreachable {
                message: format!("viva request failed: {}", e),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PaymentError::RemoteUnreachable {
                message: format!("failed to read viva response: {}", e),
            })?;

        if self.log_payloads {
            debug!(method = %method, url = url, status = %status, body = %text, "viva response");
        }

        Ok(RawResponse { status, body: text })
    }

    /// Viva reports business failures inside a JSON envelope, sometimes with a
    /// non-2xx status, so the body is decoded whenever it parses.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        credentials: &BasicCredentials,
        body: Option<&JsonValue>,
    ) -> PaymentResult<T> {
        let raw = self.request_raw(method, url, credentials, body).await?;
        match serde_json::from_str::<T>(&raw.body) {
            Ok(parsed) => Ok(parsed),
            Err(e) if raw.status.is_success() => Err(PaymentError::InvalidResponse {
                message: format!("invalid viva JSON response: {}", e),
            }),
            Err(_) => Err(PaymentError::RemoteRejected {
                message: format!("HTTP {}: {}", raw.status, raw.body),
                error_code: Some(i64::from(raw.status.as_u16())),
            }),
        }
    }
}

/// `round(amount * 100)` as an integer count of cents. `None` when the
/// amount does not fit.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Minor-unit amount formatted for the processor: digits only, no separators.
pub fn format_minor_units(amount: Decimal) -> Option<String> {
    to_minor_units(amount).map(|cents| cents.to_string())
}

pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Viva checkout language from a buyer locale such as `el_GR` or `en-US`.
pub fn request_lang(locale: &str) -> &'static str {
    let prefix: String = locale.trim().chars().take(2).collect();
    if prefix.eq_ignore_ascii_case("el") {
        "el-GR"
    } else {
        "en-US"
    }
}

/// Hex SHA-256 of a credential, stored instead of the credential itself.
pub fn fingerprint(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn minor_units_are_exact() {
        assert_eq!(
            format_minor_units(Decimal::from_str("19.99").unwrap()).as_deref(),
            Some("1999")
        );
        assert_eq!(format_minor_units(Decimal::from(5)).as_deref(), Some("500"));
        assert_eq!(
            format_minor_units(Decimal::from_str("1234567.80").unwrap()).as_deref(),
            Some("123456780")
        );
        assert_eq!(
            format_minor_units(Decimal::from_str("0.125").unwrap()).as_deref(),
            Some("13")
        );
    }

    #[test]
    fn oversized_amounts_have_no_minor_units() {
        assert_eq!(to_minor_units(Decimal::MAX), None);
        assert_eq!(to_minor_units(Decimal::MIN), None);
        assert_eq!(format_minor_units(Decimal::MAX), None);
    }

    #[test]
    fn phone_is_stripped_to_digits() {
        assert_eq!(digits_only("+30 (691) 234-5678"), "306912345678");
        assert_eq!(digits_only("n/a"), "");
    }

    #[test]
    fn basic_auth_header_is_base64_of_pair() {
        let credentials = BasicCredentials::new("merchant", "secret");
        assert_eq!(
            credentials.authorization_header(),
            "Basic bWVyY2hhbnQ6c2VjcmV0"
        );
        assert!(!format!("{:?}", credentials).contains("secret"));
    }

    #[test]
    fn request_lang_follows_locale_prefix() {
        assert_eq!(request_lang("el_GR"), "el-GR");
        assert_eq!(request_lang("EL"), "el-GR");
        assert_eq!(request_lang("de_DE"), "en-US");
        assert_eq!(request_lang(""), "en-US");
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let first = fingerprint("B3248B3A");
        assert_eq!(first.len(), 64);
        assert_eq!(first, fingerprint("B3248B3A"));
        assert_ne!(first, fingerprint("B3248B3B"));
    }
}
